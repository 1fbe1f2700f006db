//! Line-oriented xdata decoder

use std::io::BufRead;
use thiserror::Error;

use super::schema::{Block, CoerceError, Document, Schema};

/// Errors that can occur while decoding an xdata file
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    #[error("unable to read input: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: invalid line encountered '{text}'")]
    InvalidLine { line: usize, text: String },

    #[error("line {line}: invalid line in block '{block}', expected KEY=VALUE, got '{text}'")]
    InvalidField {
        line: usize,
        block: String,
        text: String,
    },

    #[error("line {line}: field '{key}' in block '{block}': {source}")]
    Coerce {
        line: usize,
        block: String,
        key: String,
        source: CoerceError,
    },

    #[error("unexpected end of input inside block '{block}'")]
    UnexpectedEof { block: String },
}

/// Tolerance switches for malformed input
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderOptions {
    /// Leave a field untouched when its value cannot be converted, instead of failing
    pub ignore_invalid_types: bool,
    /// Skip lines that are not blank, a comment, a block delimiter or `key=value`
    pub ignore_invalid_lines: bool,
}

/// Decodes an xdata stream into a document
///
/// The decoder makes a single pass over the input. Blocks that are not part
/// of the schema are skipped without looking at their contents, and keys a
/// record does not know about are ignored.
#[derive(Debug)]
pub struct Decoder<R> {
    reader: R,
    options: DecoderOptions,
    line_no: usize,
}

impl<R: BufRead> Decoder<R> {
    pub fn new(reader: R) -> Self {
        Self::with_options(reader, DecoderOptions::default())
    }

    pub fn with_options(reader: R, options: DecoderOptions) -> Self {
        Self {
            reader,
            options,
            line_no: 0,
        }
    }

    pub fn options(&self) -> DecoderOptions {
        self.options
    }

    /// Decode the input into a document with a built-in schema
    pub fn decode<D: Document>(&mut self) -> Result<D, DecodeError> {
        self.decode_with(D::schema())
    }

    /// Decode the input using an explicit schema
    pub fn decode_with<D: Default + 'static>(
        &mut self,
        schema: &Schema<D>,
    ) -> Result<D, DecodeError> {
        schema.validate().map_err(DecodeError::InvalidSchema)?;

        let mut doc = D::default();
        while let Some(line) = self.next_line()? {
            if is_ignored(&line) {
                continue;
            }

            if let Some(name) = block_start(&line) {
                match schema.block(name) {
                    Some(block) => self.decode_block(block, &mut doc)?,
                    None => {
                        if !self.skip_block()? {
                            break;
                        }
                    }
                }
                continue;
            }

            if !self.options.ignore_invalid_lines {
                return Err(DecodeError::InvalidLine {
                    line: self.line_no,
                    text: line,
                });
            }
        }

        Ok(doc)
    }

    fn decode_block<D>(&mut self, block: &Block<D>, doc: &mut D) -> Result<(), DecodeError> {
        let record = block.open(doc);

        loop {
            let Some(line) = self.next_line()? else {
                return Err(DecodeError::UnexpectedEof {
                    block: block.name().to_string(),
                });
            };

            if is_ignored(&line) {
                continue;
            }
            if is_block_end(&line) {
                return Ok(());
            }

            let Some((key, value)) = key_value(&line) else {
                if self.options.ignore_invalid_lines {
                    continue;
                }
                return Err(DecodeError::InvalidField {
                    line: self.line_no,
                    block: block.name().to_string(),
                    text: line.clone(),
                });
            };

            let Some(index) = block.field_index(key) else {
                continue;
            };

            if let Err(source) = record.assign(index, value) {
                if !self.options.ignore_invalid_types {
                    return Err(DecodeError::Coerce {
                        line: self.line_no,
                        block: block.name().to_string(),
                        key: key.to_string(),
                        source,
                    });
                }
            }
        }
    }

    /// Consume lines up to the end of an unknown block
    ///
    /// Returns `false` when the input ended before the block was closed.
    fn skip_block(&mut self) -> Result<bool, DecodeError> {
        while let Some(line) = self.next_line()? {
            if is_block_end(&line) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn next_line(&mut self) -> Result<Option<String>, DecodeError> {
        let mut buf = Vec::new();
        if self.reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(None);
        }
        self.line_no += 1;

        // Plugin output is copied verbatim and is not always UTF-8
        let mut line = String::from_utf8_lossy(&buf).into_owned();
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }
}

fn is_ignored(line: &str) -> bool {
    let line = line.trim_start();
    line.is_empty() || line.starts_with('#')
}

fn block_start(line: &str) -> Option<&str> {
    let rest = line.trim_start();
    let end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    if end == 0 {
        return None;
    }

    let (name, tail) = rest.split_at(end);
    tail.trim_start().starts_with('{').then_some(name)
}

fn is_block_end(line: &str) -> bool {
    line.trim_start().starts_with('}')
}

fn key_value(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    Some((key.trim(), value.trim()))
}
