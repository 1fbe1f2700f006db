//! Schema description for xdata documents
//!
//! A schema maps block names to destinations inside a document type. Each
//! destination is either a single optional record (`Option<R>`) or a
//! repeatable block (`Vec<R>`). Records describe their fields through a
//! static table of [`Field`] descriptors, usually generated by
//! [`xdata_record!`](crate::xdata_record).

use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Kind of value a record field holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Integer,
    Boolean,
    Float,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::String => write!(f, "string"),
            FieldKind::Integer => write!(f, "int"),
            FieldKind::Boolean => write!(f, "bool"),
            FieldKind::Float => write!(f, "float"),
        }
    }
}

/// A raw value could not be converted into the field's type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unable to convert '{value}' to {kind}")]
pub struct CoerceError {
    pub kind: FieldKind,
    pub value: String,
}

impl CoerceError {
    pub fn new(kind: FieldKind, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// A type that can be assigned from the raw text of a `key=value` line
pub trait FieldValue: Sized {
    const KIND: FieldKind;

    fn parse_field(raw: &str) -> Result<Self, CoerceError>;
}

impl FieldValue for String {
    const KIND: FieldKind = FieldKind::String;

    fn parse_field(raw: &str) -> Result<Self, CoerceError> {
        Ok(raw.to_string())
    }
}

impl FieldValue for i64 {
    const KIND: FieldKind = FieldKind::Integer;

    fn parse_field(raw: &str) -> Result<Self, CoerceError> {
        raw.parse().map_err(|_| CoerceError::new(Self::KIND, raw))
    }
}

impl FieldValue for bool {
    const KIND: FieldKind = FieldKind::Boolean;

    fn parse_field(raw: &str) -> Result<Self, CoerceError> {
        match raw {
            "0" => Ok(false),
            "1" => Ok(true),
            _ => Err(CoerceError::new(Self::KIND, raw)),
        }
    }
}

impl FieldValue for f64 {
    const KIND: FieldKind = FieldKind::Float;

    fn parse_field(raw: &str) -> Result<Self, CoerceError> {
        raw.parse().map_err(|_| CoerceError::new(Self::KIND, raw))
    }
}

/// Typed setter assigning a raw value into one field of `R`
pub type Setter<R> = fn(&mut R, &str) -> Result<(), CoerceError>;

/// Compile-time descriptor of a single record field
pub struct Field<R> {
    name: &'static str,
    kind: FieldKind,
    set: Setter<R>,
}

impl<R> Field<R> {
    pub const fn new(name: &'static str, kind: FieldKind, set: Setter<R>) -> Self {
        Self { name, kind, set }
    }

    /// Identifier the field was declared with (before normalization)
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn assign(&self, record: &mut R, raw: &str) -> Result<(), CoerceError> {
        (self.set)(record, raw)
    }
}

impl<R> fmt::Debug for Field<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

/// A flat record decodable from one block
pub trait Record: Default + Send + Sync + 'static {
    fn fields() -> &'static [Field<Self>];
}

/// A top-level document with a fixed schema
pub trait Document: Default + Sized + 'static {
    fn schema() -> &'static Schema<Self>;
}

/// Type-erased access to a record being decoded
pub(crate) trait RecordSlot {
    fn assign(&mut self, index: usize, raw: &str) -> Result<(), CoerceError>;
}

impl<R: Record> RecordSlot for R {
    fn assign(&mut self, index: usize, raw: &str) -> Result<(), CoerceError> {
        match R::fields().get(index) {
            Some(field) => field.assign(self, raw),
            None => Ok(()),
        }
    }
}

/// How often a block may occur in a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// At most one occurrence; a later occurrence replaces the earlier one
    Single,
    /// Any number of occurrences, kept in file order
    Repeated,
}

trait BlockTarget<D>: Send + Sync {
    fn open<'a>(&self, doc: &'a mut D) -> &'a mut dyn RecordSlot;
}

struct SingleTarget<D, R> {
    get: fn(&mut D) -> &mut Option<R>,
}

impl<D: 'static, R: Record> BlockTarget<D> for SingleTarget<D, R> {
    fn open<'a>(&self, doc: &'a mut D) -> &'a mut dyn RecordSlot {
        (self.get)(doc).insert(R::default())
    }
}

struct RepeatedTarget<D, R> {
    get: fn(&mut D) -> &mut Vec<R>,
}

impl<D: 'static, R: Record> BlockTarget<D> for RepeatedTarget<D, R> {
    fn open<'a>(&self, doc: &'a mut D) -> &'a mut dyn RecordSlot {
        let records = (self.get)(doc);
        records.push(R::default());
        let last = records.len() - 1;
        &mut records[last]
    }
}

/// One registered block of a schema
pub struct Block<D> {
    name: String,
    shape: Shape,
    keys: HashMap<String, usize>,
    duplicate_keys: Vec<String>,
    target: Box<dyn BlockTarget<D>>,
}

impl<D> Block<D> {
    fn new<R: Record>(name: &str, shape: Shape, target: Box<dyn BlockTarget<D>>) -> Self {
        let mut keys = HashMap::new();
        let mut duplicate_keys = Vec::new();
        for (index, field) in R::fields().iter().enumerate() {
            let key = normalize_key(field.name());
            if keys.insert(key.clone(), index).is_some() {
                duplicate_keys.push(key);
            }
        }

        Self {
            name: name.to_string(),
            shape,
            keys,
            duplicate_keys,
            target,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Position of the field matching `key` in the record's field table
    pub fn field_index(&self, key: &str) -> Option<usize> {
        self.keys.get(key).copied()
    }

    pub(crate) fn open<'a>(&self, doc: &'a mut D) -> &'a mut dyn RecordSlot {
        self.target.open(doc)
    }
}

impl<D> fmt::Debug for Block<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("name", &self.name)
            .field("shape", &self.shape)
            .field("fields", &self.keys.len())
            .finish()
    }
}

/// Mapping of block names to destinations inside `D`
///
/// Built once per document type; the normalized key maps of every record
/// are computed when the block is registered.
#[derive(Debug)]
pub struct Schema<D> {
    blocks: Vec<Block<D>>,
}

impl<D: 'static> Schema<D> {
    pub fn builder() -> SchemaBuilder<D> {
        SchemaBuilder { blocks: Vec::new() }
    }

    pub fn block(&self, name: &str) -> Option<&Block<D>> {
        self.blocks.iter().find(|b| b.name == name)
    }

    pub fn blocks(&self) -> &[Block<D>] {
        &self.blocks
    }

    /// Check that the schema describes a single well-formed top-level record
    pub fn validate(&self) -> Result<(), String> {
        if self.blocks.is_empty() {
            return Err("schema has no blocks".to_string());
        }

        for (i, block) in self.blocks.iter().enumerate() {
            if !is_block_name(&block.name) {
                return Err(format!("invalid block name '{}'", block.name));
            }
            if self.blocks[..i].iter().any(|b| b.name == block.name) {
                return Err(format!("block '{}' registered more than once", block.name));
            }
            if let Some(key) = block.duplicate_keys.first() {
                return Err(format!(
                    "block '{}' has more than one field named '{key}'",
                    block.name
                ));
            }
        }

        Ok(())
    }
}

/// Registers the blocks of a [`Schema`]
pub struct SchemaBuilder<D> {
    blocks: Vec<Block<D>>,
}

impl<D: 'static> SchemaBuilder<D> {
    /// Register a block that occurs at most once
    pub fn single<R: Record>(mut self, name: &str, get: fn(&mut D) -> &mut Option<R>) -> Self {
        let target = Box::new(SingleTarget { get });
        self.blocks
            .push(Block::new::<R>(name, Shape::Single, target));
        self
    }

    /// Register a repeatable block
    pub fn repeated<R: Record>(mut self, name: &str, get: fn(&mut D) -> &mut Vec<R>) -> Self {
        let target = Box::new(RepeatedTarget { get });
        self.blocks
            .push(Block::new::<R>(name, Shape::Repeated, target));
        self
    }

    pub fn build(self) -> Schema<D> {
        Schema {
            blocks: self.blocks,
        }
    }
}

fn is_block_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Convert an identifier into the lower snake_case key used in xdata files
///
/// `HostName` becomes `host_name`, `NagiosPID` becomes `nagios_pid`, and
/// identifiers that are already snake_case are returned unchanged.
pub fn normalize_key(ident: &str) -> String {
    let chars: Vec<char> = ident.chars().collect();
    let mut key = String::with_capacity(ident.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            if prev != '_' && (prev.is_ascii_lowercase() || prev.is_ascii_digit() || next_is_lower)
            {
                key.push('_');
            }
        }
        key.push(c.to_ascii_lowercase());
    }

    key
}
