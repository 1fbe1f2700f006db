use std::borrow::Cow;

/// Make untrusted text safe to embed in an external command
///
/// Newlines would end the command early and `;` separates command
/// arguments, so newlines become a literal `\n` and semicolons become `:`.
pub fn sanitize(input: &str) -> Cow<'_, str> {
    if !input.contains(['\n', ';']) {
        return Cow::Borrowed(input);
    }
    Cow::Owned(input.replace('\n', "\\n").replace(';', ":"))
}
