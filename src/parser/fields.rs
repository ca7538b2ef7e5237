// Field splitting and value normalization for tab-delimited records.
// Splitting follows the dataset's conventions: tabs only, no trimming, and
// trailing empty fields are dropped.

use std::borrow::Cow;

/// Token the dataset uses for an absent value.
pub const NULL_SENTINEL: &str = "\\N";

/// Value stored for a position the record does not have.
pub const MISSING_FIELD: &str = " ";

/// Split one line into its raw fields.
///
/// A line without any tab comes back as a single field, even when empty.
/// Trailing empty fields are removed, so a line made only of tabs has no
/// fields at all.
pub fn split(line: &str) -> Vec<&str> {
    if !line.contains('\t') {
        return vec![line];
    }
    let mut fields: Vec<&str> = line.split('\t').collect();
    while fields.last().is_some_and(|f| f.is_empty()) {
        fields.pop();
    }
    fields
}

/// Resolve a raw field to the value that should be stored.
///
/// Missing positions become a single space and the null sentinel becomes
/// an empty string. Everything else passes through untouched.
pub fn resolve(raw: Option<&str>) -> Cow<'_, str> {
    match raw {
        None => Cow::Borrowed(MISSING_FIELD),
        Some(NULL_SENTINEL) => Cow::Borrowed(""),
        Some(v) => Cow::Borrowed(v),
    }
}

/// Double every single quote so the value can sit inside a SQL literal.
pub fn escape(value: &str) -> Cow<'_, str> {
    if value.contains('\'') {
        Cow::Owned(value.replace('\'', "''"))
    } else {
        Cow::Borrowed(value)
    }
}

/// Resolve then escape: the literal body of a raw field inside inline SQL.
pub fn normalize(raw: Option<&str>) -> String {
    escape(&resolve(raw)).into_owned()
}

/// Strip the line terminator left by `read_line` (`\n` or `\r\n`).
pub fn trim_line_end(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}
