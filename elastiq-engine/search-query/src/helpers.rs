use crate::error::QueryError;

pub trait Validate {
    fn validate(&self) -> Result<(), QueryError> {
        Ok(())
    }
}

/// Characters with a special meaning in the backend's query string syntax.
const RESERVED_CHARACTERS: &[char] = &[
    '+', '-', '=', '&', '|', '>', '<', '!', '(', ')', '{', '}', '[', ']', '^', '"',
    '~', '*', '?', ':', '\\', '/', ' ',
];

/// Escapes a user given pattern so it can be embedded in a query string
/// without being interpreted as query syntax.
pub fn escape_query_string(pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        if RESERVED_CHARACTERS.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }

    escaped
}
