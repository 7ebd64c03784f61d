//! Value escaping for statement construction.
//!
//! Every field value is routed through here before it is interpolated into
//! a statement, so quoting rules live in exactly one place.

use serde_json::Value;

/// Quote a string literal, escaping backslashes and single quotes.
pub fn quote_str(s: &str) -> String {
    let escaped = s.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}'")
}

/// Render a scalar field value as a statement literal.
///
/// Numbers and booleans render bare, strings quoted, null as `NONE`.
/// Compound values are not part of the data model and fall back to their
/// quoted JSON encoding.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "NONE".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote_str(s),
        other => quote_str(&other.to_string()),
    }
}
