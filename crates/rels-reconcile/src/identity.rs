//! Stable, human-readable identities for failed specs.
//!
//! Identities are consumed by operators and by existing tooling that greps
//! for strings such as `reactions/persistent/['id']`, so field values are
//! rendered the way a Python `str()` would render them: strings bare at the
//! top, and Python literal syntax inside lists and mappings.

use serde_json::Value;

/// `"{collection}/{type}/{fields}"`.
pub fn index_identity(collection: &str, index: &Value) -> String {
    format!(
        "{}/{}/{}",
        collection,
        field_str(index, "type"),
        field_str(index, "fields")
    )
}

/// `"{name}/{type}"` for views and analyzers.
pub fn name_type_identity(doc: &Value) -> String {
    format!("{}/{}", field_str(doc, "name"), field_str(doc, "type"))
}

/// Render one field of `doc` as `str()` would; missing fields render `None`.
fn field_str(doc: &Value, key: &str) -> String {
    match doc.get(key) {
        Some(v) => py_str(v),
        None => "None".to_string(),
    }
}

/// Top-level `str()`: strings are bare, everything else is a literal.
pub fn py_str(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => py_literal(other),
    }
}

/// Python literal (`repr`) rendering of a JSON value.
pub fn py_literal(v: &Value) -> String {
    let mut out = String::new();
    write_literal(v, &mut out);
    out
}

fn write_literal(v: &Value, out: &mut String) {
    match v {
        Value::Null => out.push_str("None"),
        Value::Bool(true) => out.push_str("True"),
        Value::Bool(false) => out.push_str("False"),
        Value::Number(n) => {
            if n.is_f64() {
                out.push_str(&float_literal(n.as_f64().unwrap_or(0.0)));
            } else {
                out.push_str(&n.to_string());
            }
        }
        Value::String(s) => write_quoted(s, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_literal(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            out.push('{');
            for (i, (k, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_quoted(k, out);
                out.push_str(": ");
                write_literal(item, out);
            }
            out.push('}');
        }
    }
}

// Single quotes unless the text has a single quote and no double quote.
fn write_quoted(s: &str, out: &mut String) {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
}

// Shortest round-trip digits, with Python's exponent spelling (1e+16, 1e-05).
fn float_literal(x: f64) -> String {
    let abs = x.abs();
    if abs != 0.0 && !(1e-4..1e16).contains(&abs) {
        let s = format!("{x:e}");
        return match s.split_once('e') {
            Some((mantissa, exp)) => {
                let (sign, digits) = match exp.strip_prefix('-') {
                    Some(d) => ('-', d),
                    None => ('+', exp),
                };
                format!("{mantissa}e{sign}{digits:0>2}")
            }
            None => s,
        };
    }
    let s = format!("{x}");
    if s.contains('.') {
        s
    } else {
        format!("{s}.0")
    }
}
