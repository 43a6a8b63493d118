//! Leaf normalization for live spec documents.
//!
//! The server adds representational noise that has no counterpart in the
//! declared specs: float round-trip error in view properties, and
//! `database::` prefixes on analyzer names and types. Both are removed by
//! rewriting leaves of a single kind in place before comparison.
//!
//! Only ever applied to a freshly fetched remote snapshot. Declared specs
//! are already canonical and are never passed through here.

use serde_json::{Number, Value};

/// Decimal places kept by [`round_float`].
pub const ROUND_PLACES: u32 = 7;

/// Separator between a server namespace and the bare name.
pub const NAMESPACE_SEPARATOR: &str = "::";

/// Which leaves to rewrite, and how.
///
/// Pairs the leaf-kind predicate with the transform so a float transform can
/// never be handed a string and vice versa.
#[derive(Clone, Copy)]
pub enum LeafTransform<'a> {
    /// Floating-point numbers only. Integer-valued JSON numbers (`1000`) are
    /// not floats and stay untouched.
    Float(&'a dyn Fn(f64) -> f64),
    /// String leaves. Object keys are not leaves and are never rewritten.
    Text(&'a dyn Fn(&str) -> String),
}

/// Recursively rewrite every leaf selected by `transform`, in place.
///
/// Shape is preserved: keys, key order, array order and nesting are left as
/// they are, and leaves of any other kind are not touched.
pub fn normalize(node: &mut Value, transform: LeafTransform<'_>) {
    match node {
        Value::Object(map) => {
            for (_, v) in map.iter_mut() {
                normalize(v, transform);
            }
        }
        Value::Array(items) => {
            for v in items.iter_mut() {
                normalize(v, transform);
            }
        }
        Value::Number(n) => {
            if let LeafTransform::Float(f) = transform {
                if n.is_f64() {
                    if let Some(x) = n.as_f64() {
                        // from_f64 rejects NaN/inf; keep the original then.
                        if let Some(rewritten) = Number::from_f64(f(x)) {
                            *n = rewritten;
                        }
                    }
                }
            }
        }
        Value::String(s) => {
            if let LeafTransform::Text(f) = transform {
                *s = f(s);
            }
        }
        Value::Null | Value::Bool(_) => {}
    }
}

/// Round `x` to `places` decimal places.
///
/// Rounds the exact binary value through its decimal expansion, so a value
/// stored just below a halfway point rounds down. Non-finite values are
/// returned unchanged.
pub fn round_to_places(x: f64, places: u32) -> f64 {
    if !x.is_finite() {
        return x;
    }
    format!("{:.*}", places as usize, x).parse::<f64>().unwrap_or(x)
}

/// Absorb float round-off from the server's storage layer.
pub fn round_float(x: f64) -> f64 {
    round_to_places(x, ROUND_PLACES)
}

/// `namespace::thing` -> `thing`. Keeps the part after the last separator;
/// strings without a separator are returned as-is.
pub fn excise_namespace(s: &str) -> String {
    s.rsplit(NAMESPACE_SEPARATOR).next().unwrap_or(s).to_string()
}

/// Apply [`round_float`] to every float leaf of every document.
pub fn round_floats(docs: &mut [Value]) {
    for doc in docs.iter_mut() {
        normalize(doc, LeafTransform::Float(&round_float));
    }
}

/// Apply [`excise_namespace`] to every string leaf of every document.
pub fn excise_namespaces(docs: &mut [Value]) {
    for doc in docs.iter_mut() {
        normalize(doc, LeafTransform::Text(&excise_namespace));
    }
}
