//! Declared-vs-live containment check.
//!
//! A declared spec is satisfied when at least one live document carries every
//! one of its top-level key/value pairs with a deeply-equal value. Live
//! documents may have extra top-level keys (ids, server defaults); the
//! reverse direction is never checked.
//!
//! Containment applies at the top level only. Below it, mappings must match
//! exactly (same key set) and sequences element-wise.

use serde_json::{Map, Value};

use crate::normalize::round_to_places;

/// Equality policy for the containment check.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Matcher {
    /// When set, numbers are compared after rounding both sides to this many
    /// decimal places. The declared document itself is not modified.
    numeric_places: Option<u32>,
}

impl Matcher {
    /// Plain deep equality.
    pub fn exact() -> Self {
        Self {
            numeric_places: None,
        }
    }

    /// Deep equality with numbers compared at `places` decimal places.
    pub fn rounded(places: u32) -> Self {
        Self {
            numeric_places: Some(places),
        }
    }

    /// `true` iff some document in `pool` contains all of `local`'s pairs.
    pub fn is_satisfied(&self, local: &Value, pool: &[Value]) -> bool {
        pool.iter().any(|live| self.contains(live, local))
    }

    /// `true` iff `live` contains every top-level pair of `local`.
    ///
    /// A non-mapping `local` is only contained in an equal value.
    pub fn contains(&self, live: &Value, local: &Value) -> bool {
        match (local, live) {
            (Value::Object(want), Value::Object(have)) => self.contains_pairs(have, want),
            _ => self.values_equal(local, live),
        }
    }

    fn contains_pairs(&self, have: &Map<String, Value>, want: &Map<String, Value>) -> bool {
        want.iter().all(|(k, v)| match have.get(k) {
            Some(hv) => self.values_equal(v, hv),
            None => false,
        })
    }

    /// Structural equality. Key order never matters.
    pub fn values_equal(&self, a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(x), Value::Bool(y)) => x == y,
            (Value::String(x), Value::String(y)) => x == y,
            (Value::Number(_), Value::Number(_)) => self.numbers_equal(a, b),
            (Value::Array(xs), Value::Array(ys)) => {
                xs.len() == ys.len()
                    && xs.iter().zip(ys.iter()).all(|(x, y)| self.values_equal(x, y))
            }
            (Value::Object(xm), Value::Object(ym)) => {
                xm.len() == ym.len()
                    && xm.iter().all(|(k, xv)| match ym.get(k) {
                        Some(yv) => self.values_equal(xv, yv),
                        None => false,
                    })
            }
            _ => false,
        }
    }

    // `1000` and `1000.0` are the same value; serde_json's own PartialEq
    // says otherwise, so compare by numeric value.
    fn numbers_equal(&self, a: &Value, b: &Value) -> bool {
        if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
            return x == y;
        }
        if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
            return x == y;
        }
        match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => match (a.is_f64(), b.is_f64()) {
                (true, true) => self.at_precision(x) == self.at_precision(y),
                (false, true) => int_equals_float(a, self.at_precision(y)),
                (true, false) => int_equals_float(b, self.at_precision(x)),
                // negative i64 against a u64 beyond i64::MAX
                (false, false) => false,
            },
            _ => false,
        }
    }

    fn at_precision(&self, x: f64) -> f64 {
        match self.numeric_places {
            Some(places) => round_to_places(x, places),
            None => x,
        }
    }
}

/// Exact integer/float equality: the float must be integral and inside the
/// integer's range, so `2^53 + 1` never equals `2^53 as f64`.
fn int_equals_float(int: &Value, f: f64) -> bool {
    const I64_BOUND: f64 = 9_223_372_036_854_775_808.0; // 2^63
    const U64_BOUND: f64 = 18_446_744_073_709_551_616.0; // 2^64

    if !f.is_finite() || f.fract() != 0.0 {
        return false;
    }
    if let Some(n) = int.as_i64() {
        return (-I64_BOUND..I64_BOUND).contains(&f) && f as i64 == n;
    }
    if let Some(n) = int.as_u64() {
        return (0.0..U64_BOUND).contains(&f) && f as u64 == n;
    }
    false
}

/// `true` iff some document in `pool` carries every top-level key/value pair
/// of `local` with a deeply-equal value.
pub fn is_satisfied(local: &Value, pool: &[Value]) -> bool {
    Matcher::exact().is_satisfied(local, pool)
}
