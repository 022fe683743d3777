//! Change detection on endpoint outputs.

use serde_json::{Number, Value};

/// Callback invoked with each output that differs from the previous one.
pub type ChangeCallback = Box<dyn FnMut(&Value) + Send>;

/// Decision taken by [`ChangeDetector::evaluate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The candidate differed and the callback ran.
    Notified,
    /// The candidate equals the previous output.
    Suppressed,
}

/// Remembers the last delivered output and filters out repeats.
pub struct ChangeDetector {
    previous: Option<Value>,
    on_change: ChangeCallback,
}

impl ChangeDetector {
    /// Creates a detector with no previous output.
    #[must_use]
    pub fn new(on_change: ChangeCallback) -> Self {
        Self {
            previous: None,
            on_change,
        }
    }

    /// Returns the last delivered output.
    #[must_use]
    pub const fn previous(&self) -> Option<&Value> {
        self.previous.as_ref()
    }

    /// Delivers `candidate` unless it equals the previous output.
    ///
    /// The first candidate is always delivered. The callback runs
    /// synchronously, after the candidate has become the previous output.
    pub fn evaluate(&mut self, candidate: Value) -> Verdict {
        if self
            .previous
            .as_ref()
            .is_some_and(|previous| canonical_eq(previous, &candidate))
        {
            return Verdict::Suppressed;
        }

        tracing::info!("Output changed");
        let current = self.previous.insert(candidate);
        (self.on_change)(current);
        Verdict::Notified
    }
}

impl std::fmt::Debug for ChangeDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeDetector")
            .field("previous", &self.previous)
            .finish_non_exhaustive()
    }
}

/// Structural equality of two JSON values.
///
/// - Object key order is ignored
/// - Array order matters
/// - Numbers compare by value, so `1` equals `1.0`
#[must_use]
pub fn canonical_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => numbers_eq(x, y),
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| canonical_eq(x, y))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(key, x)| y.get(key).is_some_and(|y| canonical_eq(x, y)))
        }
        _ => false,
    }
}

#[allow(clippy::float_cmp)]
fn numbers_eq(x: &Number, y: &Number) -> bool {
    if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
        return x == y;
    }
    match (x.as_f64(), y.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

#[cfg(test)]
#[path = "change_tests.rs"]
mod tests;
