//! The mutable context record owned by one interpreter.
//!
//! Context is a flat record of named JSON values. It is initialized from a
//! definition's defaults, mutated in place by actions, and discarded when the
//! interpreter stops. It is never shared between interpreter instances.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A mutable record of named fields.
///
/// Actions mutate the context directly via [`Context::set`]; guards and
/// computed derivations read it. Computed values are written back into the
/// record under their own names after every processed event, so guards can
/// read them like any other field.
///
/// # Example
///
/// ```rust
/// use machina::Context;
///
/// let mut ctx = Context::new();
/// ctx.set("value", 30);
/// ctx.set("disabled", false);
///
/// assert_eq!(ctx.f64_field("value"), Some(30.0));
/// assert!(!ctx.bool_field("disabled"));
/// assert!(!ctx.bool_field("missing"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context {
    fields: Map<String, Value>,
}

impl Context {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context from a map of default values.
    pub fn from_map(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Read a field's raw value.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Write a field, replacing any previous value.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Remove a field, returning its previous value.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    /// Whether a field is present.
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Read a boolean field. Absent or non-boolean fields read as `false`.
    pub fn bool_field(&self, field: &str) -> bool {
        self.get(field).and_then(Value::as_bool).unwrap_or(false)
    }

    /// Read a numeric field as `f64`.
    pub fn f64_field(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(Value::as_f64)
    }

    /// Read a numeric field as `i64`.
    pub fn i64_field(&self, field: &str) -> Option<i64> {
        self.get(field).and_then(Value::as_i64)
    }

    /// Read a string field.
    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    /// All fields in the record.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}
