//! Node parameters, inputs and results are plain JSON values.

pub use serde_json::{Map, Value};

/// Convenience accessors used by node implementations
pub trait ValueExt {
    /// JSON type name, for error messages
    fn type_name(&self) -> &'static str;

    /// `false` for `null`, which stands in for an absent value
    fn is_present(&self) -> bool;
}

impl ValueExt for Value {
    fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    fn is_present(&self) -> bool {
        !self.is_null()
    }
}
