use ordered_float::OrderedFloat;
use std::sync::Arc;

use crate::ColumnType;

/// A single cell of a [`crate::Table`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Int64(i64),
    Float64(OrderedFloat<f64>),
    Boolean(bool),
    String(Arc<str>),
    Null,
}

impl Value {
    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get the type name of the value
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int64(_) => "Int64",
            Value::Float64(_) => "Float64",
            Value::Boolean(_) => "Boolean",
            Value::String(_) => "String",
            Value::Null => "Null",
        }
    }

    /// Whether a non-null value can be stored in a column of `column_type`
    pub fn matches(&self, column_type: ColumnType) -> bool {
        matches!(
            (self, column_type),
            (Value::Int64(_), ColumnType::Int64)
                | (Value::Float64(_), ColumnType::Float64)
                | (Value::Boolean(_), ColumnType::Boolean)
                | (Value::String(_), ColumnType::Utf8)
        )
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(OrderedFloat(v))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(Arc::from(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(Arc::from(v))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}
