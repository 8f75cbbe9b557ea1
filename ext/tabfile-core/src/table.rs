//! In-memory columnar tables

use indexmap::IndexMap;

use crate::{ColumnType, Field, Result, Schema, TabfileError, ValidationError, Value};

/// A named, typed sequence of values
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    field: Field,
    values: Vec<Value>,
}

impl Column {
    pub fn new(field: Field, values: Vec<Value>) -> Self {
        Self { field, values }
    }

    /// Build a column of `column_type`, nullable only if `values` holds a null
    pub fn from_values<S, I, V>(name: S, column_type: ColumnType, values: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        let nullable = values.iter().any(Value::is_null);
        Self::new(Field::new(name, column_type, nullable), values)
    }

    pub fn field(&self) -> &Field {
        &self.field
    }

    pub fn name(&self) -> &str {
        &self.field.name
    }

    pub fn column_type(&self) -> ColumnType {
        self.field.column_type
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn null_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_null()).count()
    }

    pub fn into_parts(self) -> (Field, Vec<Value>) {
        (self.field, self.values)
    }
}

/// An ordered set of equally long, uniquely named columns
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    num_rows: usize,
}

impl Table {
    /// Assemble a table, checking that names are unique and lengths agree
    pub fn try_new(columns: Vec<Column>) -> Result<Self> {
        let mut seen: IndexMap<&str, usize> = IndexMap::new();
        for column in &columns {
            *seen.entry(column.name()).or_default() += 1;
        }
        let duplicates: Vec<String> = seen
            .iter()
            .filter(|(_, count)| **count > 1)
            .map(|(name, _)| name.to_string())
            .collect();
        if !duplicates.is_empty() {
            return Err(ValidationError::DuplicateColumnNames { names: duplicates }.into());
        }

        let num_rows = columns.first().map(Column::len).unwrap_or(0);
        if let Some(column) = columns.iter().find(|c| c.len() != num_rows) {
            return Err(TabfileError::invalid_argument(format!(
                "Column '{}' has {} rows but column '{}' has {}",
                column.name(),
                column.len(),
                columns[0].name(),
                num_rows
            )));
        }

        Ok(Self { columns, num_rows })
    }

    /// A table with no columns and no rows
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            num_rows: 0,
        }
    }

    pub fn schema(&self) -> Schema {
        Schema {
            fields: self.columns.iter().map(|c| c.field().clone()).collect(),
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }
}
