use crate::{ColumnType, Field};

/// Trait for schema introspection
///
/// This trait provides methods for examining and querying schemas
/// without modifying them.
pub trait SchemaInspector {
    /// Get the number of fields
    fn field_count(&self) -> usize;

    /// Get field by name
    fn get_field(&self, name: &str) -> Option<&Field>;

    /// Check if schema contains a specific field
    fn has_field(&self, name: &str) -> bool;

    /// Get all field names in column order
    fn field_names(&self) -> Vec<&str>;

    /// Get the names of all fields of the given type
    fn fields_of_type(&self, column_type: ColumnType) -> Vec<&str>;
}

impl SchemaInspector for crate::Schema {
    fn field_count(&self) -> usize {
        self.fields.len()
    }

    fn get_field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    fn has_field(&self, name: &str) -> bool {
        self.get_field(name).is_some()
    }

    fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    fn fields_of_type(&self, column_type: ColumnType) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.column_type == column_type)
            .map(|f| f.name.as_str())
            .collect()
    }
}
