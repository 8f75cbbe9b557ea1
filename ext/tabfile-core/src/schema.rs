/// Schema of a tabfile table: one field per column, in column order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub fields: Vec<Field>,
}

/// A named, typed column slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
}

/// Column types storable in a tabfile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Int64,
    Float64,
    Boolean,
    Utf8,
}

impl Field {
    pub fn new<S: Into<String>>(name: S, column_type: ColumnType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable,
        }
    }
}

impl ColumnType {
    /// Get the logical type name for display
    pub fn type_name(&self) -> &'static str {
        match self {
            ColumnType::Int64 => "Int64",
            ColumnType::Float64 => "Float64",
            ColumnType::Boolean => "Boolean",
            ColumnType::Utf8 => "Utf8",
        }
    }

    /// The one-byte tag stored in the footer
    pub fn tag(&self) -> u8 {
        match self {
            ColumnType::Int64 => 1,
            ColumnType::Float64 => 2,
            ColumnType::Boolean => 3,
            ColumnType::Utf8 => 4,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(ColumnType::Int64),
            2 => Some(ColumnType::Float64),
            3 => Some(ColumnType::Boolean),
            4 => Some(ColumnType::Utf8),
            _ => None,
        }
    }
}

impl Schema {
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Position of the field called `name`
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// Builder for creating schemas
pub struct SchemaBuilder {
    fields: Vec<Field>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_column<S: Into<String>>(
        self,
        name: S,
        column_type: ColumnType,
        nullable: bool,
    ) -> Self {
        self.with_field(Field::new(name, column_type, nullable))
    }

    pub fn build(self) -> Result<Schema, String> {
        for (i, field) in self.fields.iter().enumerate() {
            if self.fields[..i].iter().any(|f| f.name == field.name) {
                return Err(format!("Duplicate field name '{}'", field.name));
            }
        }
        Ok(Schema {
            fields: self.fields,
        })
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}
