use std::fmt;
use std::sync::Arc;

use crate::common::{DbError, Result};

use super::FieldType;

/// Represents a single field of a schema.
#[derive(Debug, Clone)]
pub struct Column {
    /// Field name; purely descriptive
    name: Option<String>,

    /// Field type
    field_type: FieldType,
}

impl Column {
    /// Creates a named column.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: Some(name.into()),
            field_type,
        }
    }

    /// Creates a column without a name.
    pub fn unnamed(field_type: FieldType) -> Self {
        Self {
            name: None,
            field_type,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }
}

/// Describes the layout of a record: an ordered, non-empty sequence of
/// typed (and optionally named) fields.
///
/// Two schemas are equal when they have the same field types in the same
/// order; names do not take part in equality.
#[derive(Debug, Clone)]
pub struct Schema {
    /// Ordered list of columns
    columns: Vec<Column>,

    /// Packed size of a record in bytes
    record_size: usize,
}

impl Schema {
    /// Creates a new schema from a list of columns.
    ///
    /// # Panics
    /// Panics if `columns` is empty.
    pub fn new(columns: Vec<Column>) -> Self {
        assert!(!columns.is_empty(), "Schema must have at least one field");
        let record_size = columns.iter().map(|c| c.field_type.len()).sum();
        Self {
            columns,
            record_size,
        }
    }

    /// Creates a schema of unnamed fields.
    pub fn from_types(types: &[FieldType]) -> Self {
        Self::new(types.iter().map(|&t| Column::unnamed(t)).collect())
    }

    /// Creates a schema builder for fluent construction.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    /// Returns the number of fields.
    pub fn num_fields(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter()
    }

    /// Returns the type of the field at `index`.
    pub fn field_type(&self, index: usize) -> Result<FieldType> {
        self.columns
            .get(index)
            .map(|c| c.field_type)
            .ok_or(DbError::InvalidFieldIndex {
                index,
                len: self.columns.len(),
            })
    }

    /// Returns the name of the field at `index`, if it has one.
    pub fn field_name(&self, index: usize) -> Result<Option<&str>> {
        self.columns
            .get(index)
            .map(|c| c.name())
            .ok_or(DbError::InvalidFieldIndex {
                index,
                len: self.columns.len(),
            })
    }

    /// Returns the index of the first field called `name`.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name() == Some(name))
    }

    /// Returns the packed size of one record in bytes.
    pub fn record_size(&self) -> usize {
        self.record_size
    }

    /// Concatenates two schemas, `first`'s fields before `second`'s.
    pub fn merge(first: &Schema, second: &Schema) -> Schema {
        let columns = first
            .columns
            .iter()
            .chain(second.columns.iter())
            .cloned()
            .collect();
        Schema::new(columns)
    }

    /// Returns a copy of this schema whose field names are qualified as
    /// `alias.name`. Unnamed fields become `alias.null`.
    pub fn with_alias(&self, alias: &str) -> Schema {
        let columns = self
            .columns
            .iter()
            .map(|c| {
                let name = format!("{}.{}", alias, c.name().unwrap_or("null"));
                Column::new(name, c.field_type)
            })
            .collect();
        Schema::new(columns)
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .zip(&other.columns)
                .all(|(a, b)| a.field_type == b.field_type)
    }
}

impl Eq for Schema {}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, col) in self.columns.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            let kind = match col.field_type {
                FieldType::Int => "INT",
                FieldType::Str(_) => "STRING",
            };
            write!(f, "{}({})", kind, col.name().unwrap_or("null"))?;
        }
        Ok(())
    }
}

/// Builder for constructing schemas fluently.
pub struct SchemaBuilder {
    columns: Vec<Column>,
}

impl SchemaBuilder {
    /// Creates a new schema builder.
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
        }
    }

    /// Adds a named column.
    pub fn column(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.columns.push(Column::new(name, field_type));
        self
    }

    /// Adds an unnamed column.
    pub fn unnamed(mut self, field_type: FieldType) -> Self {
        self.columns.push(Column::unnamed(field_type));
        self
    }

    /// Builds the schema.
    pub fn build(self) -> Schema {
        Schema::new(self.columns)
    }

    /// Builds the schema wrapped in an Arc for shared ownership.
    pub fn build_arc(self) -> Arc<Schema> {
        Arc::new(self.build())
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_schema() -> Schema {
        Schema::builder()
            .column("id", FieldType::Int)
            .column("name", FieldType::Str(16))
            .column("age", FieldType::Int)
            .build()
    }

    #[test]
    fn test_schema_creation() {
        let schema = create_test_schema();

        assert_eq!(schema.num_fields(), 3);
        assert_eq!(schema.field_name(0).unwrap(), Some("id"));
        assert_eq!(schema.field_type(1).unwrap(), FieldType::Str(16));
        assert!(matches!(
            schema.field_type(3),
            Err(DbError::InvalidFieldIndex { index: 3, len: 3 })
        ));
    }

    #[test]
    #[should_panic(expected = "at least one field")]
    fn test_empty_schema_rejected() {
        Schema::new(Vec::new());
    }

    #[test]
    fn test_field_lookup() {
        let schema = create_test_schema();

        assert_eq!(schema.field_index("id"), Some(0));
        assert_eq!(schema.field_index("age"), Some(2));
        assert_eq!(schema.field_index("nonexistent"), None);
    }

    #[test]
    fn test_record_size() {
        let schema = create_test_schema();
        // 4 + (4 + 16) + 4
        assert_eq!(schema.record_size(), 28);
    }

    #[test]
    fn test_equality_ignores_names() {
        let named = create_test_schema();
        let unnamed = Schema::from_types(&[FieldType::Int, FieldType::Str(16), FieldType::Int]);
        assert_eq!(named, unnamed);

        let shorter = Schema::from_types(&[FieldType::Int, FieldType::Str(16)]);
        assert_ne!(named, shorter);

        let reordered = Schema::from_types(&[FieldType::Str(16), FieldType::Int, FieldType::Int]);
        assert_ne!(named, reordered);
    }

    #[test]
    fn test_merge() {
        let a = Schema::builder().column("a", FieldType::Int).build();
        let b = Schema::builder()
            .column("b", FieldType::Str(4))
            .column("c", FieldType::Int)
            .build();

        let merged = Schema::merge(&a, &b);
        assert_eq!(merged.num_fields(), 3);
        assert_eq!(merged.field_index("c"), Some(2));
        assert_eq!(merged.record_size(), a.record_size() + b.record_size());
    }

    #[test]
    fn test_alias() {
        let schema = Schema::builder()
            .column("id", FieldType::Int)
            .unnamed(FieldType::Int)
            .build();
        let aliased = schema.with_alias("t");

        assert_eq!(aliased.field_name(0).unwrap(), Some("t.id"));
        assert_eq!(aliased.field_name(1).unwrap(), Some("t.null"));
        assert_eq!(aliased, schema);
    }

    #[test]
    fn test_display() {
        let schema = create_test_schema();
        assert_eq!(schema.to_string(), "INT(id), STRING(name), INT(age)");
    }
}
