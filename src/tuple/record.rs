use std::fmt;
use std::sync::Arc;

use bytes::{Buf, BufMut};

use crate::common::{DbError, RecordId, Result};

use super::field_type::truncate_str;
use super::{Field, FieldType, Schema};

/// Represents a single row of a table.
///
/// A record holds one value per field of its schema, each of the type the
/// schema declares at that position. It carries a [`RecordId`] only once it
/// is known to live in a particular page slot.
///
/// ## Packed Format
///
/// ```text
/// +-----------+-----------+-----+-----------+
/// | field 0   | field 1   | ... | field n-1 |
/// +-----------+-----------+-----+-----------+
/// ```
///
/// Every field has the fixed width of its type (see [`FieldType::len`]), so
/// the packed size equals [`Schema::record_size`].
#[derive(Debug, Clone)]
pub struct Record {
    /// The schema defining the structure of this record
    schema: Arc<Schema>,

    /// The values for each field (in schema order)
    fields: Vec<Field>,

    /// Location on disk, if the record has been stored
    record_id: Option<RecordId>,
}

impl Record {
    /// Creates a record with every field set to its type's default value.
    pub fn new(schema: Arc<Schema>) -> Self {
        let fields = schema.columns().map(|c| c.field_type().default_field()).collect();
        Self {
            schema,
            fields,
            record_id: None,
        }
    }

    /// Creates a record from a full list of values.
    pub fn from_fields(schema: Arc<Schema>, fields: Vec<Field>) -> Result<Self> {
        if fields.len() != schema.num_fields() {
            return Err(DbError::SchemaMismatch(format!(
                "expected {} fields, got {}",
                schema.num_fields(),
                fields.len()
            )));
        }
        let mut record = Self::new(schema);
        for (i, field) in fields.into_iter().enumerate() {
            record.set_field(i, field)?;
        }
        Ok(record)
    }

    /// Reads a packed record of the given schema.
    /// The buffer must hold at least `schema.record_size()` bytes.
    pub fn unpack(schema: Arc<Schema>, buf: &mut impl Buf) -> Self {
        let fields = schema.columns().map(|c| c.field_type().parse(buf)).collect();
        Self {
            schema,
            fields,
            record_id: None,
        }
    }

    /// Writes the packed form of this record, exactly `schema.record_size()` bytes.
    pub fn pack(&self, buf: &mut impl BufMut) {
        for (col, field) in self.schema.columns().zip(&self.fields) {
            col.field_type().pack(field, buf);
        }
    }

    /// Returns the schema of this record.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Returns the value at the given field index.
    pub fn field(&self, index: usize) -> Result<&Field> {
        self.fields.get(index).ok_or(DbError::InvalidFieldIndex {
            index,
            len: self.fields.len(),
        })
    }

    /// Sets the value at the given field index.
    /// Fails if the value's type disagrees with the schema at that position.
    pub fn set_field(&mut self, index: usize, field: Field) -> Result<()> {
        let field_type = self.schema.field_type(index)?;
        if !field.matches(&field_type) {
            return Err(DbError::SchemaMismatch(format!(
                "field {} is {}, got a {} value",
                index,
                field_type,
                field.kind()
            )));
        }
        self.fields[index] = match (field, field_type) {
            (Field::Str(s), FieldType::Str(n)) if s.len() > n as usize => {
                Field::Str(truncate_str(&s, n as usize).to_string())
            }
            (field, _) => field,
        };
        Ok(())
    }

    /// Returns all values in this record.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Consumes the record, returning its values.
    pub fn into_fields(self) -> Vec<Field> {
        self.fields
    }

    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Always false; a schema has at least one field.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn record_id(&self) -> Option<RecordId> {
        self.record_id
    }

    pub fn set_record_id(&mut self, record_id: Option<RecordId>) {
        self.record_id = record_id;
    }

    /// Swaps in a schema with the same field types, e.g. one with qualified
    /// names. Values and record id are kept.
    pub fn relabel(&mut self, schema: Arc<Schema>) {
        debug_assert!(*schema == *self.schema, "relabel needs an equal schema");
        self.schema = schema;
    }

    /// Replaces the schema and resets every field to its default value.
    pub fn reset_schema(&mut self, schema: Arc<Schema>) {
        *self = Self::new(schema);
    }
}

/// Records compare by schema and values; the record id is ignored.
impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.schema == other.schema && self.fields == other.fields
    }
}

impl Eq for Record {}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, "\t")?;
            }
            write!(f, "{}", field)?;
        }
        Ok(())
    }
}

/// Builder for constructing records fluently.
pub struct RecordBuilder {
    schema: Arc<Schema>,
    fields: Vec<Field>,
}

impl RecordBuilder {
    /// Creates a new record builder for the given schema.
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            fields: Vec::new(),
        }
    }

    /// Appends the value for the next field.
    pub fn value(mut self, value: impl Into<Field>) -> Self {
        self.fields.push(value.into());
        self
    }

    /// Builds the record, checking every value against the schema.
    pub fn build(self) -> Result<Record> {
        Record::from_fields(self.schema, self.fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_schema() -> Arc<Schema> {
        Schema::builder()
            .column("id", FieldType::Int)
            .column("name", FieldType::Str(8))
            .build_arc()
    }

    #[test]
    fn test_new_record_has_defaults() {
        let record = Record::new(create_test_schema());
        assert_eq!(record.fields(), &[Field::Int(0), Field::from("")]);
        assert_eq!(record.record_id(), None);
    }

    #[test]
    fn test_set_field_type_mismatch() {
        let mut record = Record::new(create_test_schema());

        assert!(record.set_field(0, Field::Int(7)).is_ok());
        assert!(matches!(
            record.set_field(0, Field::from("seven")),
            Err(DbError::SchemaMismatch(_))
        ));
        assert!(matches!(
            record.set_field(5, Field::Int(1)),
            Err(DbError::InvalidFieldIndex { index: 5, .. })
        ));
        assert_eq!(record.field(0).unwrap(), &Field::Int(7));
    }

    #[test]
    fn test_builder() {
        let record = RecordBuilder::new(create_test_schema())
            .value(42)
            .value("bob")
            .build()
            .unwrap();

        assert_eq!(record.field(0).unwrap(), &Field::Int(42));
        assert_eq!(record.field(1).unwrap(), &Field::from("bob"));
    }

    #[test]
    fn test_builder_wrong_arity() {
        let result = RecordBuilder::new(create_test_schema()).value(1).build();
        assert!(matches!(result, Err(DbError::SchemaMismatch(_))));
    }

    #[test]
    fn test_long_string_truncated_on_set() {
        let mut record = Record::new(create_test_schema());
        record.set_field(1, Field::from("abcdefghijkl")).unwrap();
        assert_eq!(record.field(1).unwrap(), &Field::from("abcdefgh"));
    }

    #[test]
    fn test_pack_unpack() {
        let schema = create_test_schema();
        let record = RecordBuilder::new(schema.clone())
            .value(-12)
            .value("carol")
            .build()
            .unwrap();

        let mut buf = Vec::new();
        record.pack(&mut buf);
        assert_eq!(buf.len(), schema.record_size());

        let unpacked = Record::unpack(schema, &mut &buf[..]);
        assert_eq!(unpacked, record);
    }

    #[test]
    fn test_equality_ignores_record_id() {
        use crate::common::{PageId, SlotId, TableId};

        let a = RecordBuilder::new(create_test_schema())
            .value(1)
            .value("x")
            .build()
            .unwrap();
        let mut b = a.clone();
        b.set_record_id(Some(RecordId::new(
            PageId::new(TableId::new(1), 0),
            SlotId::new(0),
        )));
        assert_eq!(a, b);
    }

    #[test]
    fn test_display() {
        let record = RecordBuilder::new(create_test_schema())
            .value(3)
            .value("dan")
            .build()
            .unwrap();
        assert_eq!(record.to_string(), "3\tdan");
    }
}
