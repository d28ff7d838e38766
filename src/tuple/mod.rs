mod field;
mod field_type;
mod record;
mod schema;

pub use field::Field;
pub use field_type::FieldType;
pub use record::{Record, RecordBuilder};
pub use schema::{Column, Schema, SchemaBuilder};
