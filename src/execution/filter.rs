use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::common::{DbError, Result};
use crate::tuple::{Field, Record, Schema};

use super::{OpIterator, RecordSource};

/// Comparison applied by a [`Predicate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equals,
    NotEquals,
    GreaterThan,
    GreaterThanOrEq,
    LessThan,
    LessThanOrEq,
    /// Substring match on strings, equality on integers
    Like,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompareOp::Equals => "=",
            CompareOp::NotEquals => "<>",
            CompareOp::GreaterThan => ">",
            CompareOp::GreaterThanOrEq => ">=",
            CompareOp::LessThan => "<",
            CompareOp::LessThanOrEq => "<=",
            CompareOp::Like => "LIKE",
        };
        f.write_str(s)
    }
}

/// Compares one field of a record against a constant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    field: usize,
    op: CompareOp,
    operand: Field,
}

impl Predicate {
    pub fn new(field: usize, op: CompareOp, operand: impl Into<Field>) -> Self {
        Self {
            field,
            op,
            operand: operand.into(),
        }
    }

    pub fn field(&self) -> usize {
        self.field
    }

    pub fn op(&self) -> CompareOp {
        self.op
    }

    pub fn operand(&self) -> &Field {
        &self.operand
    }

    /// Evaluates the predicate against `record`. Comparing fields of
    /// different kinds fails with `SchemaMismatch`.
    pub fn matches(&self, record: &Record) -> Result<bool> {
        let value = record.field(self.field)?;
        let ordering = match (value, &self.operand) {
            (Field::Int(a), Field::Int(b)) => a.cmp(b),
            (Field::Str(a), Field::Str(b)) => {
                if self.op == CompareOp::Like {
                    return Ok(a.contains(b.as_str()));
                }
                a.cmp(b)
            }
            (a, b) => {
                return Err(DbError::SchemaMismatch(format!(
                    "cannot compare {} with {}",
                    a.kind(),
                    b.kind()
                )))
            }
        };

        Ok(match self.op {
            CompareOp::Equals | CompareOp::Like => ordering == Ordering::Equal,
            CompareOp::NotEquals => ordering != Ordering::Equal,
            CompareOp::GreaterThan => ordering == Ordering::Greater,
            CompareOp::GreaterThanOrEq => ordering != Ordering::Less,
            CompareOp::LessThan => ordering == Ordering::Less,
            CompareOp::LessThanOrEq => ordering != Ordering::Greater,
        })
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f{} {} {}", self.field, self.op, self.operand)
    }
}

/// Passes through the child's records that satisfy a predicate.
pub struct Filter {
    predicate: Predicate,
    child: Box<dyn OpIterator>,
}

impl Filter {
    pub fn new(predicate: Predicate, child: Box<dyn OpIterator>) -> Self {
        Self { predicate, child }
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }
}

impl RecordSource for Filter {
    fn open(&mut self) -> Result<()> {
        self.child.open()
    }

    fn fetch_next(&mut self) -> Result<Option<Record>> {
        while let Some(record) = self.child.next()? {
            if self.predicate.matches(&record)? {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    fn rewind(&mut self) -> Result<()> {
        self.child.rewind()
    }

    fn close(&mut self) {
        self.child.close()
    }

    fn schema(&self) -> &Arc<Schema> {
        self.child.schema()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::MemoryScan;
    use crate::tuple::{FieldType, RecordBuilder};

    fn people() -> (Arc<Schema>, Vec<Record>) {
        let schema = Schema::builder()
            .column("age", FieldType::Int)
            .column("name", FieldType::Str(12))
            .build_arc();
        let records = [(31, "alice"), (17, "bob"), (45, "carol")]
            .iter()
            .map(|&(age, name)| {
                RecordBuilder::new(schema.clone())
                    .value(age)
                    .value(name)
                    .build()
                    .unwrap()
            })
            .collect();
        (schema, records)
    }

    #[test]
    fn test_int_comparisons() {
        let (_, records) = people();
        let older = Predicate::new(0, CompareOp::GreaterThan, 30);
        let exact = Predicate::new(0, CompareOp::Equals, 17);
        let at_most = Predicate::new(0, CompareOp::LessThanOrEq, 31);

        let hits = |p: &Predicate| records.iter().filter(|r| p.matches(r).unwrap()).count();
        assert_eq!(hits(&older), 2);
        assert_eq!(hits(&exact), 1);
        assert_eq!(hits(&at_most), 2);
    }

    #[test]
    fn test_like_is_substring() {
        let (_, records) = people();
        let p = Predicate::new(1, CompareOp::Like, "ar");
        assert!(!p.matches(&records[0]).unwrap());
        assert!(p.matches(&records[2]).unwrap());
    }

    #[test]
    fn test_kind_mismatch() {
        let (_, records) = people();
        let p = Predicate::new(1, CompareOp::Equals, 3);
        assert!(matches!(p.matches(&records[0]), Err(DbError::SchemaMismatch(_))));
    }

    #[test]
    fn test_filter_operator() {
        let (schema, records) = people();
        let child = Box::new(MemoryScan::new(schema, records).buffered());
        let mut filter = Filter::new(Predicate::new(0, CompareOp::NotEquals, 17), child).buffered();

        filter.open().unwrap();
        let mut names = Vec::new();
        while let Some(r) = filter.next().unwrap() {
            names.push(r.field(1).unwrap().as_str().unwrap().to_string());
        }
        assert_eq!(names, vec!["alice", "carol"]);

        filter.rewind().unwrap();
        assert!(filter.has_next().unwrap());
        filter.close();
    }
}
