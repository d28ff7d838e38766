//! The pull-based iterator protocol shared by every operator.
//!
//! An operator starts closed, is opened once, pulled with `has_next` and
//! `next`, optionally rewound, and closed again. Pulling a closed operator
//! fails with `IteratorNotOpen`; running out of records is `Ok(None)`.

use std::sync::Arc;

use crate::common::{DbError, Result};
use crate::tuple::{Record, Schema};

/// A query operator.
pub trait OpIterator: Send {
    /// Prepares the operator (and its children) for pulling.
    fn open(&mut self) -> Result<()>;

    /// Returns whether another record is available.
    fn has_next(&mut self) -> Result<bool>;

    /// Returns the next record, or None once the operator is exhausted.
    fn next(&mut self) -> Result<Option<Record>>;

    /// Restarts the operator from its first record.
    fn rewind(&mut self) -> Result<()>;

    /// Releases the operator's resources. Pulling afterwards fails.
    fn close(&mut self);

    /// Returns the schema of the records this operator yields.
    fn schema(&self) -> &Arc<Schema>;
}

/// The part of an operator that actually produces records.
///
/// Implementors only say how to produce the next record; [`Buffered`] adds
/// the open/closed state machine and the lookahead `has_next` needs.
pub trait RecordSource: Send {
    fn open(&mut self) -> Result<()>;

    /// Produces the next record, or None when there are no more.
    fn fetch_next(&mut self) -> Result<Option<Record>>;

    fn rewind(&mut self) -> Result<()>;

    fn close(&mut self) {}

    fn schema(&self) -> &Arc<Schema>;

    /// Wraps this source into a full [`OpIterator`].
    fn buffered(self) -> Buffered<Self>
    where
        Self: Sized,
    {
        Buffered::new(self)
    }
}

/// Turns a [`RecordSource`] into an [`OpIterator`] with single-record
/// lookahead.
#[derive(Debug)]
pub struct Buffered<S> {
    source: S,
    is_open: bool,
    lookahead: Option<Record>,
}

impl<S: RecordSource> Buffered<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            is_open: false,
            lookahead: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn inner(&self) -> &S {
        &self.source
    }

    /// Gives mutable access to the wrapped source. Any record already
    /// buffered by `has_next` is dropped.
    pub fn inner_mut(&mut self) -> &mut S {
        self.lookahead = None;
        &mut self.source
    }

    pub fn into_inner(self) -> S {
        self.source
    }

    fn check_open(&self) -> Result<()> {
        if self.is_open {
            Ok(())
        } else {
            Err(DbError::IteratorNotOpen)
        }
    }
}

impl<S: RecordSource> OpIterator for Buffered<S> {
    fn open(&mut self) -> Result<()> {
        self.lookahead = None;
        self.source.open()?;
        self.is_open = true;
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool> {
        self.check_open()?;
        if self.lookahead.is_none() {
            self.lookahead = self.source.fetch_next()?;
        }
        Ok(self.lookahead.is_some())
    }

    fn next(&mut self) -> Result<Option<Record>> {
        self.check_open()?;
        match self.lookahead.take() {
            Some(record) => Ok(Some(record)),
            None => self.source.fetch_next(),
        }
    }

    fn rewind(&mut self) -> Result<()> {
        self.check_open()?;
        self.lookahead = None;
        self.source.rewind()
    }

    fn close(&mut self) {
        self.lookahead = None;
        if self.is_open {
            self.is_open = false;
            self.source.close();
        }
    }

    fn schema(&self) -> &Arc<Schema> {
        self.source.schema()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuple::FieldType;

    /// Counts up to a limit.
    struct Counter {
        schema: Arc<Schema>,
        next: i32,
        limit: i32,
        fetches: usize,
    }

    impl Counter {
        fn new(limit: i32) -> Self {
            Self {
                schema: Arc::new(Schema::from_types(&[FieldType::Int])),
                next: 0,
                limit,
                fetches: 0,
            }
        }
    }

    impl RecordSource for Counter {
        fn open(&mut self) -> Result<()> {
            self.next = 0;
            Ok(())
        }

        fn fetch_next(&mut self) -> Result<Option<Record>> {
            self.fetches += 1;
            if self.next >= self.limit {
                return Ok(None);
            }
            self.next += 1;
            Record::from_fields(self.schema.clone(), vec![self.next.into()]).map(Some)
        }

        fn rewind(&mut self) -> Result<()> {
            self.next = 0;
            Ok(())
        }

        fn schema(&self) -> &Arc<Schema> {
            &self.schema
        }
    }

    fn value(record: Option<Record>) -> Option<i32> {
        record.map(|r| r.field(0).unwrap().as_int().unwrap())
    }

    #[test]
    fn test_closed_iterator_fails() {
        let mut it = Counter::new(2).buffered();
        assert!(matches!(it.has_next(), Err(DbError::IteratorNotOpen)));
        assert!(matches!(it.next(), Err(DbError::IteratorNotOpen)));
        assert!(matches!(it.rewind(), Err(DbError::IteratorNotOpen)));

        it.open().unwrap();
        it.close();
        assert!(matches!(it.next(), Err(DbError::IteratorNotOpen)));
    }

    #[test]
    fn test_has_next_buffers_one_record() {
        let mut it = Counter::new(2).buffered();
        it.open().unwrap();

        assert!(it.has_next().unwrap());
        assert!(it.has_next().unwrap());
        assert_eq!(it.inner().fetches, 1);

        assert_eq!(value(it.next().unwrap()), Some(1));
        assert_eq!(value(it.next().unwrap()), Some(2));
        assert!(!it.has_next().unwrap());
        assert_eq!(it.next().unwrap(), None);
    }

    #[test]
    fn test_rewind_restarts() {
        let mut it = Counter::new(3).buffered();
        it.open().unwrap();
        it.next().unwrap();
        it.has_next().unwrap();

        it.rewind().unwrap();
        let values: Vec<_> = std::iter::from_fn(|| value(it.next().unwrap())).collect();
        assert_eq!(values, vec![1, 2, 3]);
    }
}
