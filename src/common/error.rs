use std::path::PathBuf;

use thiserror::Error;

use super::types::{PageId, RecordId, SlotId, TableId, TransactionId};

/// Database error types
#[derive(Error, Debug)]
pub enum DbError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Field index {index} out of range for {len} fields")]
    InvalidFieldIndex { index: usize, len: usize },

    #[error("Slot {slot:?} out of range on {page}")]
    InvalidSlot { page: PageId, slot: SlotId },

    #[error("Page {0} does not belong to this file")]
    UnknownPage(PageId),

    #[error("Table {0} not found")]
    UnknownTable(TableId),

    #[error("Table named '{0}' not found")]
    TableNameNotFound(String),

    #[error("Page {0} is full")]
    PageFull(PageId),

    #[error("Slot of record {0} is already empty")]
    EmptySlot(RecordId),

    #[error("Record has no record id; it was never stored")]
    MissingRecordId,

    #[error("Buffer pool is full, no evictable pages available")]
    BufferPoolFull,

    #[error("Transaction {0} aborted")]
    TransactionAborted(TransactionId),

    #[error("Iterator is not open")]
    IteratorNotOpen,

    #[error("Corrupt heap file {path:?}: length {len} is not a multiple of the page size")]
    CorruptFile { path: PathBuf, len: u64 },

    #[error("Unsupported aggregate: {0}")]
    UnsupportedAggregate(String),
}

impl DbError {
    /// Returns true if the owning transaction must be aborted.
    pub fn is_abort(&self) -> bool {
        matches!(self, DbError::TransactionAborted(_))
    }
}

pub type Result<T> = std::result::Result<T, DbError>;
