use std::fmt::Debug;
use std::sync::Arc;

use crate::buffer::BufferPool;
use crate::common::{PageId, Result, TableId, TransactionId};
use crate::execution::OpIterator;
use crate::tuple::{Record, Schema};

use super::page::HeapPage;

/// The contract between the buffer pool and a table's storage.
///
/// Raw page I/O (`read_page`, `write_page`) bypasses locking and is meant
/// for the buffer pool alone. Record-level operations and scans go through
/// the pool so every page they touch is locked for the transaction.
pub trait DbFile: Send + Sync + Debug {
    /// Returns the id of the table stored in this file.
    fn table_id(&self) -> TableId;

    fn schema(&self) -> &Arc<Schema>;

    /// Returns the number of pages currently in the file.
    fn num_pages(&self) -> Result<u32>;

    /// Reads a page straight from disk. Fails with `UnknownPage` if the page
    /// belongs to another table or lies past the end of the file.
    fn read_page(&self, page_id: PageId) -> Result<HeapPage>;

    /// Writes a page straight to disk.
    fn write_page(&self, page: &HeapPage) -> Result<()>;

    /// Stores `record` and returns the pages that were modified.
    fn insert_record(&self, pool: &BufferPool, tid: TransactionId, record: Record) -> Result<Vec<PageId>>;

    /// Removes `record`, located by its record id, and returns the pages
    /// that were modified.
    fn delete_record(&self, pool: &BufferPool, tid: TransactionId, record: &Record) -> Result<Vec<PageId>>;

    /// Returns an unopened iterator over every record in the file, reading
    /// pages through `pool` under shared locks for `tid`.
    fn iterator(self: Arc<Self>, pool: Arc<BufferPool>, tid: TransactionId) -> Box<dyn OpIterator>;
}
