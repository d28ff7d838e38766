use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::buffer::BufferPool;
use crate::catalog::Catalog;
use crate::common::{BufferPoolConfig, Result, TransactionId};
use crate::storage::HeapFile;
use crate::transaction::Transaction;
use crate::tuple::Schema;

/// A running database: the catalog, the buffer pool over it, and the
/// transaction id allocator.
///
/// Components that need storage are handed the pieces they use rather than
/// reaching for process-wide state, so several databases can live side by
/// side (tests do this).
#[derive(Debug)]
pub struct Database {
    catalog: Arc<Catalog>,
    buffer_pool: Arc<BufferPool>,
    next_tid: AtomicU64,
}

impl Database {
    pub fn new(config: BufferPoolConfig) -> Self {
        let catalog = Arc::new(Catalog::new());
        let buffer_pool = Arc::new(BufferPool::new(config, Arc::clone(&catalog)));
        Self {
            catalog,
            buffer_pool,
            next_tid: AtomicU64::new(1),
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn buffer_pool(&self) -> &Arc<BufferPool> {
        &self.buffer_pool
    }

    /// Opens (or creates) the heap file at `path` and registers it as `name`.
    pub fn open_table<P: AsRef<Path>>(
        &self,
        path: P,
        schema: Arc<Schema>,
        name: &str,
        primary_key: &str,
    ) -> Result<Arc<HeapFile>> {
        let file = Arc::new(HeapFile::open(path, schema)?);
        self.catalog.add_table(file.clone(), name, primary_key);
        Ok(file)
    }

    /// Starts a transaction with a fresh id.
    pub fn begin(&self) -> Transaction {
        let tid = TransactionId::new(self.next_tid.fetch_add(1, Ordering::Relaxed));
        Transaction::new(tid, Arc::clone(&self.buffer_pool))
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new(BufferPoolConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::storage::DbFile;
    use crate::tuple::FieldType;

    #[test]
    fn test_transaction_ids_increase() {
        let db = Database::default();
        let a = db.begin();
        let b = db.begin();
        assert!(b.id().as_u64() > a.id().as_u64());
    }

    #[test]
    fn test_open_table_registers() {
        let dir = TempDir::new().unwrap();
        let db = Database::default();
        let schema = Arc::new(Schema::from_types(&[FieldType::Int]));
        let file = db.open_table(dir.path().join("n.dat"), schema, "numbers", "").unwrap();
        assert_eq!(db.catalog().table_id("numbers").unwrap(), file.table_id());
    }
}
