use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, warn};
use parking_lot::Mutex;

use crate::catalog::Catalog;
use crate::common::{BufferPoolConfig, DbError, PageId, Result, TableId, TransactionId};
use crate::tuple::Record;

use super::{Frame, LockManager, LockMode, LruKReplacer, PageRef};

/// BufferPool caches heap pages in memory and mediates every page access
/// through transactional page locks.
///
/// Pages are loaded on demand through the owning `DbFile` found in the
/// catalog. Eviction is NO-STEAL: only pages no transaction has locked are
/// candidates, and those are always clean, so eviction never writes. When
/// every cached page is locked the request fails with `BufferPoolFull`.
///
/// Lock order is page lock first, then the frame table. Nothing blocks on
/// a page lock while holding the frame table.
#[derive(Debug)]
pub struct BufferPool {
    capacity: usize,
    catalog: Arc<Catalog>,
    /// Page table: cached pages by id
    frames: Mutex<HashMap<PageId, Frame>>,
    /// Victim selection among unlocked pages
    replacer: LruKReplacer<PageId>,
    locks: LockManager,
}

impl BufferPool {
    /// Creates a buffer pool over the tables registered in `catalog`.
    pub fn new(config: BufferPoolConfig, catalog: Arc<Catalog>) -> Self {
        assert!(config.capacity > 0, "Buffer pool needs at least one page");
        Self {
            capacity: config.capacity,
            catalog,
            frames: Mutex::new(HashMap::with_capacity(config.capacity)),
            replacer: LruKReplacer::new(config.replacer_k, config.capacity),
            locks: LockManager::new(config.lock_timeout),
        }
    }

    /// Returns the page, locked for `tid` in `mode`.
    ///
    /// Blocks while another transaction holds a conflicting lock. Fails with
    /// `TransactionAborted` on deadlock or timeout; the caller must then
    /// abort the transaction.
    pub fn get_page(&self, tid: TransactionId, page_id: PageId, mode: LockMode) -> Result<PageRef> {
        self.locks.acquire(tid, page_id, mode)?;

        let mut frames = self.frames.lock();
        if let Some(frame) = frames.get(&page_id) {
            self.replacer.record_access(page_id);
            self.replacer.set_evictable(page_id, false);
            return Ok(Arc::clone(frame.page()));
        }

        if frames.len() >= self.capacity {
            self.evict_page(&mut frames)?;
        }

        let file = self.catalog.database_file(page_id.table_id())?;
        let page = file.read_page(page_id)?;
        debug!("loaded {} for {}", page_id, tid);

        let frame = Frame::new(page);
        let page = Arc::clone(frame.page());
        frames.insert(page_id, frame);
        self.replacer.record_access(page_id);
        self.replacer.set_evictable(page_id, false);

        Ok(page)
    }

    /// Releases the lock `tid` holds on one page before the transaction ends.
    ///
    /// This breaks two-phase locking and is only safe for pages the
    /// transaction read without acting on what it saw.
    pub fn release_page(&self, tid: TransactionId, page_id: PageId) {
        self.locks.release(tid, page_id);
        let frames = self.frames.lock();
        self.refresh_evictable(&frames, page_id);
    }

    /// Returns whether `tid` holds a lock on `page_id`.
    pub fn holds_lock(&self, tid: TransactionId, page_id: PageId) -> bool {
        self.locks.holds_lock(tid, page_id)
    }

    /// Returns the mode of the lock `tid` holds on `page_id`.
    pub fn lock_mode(&self, tid: TransactionId, page_id: PageId) -> Option<LockMode> {
        self.locks.lock_mode(tid, page_id)
    }

    /// Adds `record` to the table on behalf of `tid`.
    ///
    /// Exclusive locks on the touched pages are acquired as needed and the
    /// pages stay dirty in the pool until the transaction completes.
    pub fn insert_record(&self, tid: TransactionId, table_id: TableId, record: Record) -> Result<()> {
        let file = self.catalog.database_file(table_id)?;
        let pages = file.insert_record(self, tid, record)?;
        self.mark_dirty(tid, &pages);
        Ok(())
    }

    /// Removes `record` from its table on behalf of `tid`.
    pub fn delete_record(&self, tid: TransactionId, record: &Record) -> Result<()> {
        let record_id = record.record_id().ok_or(DbError::MissingRecordId)?;
        let file = self.catalog.database_file(record_id.page_id.table_id())?;
        let pages = file.delete_record(self, tid, record)?;
        self.mark_dirty(tid, &pages);
        Ok(())
    }

    /// Ends `tid`.
    ///
    /// On commit the pages it dirtied are written back to their files. On
    /// abort they are dropped from the pool, so the next access reads the
    /// last committed image from disk. Either way every lock of `tid` is
    /// released, its blocked lock requests fail and any later request of
    /// `tid` fails with `TransactionAborted`.
    ///
    /// If a write fails during commit the error is returned, and the pages
    /// that were not written are dropped as on abort.
    pub fn transaction_complete(&self, tid: TransactionId, commit: bool) -> Result<()> {
        self.locks.finish(tid);

        let mut frames = self.frames.lock();
        let dirty: Vec<PageId> = frames
            .values()
            .filter(|frame| frame.dirtied_by() == Some(tid))
            .map(Frame::page_id)
            .collect();

        let result = if commit {
            self.flush_pages(&mut frames, &dirty)
        } else {
            Ok(())
        };

        let mut discarded = 0;
        for page_id in &dirty {
            if frames.get(page_id).and_then(Frame::dirtied_by) == Some(tid) {
                frames.remove(page_id);
                self.replacer.remove(*page_id);
                discarded += 1;
            }
        }

        match &result {
            Ok(()) if commit => debug!("{} committed, wrote {} pages", tid, dirty.len()),
            Ok(()) => debug!("{} aborted, discarded {} pages", tid, discarded),
            Err(e) => warn!("{} failed to commit, discarded {} pages: {}", tid, discarded, e),
        }

        for page_id in self.locks.release_all(tid) {
            self.refresh_evictable(&frames, page_id);
        }
        result
    }

    /// Writes one cached page to disk and marks it clean, regardless of
    /// which transaction dirtied it.
    ///
    /// Dirty pages belong to transactions that have not completed, so this
    /// steals: the uncommitted image reaches disk, and a later abort of the
    /// dirtying transaction can no longer undo it. Only meant for shutdown
    /// and tests, when no transaction is running.
    pub fn flush_page(&self, page_id: PageId) -> Result<()> {
        let mut frames = self.frames.lock();
        self.flush_pages(&mut frames, &[page_id])?;
        self.refresh_evictable(&frames, page_id);
        Ok(())
    }

    /// Writes every dirty cached page to disk. Like [`BufferPool::flush_page`]
    /// this bypasses NO-STEAL and is only meant for when no transaction is
    /// running.
    pub fn flush_all_pages(&self) -> Result<()> {
        let mut frames = self.frames.lock();
        let dirty: Vec<PageId> = frames
            .values()
            .filter(|frame| frame.is_dirty())
            .map(Frame::page_id)
            .collect();
        self.flush_pages(&mut frames, &dirty)?;
        for page_id in dirty {
            self.refresh_evictable(&frames, page_id);
        }
        Ok(())
    }

    /// Drops a page from the pool without writing it back.
    pub fn discard_page(&self, page_id: PageId) {
        let mut frames = self.frames.lock();
        if frames.remove(&page_id).is_some() {
            self.replacer.remove(page_id);
        }
    }

    /// Returns the number of pages currently cached.
    pub fn cached_pages(&self) -> usize {
        self.frames.lock().len()
    }

    /// Returns whether `page_id` is currently cached.
    pub fn is_cached(&self, page_id: PageId) -> bool {
        self.frames.lock().contains_key(&page_id)
    }

    /// Returns the maximum number of cached pages.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    fn mark_dirty(&self, tid: TransactionId, pages: &[PageId]) {
        let mut frames = self.frames.lock();
        for page_id in pages {
            if let Some(frame) = frames.get_mut(page_id) {
                frame.mark_dirty(tid);
                self.replacer.set_evictable(*page_id, false);
            }
        }
    }

    fn flush_pages(&self, frames: &mut HashMap<PageId, Frame>, pages: &[PageId]) -> Result<()> {
        for page_id in pages {
            let Some(frame) = frames.get_mut(page_id) else {
                continue;
            };
            if !frame.is_dirty() {
                continue;
            }
            let file = self.catalog.database_file(page_id.table_id())?;
            file.write_page(&frame.page().read())?;
            frame.mark_clean();
        }
        Ok(())
    }

    /// A page is evictable while it is clean and unlocked. Must be called
    /// with the frame table held.
    fn refresh_evictable(&self, frames: &HashMap<PageId, Frame>, page_id: PageId) {
        if let Some(frame) = frames.get(&page_id) {
            let evictable = !frame.is_dirty() && !self.locks.is_locked(page_id);
            self.replacer.set_evictable(page_id, evictable);
        }
    }

    fn evict_page(&self, frames: &mut HashMap<PageId, Frame>) -> Result<()> {
        let victim = self.replacer.evict().ok_or(DbError::BufferPoolFull)?;
        frames.remove(&victim);
        debug!("evicted {}", victim);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use tempfile::TempDir;

    use super::*;
    use crate::execution::OpIterator;
    use crate::storage::page::HeapPage;
    use crate::storage::{DbFile, HeapFile};
    use crate::tuple::{Field, FieldType, Schema};

    /// A heap file whose page writes can be switched off.
    #[derive(Debug)]
    struct FlakyFile {
        inner: Arc<HeapFile>,
        fail_writes: AtomicBool,
    }

    impl DbFile for FlakyFile {
        fn table_id(&self) -> TableId {
            self.inner.table_id()
        }

        fn schema(&self) -> &Arc<Schema> {
            self.inner.schema()
        }

        fn num_pages(&self) -> Result<u32> {
            self.inner.num_pages()
        }

        fn read_page(&self, page_id: PageId) -> Result<HeapPage> {
            self.inner.read_page(page_id)
        }

        fn write_page(&self, page: &HeapPage) -> Result<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(io::Error::new(io::ErrorKind::Other, "disk unavailable").into());
            }
            self.inner.write_page(page)
        }

        fn insert_record(&self, pool: &BufferPool, tid: TransactionId, record: Record) -> Result<Vec<PageId>> {
            self.inner.insert_record(pool, tid, record)
        }

        fn delete_record(&self, pool: &BufferPool, tid: TransactionId, record: &Record) -> Result<Vec<PageId>> {
            self.inner.delete_record(pool, tid, record)
        }

        fn iterator(self: Arc<Self>, pool: Arc<BufferPool>, tid: TransactionId) -> Box<dyn OpIterator> {
            Arc::clone(&self.inner).iterator(pool, tid)
        }
    }

    fn setup(capacity: usize, pages: u32) -> (TempDir, Arc<BufferPool>, Arc<HeapFile>) {
        let dir = TempDir::new().unwrap();
        let schema = Arc::new(Schema::from_types(&[FieldType::Int, FieldType::Int]));
        let file = Arc::new(HeapFile::open(dir.path().join("t.dat"), schema).unwrap());
        for _ in 0..pages {
            file.append_empty_page().unwrap();
        }

        let catalog = Arc::new(Catalog::new());
        catalog.add_table(file.clone(), "t", "");
        let config = BufferPoolConfig::default()
            .with_capacity(capacity)
            .with_lock_timeout(Duration::from_millis(100));
        (dir, Arc::new(BufferPool::new(config, catalog)), file)
    }

    #[test]
    fn test_get_page_caches() {
        let (_dir, pool, file) = setup(4, 2);
        let t1 = TransactionId::new(1);
        let pid = PageId::new(file.table_id(), 0);

        let a = pool.get_page(t1, pid, LockMode::Shared).unwrap();
        let b = pool.get_page(t1, pid, LockMode::Shared).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(pool.cached_pages(), 1);
        assert!(pool.holds_lock(t1, pid));
    }

    #[test]
    fn test_unknown_page() {
        let (_dir, pool, file) = setup(4, 1);
        let pid = PageId::new(file.table_id(), 5);
        let err = pool.get_page(TransactionId::new(1), pid, LockMode::Shared).unwrap_err();
        assert!(matches!(err, DbError::UnknownPage(p) if p == pid));
    }

    #[test]
    fn test_locked_pages_are_not_evicted() {
        let (_dir, pool, file) = setup(2, 3);
        let t1 = TransactionId::new(1);
        let pid = |n| PageId::new(file.table_id(), n);

        pool.get_page(t1, pid(0), LockMode::Shared).unwrap();
        pool.get_page(t1, pid(1), LockMode::Shared).unwrap();
        assert!(matches!(
            pool.get_page(t1, pid(2), LockMode::Shared),
            Err(DbError::BufferPoolFull)
        ));

        pool.transaction_complete(t1, true).unwrap();
        let t2 = TransactionId::new(2);
        pool.get_page(t2, pid(2), LockMode::Shared).unwrap();
        assert_eq!(pool.cached_pages(), 2);
        assert!(pool.is_cached(pid(2)));
    }

    #[test]
    fn test_release_page() {
        let (_dir, pool, file) = setup(1, 2);
        let t1 = TransactionId::new(1);
        let pid = |n| PageId::new(file.table_id(), n);

        pool.get_page(t1, pid(0), LockMode::Shared).unwrap();
        pool.release_page(t1, pid(0));
        assert!(!pool.holds_lock(t1, pid(0)));

        // page 0 is unlocked and clean, so it can make room
        pool.get_page(t1, pid(1), LockMode::Shared).unwrap();
        assert!(!pool.is_cached(pid(0)));
    }

    #[test]
    fn test_failed_commit_drops_unwritten_pages() {
        let dir = TempDir::new().unwrap();
        let schema = Arc::new(Schema::from_types(&[FieldType::Int, FieldType::Int]));
        let inner = Arc::new(HeapFile::open(dir.path().join("t.dat"), schema.clone()).unwrap());
        inner.append_empty_page().unwrap();
        inner.append_empty_page().unwrap();
        let file = Arc::new(FlakyFile {
            inner,
            fail_writes: AtomicBool::new(false),
        });

        let catalog = Arc::new(Catalog::new());
        catalog.add_table(file.clone(), "t", "");
        let pool = BufferPool::new(BufferPoolConfig::default().with_capacity(2), catalog);
        let pid = |n| PageId::new(file.table_id(), n);

        let t1 = TransactionId::new(1);
        for n in 0..2 {
            let record = Record::from_fields(schema.clone(), vec![Field::Int(1), Field::Int(2)]).unwrap();
            pool.get_page(t1, pid(n), LockMode::Exclusive)
                .unwrap()
                .write()
                .insert_record(&record)
                .unwrap();
            pool.mark_dirty(t1, &[pid(n)]);
        }

        file.fail_writes.store(true, Ordering::SeqCst);
        let err = pool.transaction_complete(t1, true).unwrap_err();
        assert!(matches!(err, DbError::Io(_)));
        assert!(!pool.is_cached(pid(0)));
        assert!(!pool.is_cached(pid(1)));
        assert!(!pool.holds_lock(t1, pid(0)));

        // nothing was written, and the pool has room for fresh pages again
        file.fail_writes.store(false, Ordering::SeqCst);
        let t2 = TransactionId::new(2);
        for n in 0..2 {
            let page = pool.get_page(t2, pid(n), LockMode::Shared).unwrap();
            assert_eq!(page.read().num_records(), 0);
        }
        pool.transaction_complete(t2, true).unwrap();
    }
}
