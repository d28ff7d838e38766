use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use log::debug;

use crate::buffer::{BufferPool, LockMode};
use crate::common::{DbError, PageId, Result, TableId, TransactionId};
use crate::execution::{OpIterator, RecordSource};
use crate::tuple::{Record, Schema};

use super::disk::DiskManager;
use super::page::HeapPage;
use super::DbFile;

/// A table stored as an unordered sequence of heap pages in one flat file.
///
/// The table id is derived from the canonical path of the file, so opening
/// the same file twice yields the same id.
#[derive(Debug)]
pub struct HeapFile {
    table_id: TableId,
    schema: Arc<Schema>,
    disk: DiskManager,
}

impl HeapFile {
    /// Opens the heap file at `path`, creating an empty one if needed.
    pub fn open<P: AsRef<Path>>(path: P, schema: Arc<Schema>) -> Result<Self> {
        let disk = DiskManager::new(path)?;
        let canonical = fs::canonicalize(disk.path())?;
        Ok(Self {
            table_id: TableId::for_path(&canonical),
            schema,
            disk,
        })
    }

    pub fn path(&self) -> &Path {
        self.disk.path()
    }

    /// Returns the number of records that fit on one page of this file.
    pub fn records_per_page(&self) -> usize {
        HeapPage::slots_per_page(&self.schema)
    }

    /// Appends a page with every slot free and returns its id.
    ///
    /// The page goes straight to disk; nothing else in the file changes.
    pub fn append_empty_page(&self) -> Result<PageId> {
        let page_no = self.disk.append_page(&HeapPage::empty_page_data())?;
        let page_id = PageId::new(self.table_id, page_no);
        debug!("appended {}", page_id);
        Ok(page_id)
    }

    fn check_schema(&self, record: &Record) -> Result<()> {
        if **record.schema() != *self.schema {
            return Err(DbError::SchemaMismatch(format!(
                "record schema ({}) does not match table schema ({})",
                record.schema(),
                self.schema
            )));
        }
        if self.records_per_page() == 0 {
            return Err(DbError::SchemaMismatch(format!(
                "records of {} bytes do not fit on a page",
                self.schema.record_size()
            )));
        }
        Ok(())
    }

    fn check_page(&self, page_id: PageId) -> Result<()> {
        if page_id.table_id() != self.table_id || page_id.page_no() >= self.num_pages()? {
            return Err(DbError::UnknownPage(page_id));
        }
        Ok(())
    }
}

impl DbFile for HeapFile {
    fn table_id(&self) -> TableId {
        self.table_id
    }

    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn num_pages(&self) -> Result<u32> {
        self.disk.num_pages()
    }

    fn read_page(&self, page_id: PageId) -> Result<HeapPage> {
        self.check_page(page_id)?;
        let mut data = HeapPage::empty_page_data();
        self.disk.read_page(page_id.page_no(), &mut data)?;
        Ok(HeapPage::new(page_id, Arc::clone(&self.schema), &data))
    }

    fn write_page(&self, page: &HeapPage) -> Result<()> {
        self.check_page(page.page_id())?;
        self.disk.write_page(page.page_id().page_no(), page.data())
    }

    /// Uses the first page with a free slot, scanning in page order under
    /// shared locks and upgrading only the page that receives the record.
    /// Appends a page when every existing one is full.
    fn insert_record(&self, pool: &BufferPool, tid: TransactionId, mut record: Record) -> Result<Vec<PageId>> {
        self.check_schema(&record)?;

        for page_no in 0..self.num_pages()? {
            let page_id = PageId::new(self.table_id, page_no);
            let has_room = pool
                .get_page(tid, page_id, LockMode::Shared)?
                .read()
                .num_empty_slots()
                > 0;
            if !has_room {
                continue;
            }

            let page = pool.get_page(tid, page_id, LockMode::Exclusive)?;
            let mut page = page.write();
            // another holder may have filled it before the upgrade
            if page.num_empty_slots() == 0 {
                continue;
            }
            let record_id = page.insert_record(&record)?;
            record.set_record_id(Some(record_id));
            return Ok(vec![page_id]);
        }

        let page_id = self.append_empty_page()?;
        let page = pool.get_page(tid, page_id, LockMode::Exclusive)?;
        let record_id = page.write().insert_record(&record)?;
        record.set_record_id(Some(record_id));
        Ok(vec![page_id])
    }

    fn delete_record(&self, pool: &BufferPool, tid: TransactionId, record: &Record) -> Result<Vec<PageId>> {
        let record_id = record.record_id().ok_or(DbError::MissingRecordId)?;
        let page_id = record_id.page_id;
        if page_id.table_id() != self.table_id {
            return Err(DbError::UnknownPage(page_id));
        }

        let page = pool.get_page(tid, page_id, LockMode::Exclusive)?;
        page.write().delete_record(record_id)?;
        Ok(vec![page_id])
    }

    fn iterator(self: Arc<Self>, pool: Arc<BufferPool>, tid: TransactionId) -> Box<dyn OpIterator> {
        Box::new(HeapFileIterator::new(self, pool, tid).buffered())
    }
}

/// Scans a heap file page by page through the buffer pool.
///
/// Each page is locked shared, its live records are copied out, and the
/// page handle is dropped before any record is handed on. Rewinding reads
/// the pages again through the pool, so changes made in between are seen.
#[derive(Debug)]
pub struct HeapFileIterator {
    file: Arc<HeapFile>,
    pool: Arc<BufferPool>,
    tid: TransactionId,
    next_page: u32,
    num_pages: u32,
    pending: VecDeque<Record>,
}

impl HeapFileIterator {
    pub fn new(file: Arc<HeapFile>, pool: Arc<BufferPool>, tid: TransactionId) -> Self {
        Self {
            file,
            pool,
            tid,
            next_page: 0,
            num_pages: 0,
            pending: VecDeque::new(),
        }
    }

    fn restart(&mut self) -> Result<()> {
        self.next_page = 0;
        self.num_pages = self.file.num_pages()?;
        self.pending.clear();
        Ok(())
    }
}

impl RecordSource for HeapFileIterator {
    fn open(&mut self) -> Result<()> {
        self.restart()
    }

    fn fetch_next(&mut self) -> Result<Option<Record>> {
        loop {
            if let Some(record) = self.pending.pop_front() {
                return Ok(Some(record));
            }
            if self.next_page >= self.num_pages {
                return Ok(None);
            }

            let page_id = PageId::new(self.file.table_id, self.next_page);
            let page = self.pool.get_page(self.tid, page_id, LockMode::Shared)?;
            self.pending.extend(page.read().iter());
            self.next_page += 1;
        }
    }

    fn rewind(&mut self) -> Result<()> {
        self.restart()
    }

    fn close(&mut self) {
        self.pending.clear();
        self.next_page = self.num_pages;
    }

    fn schema(&self) -> &Arc<Schema> {
        &self.file.schema
    }
}
