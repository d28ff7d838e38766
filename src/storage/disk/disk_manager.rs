use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;

use crate::common::{DbError, Result, PAGE_SIZE};

/// DiskManager is responsible for reading and writing pages of one flat file.
/// The file is an exact concatenation of PAGE_SIZE pages: no header, no
/// trailer, and its length is always a multiple of the page size.
#[derive(Debug)]
pub struct DiskManager {
    /// The backing file
    file: Mutex<File>,
    /// Path to the backing file
    path: PathBuf,
    /// Number of page reads performed
    num_reads: AtomicU32,
    /// Number of page writes performed
    num_writes: AtomicU32,
}

impl DiskManager {
    /// Opens the file at `path`, creating it if it doesn't exist.
    /// Fails with `CorruptFile` if its length is not a multiple of the page size.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let manager = Self {
            file: Mutex::new(file),
            path: path.as_ref().to_path_buf(),
            num_reads: AtomicU32::new(0),
            num_writes: AtomicU32::new(0),
        };
        manager.num_pages()?;
        Ok(manager)
    }

    /// Returns the number of pages in the file.
    pub fn num_pages(&self) -> Result<u32> {
        let len = self.file.lock().metadata()?.len();
        self.pages_for_len(len)
    }

    fn pages_for_len(&self, len: u64) -> Result<u32> {
        if len % PAGE_SIZE as u64 != 0 {
            return Err(DbError::CorruptFile {
                path: self.path.clone(),
                len,
            });
        }
        Ok((len / PAGE_SIZE as u64) as u32)
    }

    /// Reads a page from disk into the provided buffer.
    /// The buffer must be exactly PAGE_SIZE bytes. A short read means the
    /// file is damaged and is reported as an I/O error.
    pub fn read_page(&self, page_no: u32, data: &mut [u8]) -> Result<()> {
        assert_eq!(data.len(), PAGE_SIZE, "Buffer must be PAGE_SIZE bytes");

        let offset = (page_no as u64) * (PAGE_SIZE as u64);

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(data)?;

        self.num_reads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Overwrites a page in place. The buffer must be exactly PAGE_SIZE bytes.
    pub fn write_page(&self, page_no: u32, data: &[u8]) -> Result<()> {
        assert_eq!(data.len(), PAGE_SIZE, "Buffer must be PAGE_SIZE bytes");

        let offset = (page_no as u64) * (PAGE_SIZE as u64);

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(data)?;
        file.flush()?;

        self.num_writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Appends a page holding `data` to the end of the file and returns its
    /// page number. The length check and the write happen under one lock, so
    /// concurrent appends receive distinct page numbers.
    pub fn append_page(&self, data: &[u8]) -> Result<u32> {
        assert_eq!(data.len(), PAGE_SIZE, "Buffer must be PAGE_SIZE bytes");

        let mut file = self.file.lock();
        let len = file.metadata()?.len();
        let page_no = self.pages_for_len(len)?;

        file.seek(SeekFrom::Start(len))?;
        file.write_all(data)?;
        file.flush()?;

        self.num_writes.fetch_add(1, Ordering::Relaxed);
        Ok(page_no)
    }

    /// Returns the number of page reads performed.
    pub fn get_num_reads(&self) -> u32 {
        self.num_reads.load(Ordering::Relaxed)
    }

    /// Returns the number of page writes performed.
    pub fn get_num_writes(&self) -> u32 {
        self.num_writes.load(Ordering::Relaxed)
    }

    /// Returns the path to the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flushes any buffered writes to disk.
    pub fn sync(&self) -> Result<()> {
        let file = self.file.lock();
        file.sync_all()?;
        Ok(())
    }
}

impl Drop for DiskManager {
    fn drop(&mut self) {
        let file = self.file.get_mut();
        let _ = file.sync_all();
    }
}
