use std::fmt;
use std::path::Path;

/// Table identifier, derived from the canonical path of the table's file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(pub u64);

impl TableId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Derives the id of the table stored at `path` as the CRC-32 of the
    /// path bytes, which does not depend on the process or the toolchain.
    /// The caller is expected to pass a canonical path so that the same file
    /// always maps to the same id.
    pub fn for_path(path: &Path) -> Self {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(path.as_os_str().as_encoded_bytes());
        Self(u64::from(hasher.finalize()))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TableId({})", self.0)
    }
}

/// Page identifier - a page number within one table's heap file.
/// This is the cache key of the buffer pool and the unit of locking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId {
    pub table_id: TableId,
    pub page_no: u32,
}

impl PageId {
    pub fn new(table_id: TableId, page_no: u32) -> Self {
        Self { table_id, page_no }
    }

    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    pub fn page_no(&self) -> u32 {
        self.page_no
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PageId({}, {})", self.table_id.0, self.page_no)
    }
}

/// Slot identifier within a heap page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub u16);

impl SlotId {
    pub fn new(id: u16) -> Self {
        Self(id)
    }

    pub fn as_u16(&self) -> u16 {
        self.0
    }

    pub fn as_usize(&self) -> usize {
        self.0 as usize
    }
}

/// Record identifier - combination of page ID and slot ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    pub page_id: PageId,
    pub slot_id: SlotId,
}

impl RecordId {
    pub fn new(page_id: PageId, slot_id: SlotId) -> Self {
        Self { page_id, slot_id }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.page_id, self.slot_id.0)
    }
}

/// Identifies one logical transaction. Ids are handed out by
/// [`Database::begin`](crate::Database::begin) and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(pub u64);

impl TransactionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Txn({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_id_is_stable_per_path() {
        let a = TableId::for_path(Path::new("/tmp/heapdb/users.dat"));
        let b = TableId::for_path(Path::new("/tmp/heapdb/users.dat"));
        let c = TableId::for_path(Path::new("/tmp/heapdb/orders.dat"));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_table_id_is_crc32_of_path() {
        assert_eq!(TableId::for_path(Path::new("abc")), TableId::new(0x3524_41C2));
    }

    #[test]
    fn test_page_id_equality() {
        let t = TableId::new(7);
        assert_eq!(PageId::new(t, 3), PageId::new(t, 3));
        assert_ne!(PageId::new(t, 3), PageId::new(t, 4));
        assert_ne!(PageId::new(t, 3), PageId::new(TableId::new(8), 3));
    }

    #[test]
    fn test_display() {
        let pid = PageId::new(TableId::new(1), 2);
        assert_eq!(pid.to_string(), "PageId(1, 2)");
        assert_eq!(RecordId::new(pid, SlotId::new(5)).to_string(), "PageId(1, 2)#5");
        assert_eq!(TransactionId::new(9).to_string(), "Txn(9)");
    }
}
