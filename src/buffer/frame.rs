use std::sync::Arc;

use parking_lot::RwLock;

use crate::common::{PageId, TransactionId};
use crate::storage::page::HeapPage;

/// Shared handle to a cached page.
///
/// The buffer pool hands these out from `get_page`. The page-level lock the
/// caller acquired decides what it may do with it; the `RwLock` only keeps
/// the bytes consistent while they are read or mutated.
pub type PageRef = Arc<RwLock<HeapPage>>;

/// One cached page and its bookkeeping.
#[derive(Debug)]
pub struct Frame {
    page_id: PageId,
    page: PageRef,
    /// Transaction whose uncommitted changes the cached copy holds
    dirtied_by: Option<TransactionId>,
}

impl Frame {
    /// Wraps a freshly loaded, clean page.
    pub fn new(page: HeapPage) -> Self {
        Self {
            page_id: page.page_id(),
            page: Arc::new(RwLock::new(page)),
            dirtied_by: None,
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn page(&self) -> &PageRef {
        &self.page
    }

    pub fn is_dirty(&self) -> bool {
        self.dirtied_by.is_some()
    }

    pub fn dirtied_by(&self) -> Option<TransactionId> {
        self.dirtied_by
    }

    pub fn mark_dirty(&mut self, tid: TransactionId) {
        self.dirtied_by = Some(tid);
    }

    pub fn mark_clean(&mut self) {
        self.dirtied_by = None;
    }
}
