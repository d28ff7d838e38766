//! Page-level shared/exclusive locks for transactions.
//!
//! Locks follow strict two-phase locking: a transaction collects locks as it
//! touches pages and gives them all back at commit or abort. The whole table
//! lives behind one mutex; blocked requests sleep on a condition variable
//! and re-check whenever any lock is released.
//!
//! Every blocked request records the page and mode it is waiting for. The
//! wait-for graph is derived from those requests and the current holders
//! each time it is searched, so a released lock never leaves a stale edge:
//!
//! ```text
//! T1 waits for T2:  T1 -> T2
//! T2 waits for T1:  T2 -> T1   (cycle, T2 is aborted)
//! ```
//!
//! The request that closes a cycle fails with `TransactionAborted`. A request
//! that is still blocked when its deadline passes fails the same way, as
//! does any request of a transaction that has been finished.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use log::{trace, warn};
use parking_lot::{Condvar, Mutex};

use crate::common::{DbError, PageId, Result, TransactionId};

/// Requested access to a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockMode {
    /// Read access, compatible with other shared holders.
    Shared,
    /// Write access, compatible with nothing.
    Exclusive,
}

#[derive(Debug)]
struct PageLock {
    holders: HashSet<TransactionId>,
    mode: LockMode,
}

#[derive(Debug, Default)]
struct LockTable {
    locks: HashMap<PageId, PageLock>,
    /// Pages locked by each transaction
    held: HashMap<TransactionId, HashSet<PageId>>,
    /// Waiter -> the page and mode it is blocked on
    waiting_on: HashMap<TransactionId, (PageId, LockMode)>,
    /// Transactions that have ended; every request of theirs fails
    finished: HashSet<TransactionId>,
}

impl LockTable {
    /// Returns the transactions that prevent `tid` from getting `mode` on
    /// `page_id`. Empty means the lock can be granted now.
    fn blockers(&self, tid: TransactionId, page_id: PageId, mode: LockMode) -> HashSet<TransactionId> {
        let Some(lock) = self.locks.get(&page_id) else {
            return HashSet::new();
        };

        match mode {
            LockMode::Shared => {
                if lock.mode == LockMode::Exclusive && !lock.holders.contains(&tid) {
                    lock.holders.clone()
                } else {
                    HashSet::new()
                }
            }
            LockMode::Exclusive => lock
                .holders
                .iter()
                .copied()
                .filter(|&holder| holder != tid)
                .collect(),
        }
    }

    fn grant(&mut self, tid: TransactionId, page_id: PageId, mode: LockMode) {
        let lock = self.locks.entry(page_id).or_insert_with(|| PageLock {
            holders: HashSet::new(),
            mode,
        });
        if mode == LockMode::Exclusive {
            lock.mode = LockMode::Exclusive;
        }
        lock.holders.insert(tid);
        self.held.entry(tid).or_default().insert(page_id);
    }

    fn remove_holder(&mut self, tid: TransactionId, page_id: PageId) {
        if let Some(lock) = self.locks.get_mut(&page_id) {
            lock.holders.remove(&tid);
            if lock.holders.is_empty() {
                self.locks.remove(&page_id);
            }
        }
    }

    /// Returns the transactions `tid` is blocked behind right now.
    fn waits_for(&self, tid: TransactionId) -> Vec<TransactionId> {
        match self.waiting_on.get(&tid) {
            Some(&(page_id, mode)) => self.blockers(tid, page_id, mode).into_iter().collect(),
            None => Vec::new(),
        }
    }

    /// Depth-first search of the wait-for graph for a path back to `start`.
    fn has_cycle_from(&self, start: TransactionId) -> bool {
        let mut visited = HashSet::new();
        let mut stack = self.waits_for(start);

        while let Some(tid) = stack.pop() {
            if tid == start {
                return true;
            }
            if !visited.insert(tid) {
                continue;
            }
            stack.extend(self.waits_for(tid));
        }
        false
    }
}

/// Lock table shared by all transactions of a buffer pool.
#[derive(Debug)]
pub struct LockManager {
    table: Mutex<LockTable>,
    released: Condvar,
    timeout: Duration,
}

impl LockManager {
    /// Creates a lock manager whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self {
            table: Mutex::new(LockTable::default()),
            released: Condvar::new(),
            timeout,
        }
    }

    /// Blocks until `tid` holds `mode` on `page_id`.
    ///
    /// A shared holder that is the only holder is upgraded in place. Fails
    /// with `TransactionAborted` on deadlock, on timeout, or when the
    /// transaction has been finished, before or while waiting.
    pub fn acquire(&self, tid: TransactionId, page_id: PageId, mode: LockMode) -> Result<()> {
        let deadline = Instant::now() + self.timeout;
        let mut table = self.table.lock();
        let mut timed_out = false;

        let outcome = loop {
            if table.finished.contains(&tid) {
                trace!("{} is finished, refusing {:?} on {}", tid, mode, page_id);
                break Err(DbError::TransactionAborted(tid));
            }

            let blockers = table.blockers(tid, page_id, mode);
            if blockers.is_empty() {
                table.grant(tid, page_id, mode);
                trace!("{} granted {:?} on {}", tid, mode, page_id);
                break Ok(());
            }

            if timed_out {
                warn!("{} timed out waiting for {:?} on {}", tid, mode, page_id);
                break Err(DbError::TransactionAborted(tid));
            }

            table.waiting_on.insert(tid, (page_id, mode));
            if table.has_cycle_from(tid) {
                warn!("{} deadlocked requesting {:?} on {}", tid, mode, page_id);
                break Err(DbError::TransactionAborted(tid));
            }

            timed_out = self.released.wait_until(&mut table, deadline).timed_out();
        };

        table.waiting_on.remove(&tid);
        outcome
    }

    /// Gives up the lock `tid` holds on `page_id`, if any.
    pub fn release(&self, tid: TransactionId, page_id: PageId) {
        let mut table = self.table.lock();
        table.remove_holder(tid, page_id);
        if let Some(pages) = table.held.get_mut(&tid) {
            pages.remove(&page_id);
            if pages.is_empty() {
                table.held.remove(&tid);
            }
        }
        self.released.notify_all();
    }

    /// Gives up every lock of `tid` and returns the pages that were locked.
    pub fn release_all(&self, tid: TransactionId) -> Vec<PageId> {
        let mut table = self.table.lock();
        let pages: Vec<PageId> = table
            .held
            .remove(&tid)
            .map(|pages| pages.into_iter().collect())
            .unwrap_or_default();
        for &page_id in &pages {
            table.remove_holder(tid, page_id);
        }
        self.released.notify_all();
        pages
    }

    /// Marks `tid` as finished. Its blocked requests wake up and fail with
    /// `TransactionAborted`, and so does every later request. Locks it
    /// already holds stay until `release_all`.
    ///
    /// Finished ids are remembered for the life of the lock manager, so a
    /// transaction id must not be reused.
    pub fn finish(&self, tid: TransactionId) {
        let mut table = self.table.lock();
        if table.finished.insert(tid) && table.waiting_on.contains_key(&tid) {
            self.released.notify_all();
        }
    }

    /// Returns whether `tid` has been finished.
    pub fn is_finished(&self, tid: TransactionId) -> bool {
        self.table.lock().finished.contains(&tid)
    }

    /// Returns the mode `tid` holds on `page_id`, if any.
    pub fn lock_mode(&self, tid: TransactionId, page_id: PageId) -> Option<LockMode> {
        let table = self.table.lock();
        table
            .locks
            .get(&page_id)
            .filter(|lock| lock.holders.contains(&tid))
            .map(|lock| lock.mode)
    }

    pub fn holds_lock(&self, tid: TransactionId, page_id: PageId) -> bool {
        self.lock_mode(tid, page_id).is_some()
    }

    /// Returns whether any transaction holds a lock on `page_id`.
    pub fn is_locked(&self, page_id: PageId) -> bool {
        self.table.lock().locks.contains_key(&page_id)
    }

    /// Returns the pages `tid` currently holds locks on.
    pub fn locked_pages(&self, tid: TransactionId) -> Vec<PageId> {
        self.table
            .lock()
            .held
            .get(&tid)
            .map(|pages| pages.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
