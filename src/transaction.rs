use std::sync::Arc;

use log::warn;

use crate::buffer::BufferPool;
use crate::common::{Result, TransactionId};

/// Handle to a running transaction.
///
/// A transaction ends with `commit` or `abort`. One that is dropped while
/// still running is aborted, so a `?` that bails out of a block of work
/// never leaves locks or uncommitted pages behind.
#[derive(Debug)]
pub struct Transaction {
    id: TransactionId,
    pool: Arc<BufferPool>,
    completed: bool,
}

impl Transaction {
    pub(crate) fn new(id: TransactionId, pool: Arc<BufferPool>) -> Self {
        Self {
            id,
            pool,
            completed: false,
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn buffer_pool(&self) -> &Arc<BufferPool> {
        &self.pool
    }

    /// Makes the transaction's changes durable and releases its locks.
    pub fn commit(mut self) -> Result<()> {
        self.complete(true)
    }

    /// Discards the transaction's changes and releases its locks.
    pub fn abort(mut self) -> Result<()> {
        self.complete(false)
    }

    /// Runs `f` inside the transaction, committing if it succeeds and
    /// aborting if it fails. The error from `f` is returned unchanged.
    pub fn run<T, F>(self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction) -> Result<T>,
    {
        match f(&self) {
            Ok(value) => {
                self.commit()?;
                Ok(value)
            }
            Err(err) => {
                let tid = self.id;
                if let Err(abort_err) = self.abort() {
                    warn!("failed to abort {}: {}", tid, abort_err);
                }
                Err(err)
            }
        }
    }

    fn complete(&mut self, commit: bool) -> Result<()> {
        self.completed = true;
        self.pool.transaction_complete(self.id, commit)
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if !self.completed {
            if let Err(err) = self.complete(false) {
                warn!("failed to abort {} on drop: {}", self.id, err);
            }
        }
    }
}
