use std::sync::Arc;

use crate::buffer::BufferPool;
use crate::common::{Result, TransactionId};
use crate::tuple::{Record, Schema};

use super::insert::{count_record, count_schema};
use super::{OpIterator, RecordSource};

/// Deletes every record its child yields from the table it was read from.
///
/// Single-shot per open in the same way as [`Insert`](super::Insert).
pub struct Delete {
    pool: Arc<BufferPool>,
    tid: TransactionId,
    child: Box<dyn OpIterator>,
    schema: Arc<Schema>,
    done: bool,
}

impl Delete {
    pub fn new(pool: Arc<BufferPool>, tid: TransactionId, child: Box<dyn OpIterator>) -> Self {
        Self {
            pool,
            tid,
            child,
            schema: count_schema(),
            done: false,
        }
    }
}

impl RecordSource for Delete {
    fn open(&mut self) -> Result<()> {
        self.child.open()?;
        self.done = false;
        Ok(())
    }

    fn fetch_next(&mut self) -> Result<Option<Record>> {
        if self.done {
            return Ok(None);
        }
        self.done = true;

        let mut count = 0;
        while let Some(record) = self.child.next()? {
            self.pool.delete_record(self.tid, &record)?;
            count += 1;
        }
        count_record(&self.schema, count).map(Some)
    }

    fn rewind(&mut self) -> Result<()> {
        self.child.rewind()
    }

    fn close(&mut self) {
        self.child.close()
    }

    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }
}
