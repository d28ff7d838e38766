use std::sync::Arc;

use crate::buffer::BufferPool;
use crate::common::{Result, TableId, TransactionId};
use crate::tuple::{Field, FieldType, Record, Schema};

use super::{OpIterator, RecordSource};

/// Schema of the single summary record produced by Insert and Delete.
pub(crate) fn count_schema() -> Arc<Schema> {
    Arc::new(Schema::from_types(&[FieldType::Int]))
}

pub(crate) fn count_record(schema: &Arc<Schema>, count: usize) -> Result<Record> {
    Record::from_fields(Arc::clone(schema), vec![Field::Int(count as i32)])
}

/// Inserts every record of its child into a table.
///
/// The first pull drains the child and yields one record holding the
/// number of records inserted. Later pulls yield nothing until the operator
/// is closed and opened again; `rewind` does not re-arm it.
pub struct Insert {
    pool: Arc<BufferPool>,
    tid: TransactionId,
    table_id: TableId,
    child: Box<dyn OpIterator>,
    schema: Arc<Schema>,
    done: bool,
}

impl Insert {
    pub fn new(pool: Arc<BufferPool>, tid: TransactionId, child: Box<dyn OpIterator>, table_id: TableId) -> Self {
        Self {
            pool,
            tid,
            table_id,
            child,
            schema: count_schema(),
            done: false,
        }
    }
}

impl RecordSource for Insert {
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
            self.pool.insert_record(self.tid, self.table_id, record)?;
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
