use std::sync::Arc;

use crate::buffer::BufferPool;
use crate::common::{Result, TableId, TransactionId};
use crate::tuple::{Record, Schema};

use super::OpIterator;

/// Sequential scan over every record of a table, in page then slot order.
///
/// Field names of the output schema are qualified with the scan's alias
/// (`alias.field`); record values are passed through untouched.
pub struct SeqScan {
    pool: Arc<BufferPool>,
    tid: TransactionId,
    table_id: TableId,
    table_name: String,
    alias: String,
    schema: Arc<Schema>,
    scan: Box<dyn OpIterator>,
}

impl SeqScan {
    /// Creates a scan of `table_id` for `tid` whose fields are qualified
    /// with `alias`.
    pub fn new(pool: Arc<BufferPool>, tid: TransactionId, table_id: TableId, alias: &str) -> Result<Self> {
        let (table_name, schema, scan) = Self::prepare(&pool, tid, table_id, alias)?;
        Ok(Self {
            pool,
            tid,
            table_id,
            table_name,
            alias: alias.to_string(),
            schema,
            scan,
        })
    }

    /// Creates a scan that uses the table name as its alias.
    pub fn for_table(pool: Arc<BufferPool>, tid: TransactionId, table_id: TableId) -> Result<Self> {
        let name = pool.catalog().table_name(table_id)?;
        Self::new(pool, tid, table_id, &name)
    }

    /// Points the scan at another table and alias. The scan is left closed.
    pub fn reset(&mut self, table_id: TableId, alias: &str) -> Result<()> {
        let (table_name, schema, scan) = Self::prepare(&self.pool, self.tid, table_id, alias)?;
        self.scan.close();
        self.table_id = table_id;
        self.table_name = table_name;
        self.alias = alias.to_string();
        self.schema = schema;
        self.scan = scan;
        Ok(())
    }

    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    /// Returns the name the table is registered under.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    fn prepare(
        pool: &Arc<BufferPool>,
        tid: TransactionId,
        table_id: TableId,
        alias: &str,
    ) -> Result<(String, Arc<Schema>, Box<dyn OpIterator>)> {
        let catalog = pool.catalog();
        let table_name = catalog.table_name(table_id)?;
        let file = catalog.database_file(table_id)?;
        let schema = Arc::new(file.schema().with_alias(alias));
        let scan = file.iterator(Arc::clone(pool), tid);
        Ok((table_name, schema, scan))
    }

    fn qualify(&self, record: Option<Record>) -> Option<Record> {
        record.map(|mut record| {
            record.relabel(Arc::clone(&self.schema));
            record
        })
    }
}

impl OpIterator for SeqScan {
    fn open(&mut self) -> Result<()> {
        self.scan.open()
    }

    fn has_next(&mut self) -> Result<bool> {
        self.scan.has_next()
    }

    fn next(&mut self) -> Result<Option<Record>> {
        let record = self.scan.next()?;
        Ok(self.qualify(record))
    }

    fn rewind(&mut self) -> Result<()> {
        self.scan.rewind()
    }

    fn close(&mut self) {
        self.scan.close()
    }

    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }
}
