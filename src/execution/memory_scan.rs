use std::sync::Arc;

use crate::common::Result;
use crate::tuple::{Record, Schema};

use super::RecordSource;

/// Yields a fixed list of records held in memory.
#[derive(Debug, Clone)]
pub struct MemoryScan {
    schema: Arc<Schema>,
    records: Vec<Record>,
    position: usize,
}

impl MemoryScan {
    pub fn new(schema: Arc<Schema>, records: Vec<Record>) -> Self {
        Self {
            schema,
            records,
            position: 0,
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }
}

impl RecordSource for MemoryScan {
    fn open(&mut self) -> Result<()> {
        self.position = 0;
        Ok(())
    }

    fn fetch_next(&mut self) -> Result<Option<Record>> {
        let record = self.records.get(self.position).cloned();
        if record.is_some() {
            self.position += 1;
        }
        Ok(record)
    }

    fn rewind(&mut self) -> Result<()> {
        self.position = 0;
        Ok(())
    }

    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }
}
