//! Directory of the tables known to a database.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::common::{DbError, Result, TableId};
use crate::storage::DbFile;
use crate::tuple::Schema;

#[derive(Debug, Clone)]
struct TableInfo {
    file: Arc<dyn DbFile>,
    name: String,
    primary_key: String,
}

/// Maps table ids to their storage, name and primary key.
#[derive(Debug, Default)]
pub struct Catalog {
    tables: RwLock<HashMap<TableId, TableInfo>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `file` under `name`.
    ///
    /// A file whose table id is already registered replaces the old entry,
    /// and a name that is already taken moves to the new table.
    pub fn add_table(&self, file: Arc<dyn DbFile>, name: impl Into<String>, primary_key: impl Into<String>) {
        let name = name.into();
        let table_id = file.table_id();

        let mut tables = self.tables.write();
        tables.retain(|id, info| *id == table_id || info.name != name);
        tables.insert(
            table_id,
            TableInfo {
                file,
                name,
                primary_key: primary_key.into(),
            },
        );
    }

    /// Returns the id of the table called `name`.
    pub fn table_id(&self, name: &str) -> Result<TableId> {
        self.tables
            .read()
            .iter()
            .find(|(_, info)| info.name == name)
            .map(|(id, _)| *id)
            .ok_or_else(|| DbError::TableNameNotFound(name.to_string()))
    }

    /// Returns the storage of a table.
    pub fn database_file(&self, table_id: TableId) -> Result<Arc<dyn DbFile>> {
        self.with_table(table_id, |info| Arc::clone(&info.file))
    }

    pub fn schema(&self, table_id: TableId) -> Result<Arc<Schema>> {
        self.with_table(table_id, |info| Arc::clone(info.file.schema()))
    }

    pub fn table_name(&self, table_id: TableId) -> Result<String> {
        self.with_table(table_id, |info| info.name.clone())
    }

    pub fn primary_key(&self, table_id: TableId) -> Result<String> {
        self.with_table(table_id, |info| info.primary_key.clone())
    }

    /// Returns the ids of all registered tables, in no particular order.
    pub fn table_ids(&self) -> Vec<TableId> {
        self.tables.read().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.tables.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.read().is_empty()
    }

    /// Forgets every table.
    pub fn clear(&self) {
        self.tables.write().clear();
    }

    fn with_table<T>(&self, table_id: TableId, f: impl FnOnce(&TableInfo) -> T) -> Result<T> {
        self.tables
            .read()
            .get(&table_id)
            .map(f)
            .ok_or(DbError::UnknownTable(table_id))
    }
}
