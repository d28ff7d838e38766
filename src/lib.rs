//! heapdb - a transactional heap-file storage and execution engine
//!
//! Tables are stored as flat files of fixed-size heap pages. All page access
//! goes through a buffer pool that caches pages and enforces page-level
//! shared/exclusive locks for concurrent transactions. Queries are trees of
//! pull-based operators.
//!
//! # Architecture
//!
//! - **Tuples** (`tuple`): field types, schemas and records, and their
//!   fixed-width byte encoding
//!
//! - **Storage** (`storage`): on-disk layout
//!   - `DiskManager`: page I/O on one flat file
//!   - `HeapPage`: slot bitmap plus fixed-size record slots
//!   - `HeapFile`: a table as a sequence of heap pages, implementing `DbFile`
//!
//! - **Buffer Pool** (`buffer`): the transactional page cache
//!   - `BufferPool`: loads pages on demand, tracks dirty pages per transaction,
//!     commits and aborts
//!   - `LockManager`: page locks with upgrade, deadlock detection and timeouts
//!   - `LruKReplacer`: LRU-K victim selection among unlocked pages
//!
//! - **Catalog** (`catalog`): table id to file, name and primary key
//!
//! - **Execution** (`execution`): the `OpIterator` protocol and the
//!   `SeqScan`, `Filter`, `Insert`, `Delete` and `Aggregate` operators
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use heapdb::execution::{Aggregate, AggregateOp, OpIterator, RecordSource, SeqScan};
//! use heapdb::storage::DbFile;
//! use heapdb::tuple::{FieldType, RecordBuilder, Schema};
//! use heapdb::Database;
//!
//! let db = Database::default();
//! let schema = Schema::builder()
//!     .column("id", FieldType::Int)
//!     .column("score", FieldType::Int)
//!     .build_arc();
//! let table = db.open_table("scores.dat", schema.clone(), "scores", "id").unwrap();
//!
//! let txn = db.begin();
//! let pool = txn.buffer_pool().clone();
//! for i in 0..10 {
//!     let record = RecordBuilder::new(schema.clone()).value(i).value(i * 10).build().unwrap();
//!     pool.insert_record(txn.id(), table.table_id(), record).unwrap();
//! }
//! txn.commit().unwrap();
//!
//! let txn = db.begin();
//! let scan = SeqScan::new(txn.buffer_pool().clone(), txn.id(), table.table_id(), "s").unwrap();
//! let mut sum = Aggregate::new(Box::new(scan), 1, None, AggregateOp::Sum).unwrap().buffered();
//! sum.open().unwrap();
//! println!("{}", sum.next().unwrap().unwrap());
//! sum.close();
//! txn.commit().unwrap();
//! ```

pub mod buffer;
pub mod catalog;
pub mod common;
pub mod execution;
pub mod storage;
pub mod tuple;

mod database;
mod transaction;

pub use common::{DbError, PageId, RecordId, Result, SlotId, TableId, TransactionId};
pub use database::Database;
pub use transaction::Transaction;
