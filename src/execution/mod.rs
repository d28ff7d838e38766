mod aggregate;
mod delete;
mod filter;
mod insert;
mod iterator;
mod memory_scan;
mod seq_scan;

pub use aggregate::*;
pub use delete::*;
pub use filter::*;
pub use insert::*;
pub use iterator::*;
pub use memory_scan::*;
pub use seq_scan::*;
