pub mod disk;
pub mod page;

mod db_file;
mod heap_file;

pub use db_file::*;
pub use heap_file::*;
