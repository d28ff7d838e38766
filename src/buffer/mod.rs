mod buffer_pool;
mod frame;
mod lock_manager;
mod lru_k_replacer;

pub use buffer_pool::*;
pub use frame::*;
pub use lock_manager::*;
pub use lru_k_replacer::*;
