use std::time::Duration;

/// Size of a page in bytes (4 KB). Shared by every heap file of a running
/// instance; changing it invalidates all existing files.
pub const PAGE_SIZE: usize = 4096;

/// On-disk width of an integer field in bytes
pub const INT_SIZE: usize = 4;

/// Width of the length prefix stored in front of every string field
pub const STRING_LEN_PREFIX: usize = 4;

/// Default maximum byte length of a string field
pub const DEFAULT_STRING_LEN: u16 = 128;

/// Default buffer pool capacity (number of cached pages)
pub const DEFAULT_POOL_PAGES: usize = 50;

/// Default K value for LRU-K replacement policy
pub const DEFAULT_LRUK_K: usize = 2;

/// Default bound on how long a lock request may stay blocked
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(2000);

/// Runtime configuration of a [`BufferPool`](crate::buffer::BufferPool).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferPoolConfig {
    /// Maximum number of pages held in memory
    pub capacity: usize,
    /// K used by the LRU-K replacer when picking eviction victims
    pub replacer_k: usize,
    /// A blocked lock request fails with `TransactionAborted` after this long
    pub lock_timeout: Duration,
}

impl BufferPoolConfig {
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_replacer_k(mut self, k: usize) -> Self {
        self.replacer_k = k;
        self
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_POOL_PAGES,
            replacer_k: DEFAULT_LRUK_K,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BufferPoolConfig::default();
        assert_eq!(config.capacity, DEFAULT_POOL_PAGES);
        assert_eq!(config.replacer_k, DEFAULT_LRUK_K);
        assert_eq!(config.lock_timeout, DEFAULT_LOCK_TIMEOUT);
    }

    #[test]
    fn test_config_setters() {
        let config = BufferPoolConfig::default()
            .with_capacity(3)
            .with_replacer_k(1)
            .with_lock_timeout(Duration::from_millis(10));
        assert_eq!(config.capacity, 3);
        assert_eq!(config.replacer_k, 1);
        assert_eq!(config.lock_timeout, Duration::from_millis(10));
    }
}
