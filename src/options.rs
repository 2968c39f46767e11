use crate::error::{Error, Result};
use crate::memtable::skiplist::MAX_HEIGHT;

/// Default initial arena capacity and flush threshold (4 MiB).
pub const DEFAULT_BUFFER_SIZE: usize = 4 * 1024 * 1024;

/// Seed used for height draws unless one is injected.
pub const DEFAULT_SEED: u64 = 0xdead_beef;

/// Configuration for a [`MemTable`](crate::memtable::MemTable).
///
/// ```
/// use lsm_memdb::Options;
///
/// let opts = Options::default().with_capacity(1 << 16).with_seed(7);
/// assert!(opts.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Initial key/value arena capacity in bytes. Advisory, the arena grows past it.
    pub capacity: usize,
    /// Highest tower a node may get. Must be in `1..=MAX_HEIGHT`.
    pub max_height: usize,
    /// Seed for the height RNG. Reapplied on every `reset`.
    pub seed: u64,
    /// Live key+value bytes at which `MemTable::is_full` reports true.
    pub write_buffer_size: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            capacity: DEFAULT_BUFFER_SIZE,
            max_height: MAX_HEIGHT,
            seed: DEFAULT_SEED,
            write_buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl Options {
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_max_height(mut self, max_height: usize) -> Self {
        self.max_height = max_height;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_write_buffer_size(mut self, size: usize) -> Self {
        self.write_buffer_size = size;
        self
    }

    /// Reject settings the skip list cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.max_height == 0 || self.max_height > MAX_HEIGHT {
            return Err(Error::InvalidOptions(format!(
                "max_height must be in 1..={MAX_HEIGHT}, got {}",
                self.max_height
            )));
        }
        Ok(())
    }
}
