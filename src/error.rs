use std::io;

use thiserror::Error;

/// Unified error type for the memtable and write-batch layer.
#[derive(Debug, Error)]
pub enum Error {
    /// Get/Find/Delete found no matching key.
    #[error("not found")]
    NotFound,

    /// A positioning call was made on an iterator after `release`.
    #[error("iterator released")]
    IteratorReleased,

    /// Structural violation while decoding a batch. The reason is kept verbatim.
    #[error("batch corrupted: {0}")]
    BatchCorrupted(String),

    /// Malformed internal key (too short, unknown type tag).
    #[error("corruption: {0}")]
    Corruption(String),

    /// Sequence number does not fit in the 56 bits of an internal key trailer.
    #[error("sequence number {0} overflows 56 bits")]
    SequenceOverflow(u64),

    /// Record count does not fit the 32-bit count field of a batch header.
    #[error("batch too large: {0} records")]
    BatchTooLarge(usize),

    /// Rejected store configuration.
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// IO error from an external writer.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn batch_corrupted(reason: impl Into<String>) -> Self {
        Error::BatchCorrupted(reason.into())
    }

    /// True for [`Error::NotFound`]. Callers branch on this as a normal outcome.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound)
    }

    /// True for any decode-time corruption, batch or internal key.
    pub fn is_corrupted(&self) -> bool {
        matches!(self, Error::BatchCorrupted(_) | Error::Corruption(_))
    }
}

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
