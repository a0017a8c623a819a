//! # Memory Error Types
//!
//! All errors that can occur in the memory subsystem.
//!
//! Misuse (double free, out-of-order stack release) is not represented here.
//! Those are caller obligations and are only guarded in debug builds.

use thiserror::Error;

/// Errors that can occur in the memory subsystem.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    /// A pool allocator was configured with zero chunks per block.
    #[error("pool allocator `{name}`: chunks per block must be greater than zero")]
    ZeroChunksPerBlock {
        /// Debug name of the allocator.
        name: String,
    },

    /// A stack allocator was configured with a size outside `(0, 1 GiB)`.
    #[error("stack allocator `{name}`: size {size} must be greater than 0 and less than 1 GiB")]
    InvalidStackSize {
        /// Debug name of the allocator.
        name: String,
        /// The rejected size in bytes.
        size: usize,
    },

    /// Alignment was zero or not a power of two.
    #[error("alignment {0} is not a power of two")]
    InvalidAlignment(usize),

    /// A stack allocator ran out of reserved space.
    #[error(
        "stack allocator `{name}` exhausted: {requested} bytes (+{padding} padding) at offset {offset} exceed capacity {capacity}"
    )]
    StackExhausted {
        /// Debug name of the allocator.
        name: String,
        /// Requested payload size in bytes.
        requested: usize,
        /// Padding (header included) the request would have needed.
        padding: usize,
        /// Offset at the time of the request.
        offset: usize,
        /// Total reserved size.
        capacity: usize,
    },

    /// A stack allocation could not be viewed as a slice of the requested type.
    #[error("invalid plain-old-data view: {0}")]
    PodCast(String),

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for memory operations.
pub type MemoryResult<T> = Result<T, MemoryError>;
