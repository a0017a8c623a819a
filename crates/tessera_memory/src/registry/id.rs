//! # Allocator Identifiers
//!
//! Allocators are identified in the registry by a table slot plus a
//! generation counter, so a stale id never matches a reused slot.

use std::fmt;

/// Handle to a registry entry.
///
/// - Lower 32 bits: Index into the registry table
/// - Upper 32 bits: Generation counter for detecting stale handles
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct AllocatorId(u64);

impl AllocatorId {
    /// Creates an id from table index and generation.
    #[inline]
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self(((generation as u64) << 32) | (index as u64))
    }

    /// Returns the table index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0 as u32
    }

    /// Returns the generation.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }
}

impl fmt::Display for AllocatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index(), self.generation())
    }
}
