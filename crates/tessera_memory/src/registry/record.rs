//! # Allocator Records
//!
//! Plain bookkeeping describing one allocator instance.

use std::fmt;

/// Allocation strategy of a registered allocator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AllocatorKind {
    /// Fixed-size slot pool.
    Pool,
    /// Linear stack with LIFO release.
    Stack,
}

impl fmt::Display for AllocatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pool => f.write_str("pool"),
            Self::Stack => f.write_str("stack"),
        }
    }
}

/// Name, reserved size and used size of one allocator.
///
/// `used_size <= total_size` holds for every correctly used allocator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AllocatorRecord {
    name: String,
    kind: AllocatorKind,
    total_size: usize,
    used_size: usize,
}

impl AllocatorRecord {
    /// Creates a record with nothing used yet.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: AllocatorKind, total_size: usize) -> Self {
        Self {
            name: name.into(),
            kind,
            total_size,
            used_size: 0,
        }
    }

    /// Debug name shown in logs and diagnostics.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Allocation strategy.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> AllocatorKind {
        self.kind
    }

    /// Bytes reserved by the allocator.
    #[inline]
    #[must_use]
    pub const fn total_size(&self) -> usize {
        self.total_size
    }

    /// Bytes currently handed out.
    #[inline]
    #[must_use]
    pub const fn used_size(&self) -> usize {
        self.used_size
    }

    /// Reserved bytes not currently handed out.
    #[inline]
    #[must_use]
    pub const fn free_size(&self) -> usize {
        self.total_size.saturating_sub(self.used_size)
    }

    #[inline]
    pub(crate) fn set_used_size(&mut self, used_size: usize) {
        self.used_size = used_size;
    }

    #[inline]
    pub(crate) fn set_total_size(&mut self, total_size: usize) {
        self.total_size = total_size;
    }
}
