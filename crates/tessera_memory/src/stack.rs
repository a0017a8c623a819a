//! # Stack Allocator
//!
//! A linear allocator for scratch memory that is released in reverse order,
//! typically once per frame.
//!
//! ## Layout
//!
//! ```text
//! [ pad | hdr | alloc A ][ pad | hdr | alloc B ][ ....... free ....... ]
//!                ▲                     ▲        ▲                     ▲
//!             A.offset              B.offset   offset              total_size
//! ```
//!
//! Every allocation is preceded by an [`AllocationHeader`] recording how many
//! bytes were skipped to reach it. Releasing an allocation reads that header
//! and rewinds `offset` to where the allocation began.

use std::sync::Arc;

use bytemuck::Pod;

use crate::config::MemoryConfig;
use crate::error::{MemoryError, MemoryResult};
use crate::registry::{AllocatorId, AllocatorKind, AllocatorRecord, MemoryManager, Registration};
use crate::units::{readable, GIB};

/// Exclusive upper bound for a stack allocator's size.
pub const MAX_STACK_SIZE: usize = GIB;

/// Bookkeeping stored immediately before each stack allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AllocationHeader {
    padding: u32,
}

impl AllocationHeader {
    /// Encoded size in bytes.
    pub const SIZE: usize = std::mem::size_of::<u32>();

    /// Creates a header recording `padding` bytes (header included).
    #[inline]
    #[must_use]
    pub const fn new(padding: u32) -> Self {
        Self { padding }
    }

    /// Bytes between the previous offset and the allocation, header included.
    #[inline]
    #[must_use]
    pub const fn padding(self) -> usize {
        self.padding as usize
    }

    #[inline]
    const fn encode(self) -> [u8; Self::SIZE] {
        self.padding.to_le_bytes()
    }

    #[inline]
    const fn decode(bytes: [u8; Self::SIZE]) -> Self {
        Self {
            padding: u32::from_le_bytes(bytes),
        }
    }
}

/// Computes the padding needed at `address` so that a header of
/// `header_size` bytes fits in front of an `alignment`-aligned allocation.
///
/// `alignment` must be a power of two.
#[inline]
#[must_use]
pub const fn padding_with_header(address: usize, alignment: usize, header_size: usize) -> usize {
    let misalignment = address & (alignment - 1);
    let mut padding = if misalignment == 0 {
        0
    } else {
        alignment - misalignment
    };

    if padding < header_size {
        let needed = header_size - padding;
        padding += alignment * needed.div_ceil(alignment);
    }

    padding
}

/// A live region handed out by a [`StackAllocator`].
///
/// Not `Clone`: the token is consumed by [`StackAllocator::deallocate`], so
/// the same region cannot be released twice.
#[derive(Debug, PartialEq, Eq)]
pub struct StackAllocation {
    owner: AllocatorId,
    offset: usize,
    size: usize,
}

impl StackAllocation {
    /// Offset of the first byte within the allocator's region.
    #[inline]
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Size in bytes.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Offset one past the last byte.
    #[inline]
    #[must_use]
    pub const fn end(&self) -> usize {
        self.offset + self.size
    }
}

/// A bump allocator with header-based LIFO release.
///
/// Allocation never touches the system allocator: the whole region is
/// reserved at construction.
///
/// # Thread Safety
///
/// This allocator is NOT thread-safe. Use one per thread.
///
/// # Example
///
/// ```rust,ignore
/// let manager = MemoryManager::new(mib(64));
/// let mut scratch = StackAllocator::new(&manager, "Frame Scratch", mib(1))?;
///
/// let a = scratch.allocate(256, 16)?;
/// let b = scratch.allocate_pod::<f32>(64)?;
///
/// // Release in reverse order
/// scratch.deallocate(b);
/// scratch.deallocate(a);
/// assert_eq!(scratch.used_size(), 0);
/// ```
pub struct StackAllocator {
    /// The reserved region.
    buffer: Box<[u8]>,
    /// Boundary between used and free space.
    offset: usize,
    /// Record ownership and registry mirroring.
    registration: Registration,
}

impl StackAllocator {
    /// Creates a stack allocator and reserves `total_size` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::InvalidStackSize`] unless `0 < total_size < 1 GiB`.
    pub fn new(
        manager: &Arc<MemoryManager>,
        name: impl Into<String>,
        total_size: usize,
    ) -> MemoryResult<Self> {
        let name = name.into();
        if total_size == 0 || total_size >= MAX_STACK_SIZE {
            return Err(MemoryError::InvalidStackSize {
                name,
                size: total_size,
            });
        }

        let mut registration =
            Registration::new(manager, AllocatorRecord::new(name, AllocatorKind::Stack, 0));
        registration.reserve(total_size);

        tracing::info!(
            allocator = registration.name(),
            "Initialized stack of size {}",
            readable(total_size)
        );

        Ok(Self {
            buffer: vec![0u8; total_size].into_boxed_slice(),
            offset: 0,
            registration,
        })
    }

    /// Creates a per-frame scratch stack with the configured size.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::InvalidStackSize`] if the configured size is out of range.
    pub fn from_config(
        manager: &Arc<MemoryManager>,
        name: impl Into<String>,
        config: &MemoryConfig,
    ) -> MemoryResult<Self> {
        Self::new(manager, name, config.stack.frame_scratch_size)
    }

    /// Debug name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        self.registration.name()
    }

    /// Registry id of this allocator.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> AllocatorId {
        self.registration.id()
    }

    /// Current boundary between used and free space.
    #[inline]
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes in use, padding and headers included. Always equals `offset`.
    #[inline]
    #[must_use]
    pub const fn used_size(&self) -> usize {
        self.registration.record().used_size()
    }

    /// Size of the reserved region.
    #[inline]
    #[must_use]
    pub const fn total_size(&self) -> usize {
        self.registration.record().total_size()
    }

    /// Bytes left above `offset`.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.total_size() - self.offset
    }

    /// Allocates `size` bytes aligned to `alignment`.
    ///
    /// Nothing is modified when the request fails.
    ///
    /// # Errors
    ///
    /// - [`MemoryError::InvalidAlignment`] if `alignment` is not a power of two
    /// - [`MemoryError::StackExhausted`] if the request does not fit; this is
    ///   also logged at error level
    pub fn allocate(&mut self, size: usize, alignment: usize) -> MemoryResult<StackAllocation> {
        if !alignment.is_power_of_two() {
            return Err(MemoryError::InvalidAlignment(alignment));
        }

        let address = self.buffer.as_ptr() as usize + self.offset;
        let padding = padding_with_header(address, alignment, AllocationHeader::SIZE);
        let capacity = self.total_size();

        let end = self
            .offset
            .checked_add(padding)
            .and_then(|start| start.checked_add(size))
            .filter(|&end| end <= capacity);

        let Some(end) = end else {
            tracing::error!(
                allocator = self.registration.name(),
                requested = size,
                offset = self.offset,
                "Allocation exceeded maximum size of {}!",
                readable(capacity)
            );
            return Err(MemoryError::StackExhausted {
                name: self.registration.name().to_string(),
                requested: size,
                padding,
                offset: self.offset,
                capacity,
            });
        };

        let start = self.offset + padding;

        // padding < capacity < 1 GiB
        #[allow(clippy::cast_possible_truncation)]
        let header = AllocationHeader::new(padding as u32);
        self.buffer[start - AllocationHeader::SIZE..start].copy_from_slice(&header.encode());

        self.offset = end;
        self.registration.set_used(end);

        tracing::debug!(
            allocator = self.registration.name(),
            "Allocated {} bytes with alignment {}",
            size,
            alignment
        );

        Ok(StackAllocation {
            owner: self.registration.id(),
            offset: start,
            size,
        })
    }

    /// Allocates room for `count` values of `T` with `T`'s alignment.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::StackExhausted`] if the request does not fit
    /// (including when `count * size_of::<T>()` overflows).
    pub fn allocate_pod<T: Pod>(&mut self, count: usize) -> MemoryResult<StackAllocation> {
        let size = std::mem::size_of::<T>()
            .checked_mul(count)
            .unwrap_or(usize::MAX);
        self.allocate(size, std::mem::align_of::<T>())
    }

    /// Releases `allocation`, rewinding `offset` to where it began.
    ///
    /// Allocations must be released in reverse order. Releasing an older
    /// allocation first rewinds past the newer ones, which will then alias
    /// the next allocation; debug builds catch the later release of such a
    /// stale allocation.
    pub fn deallocate(&mut self, allocation: StackAllocation) {
        debug_assert_eq!(
            allocation.owner,
            self.registration.id(),
            "Stack allocation released to the wrong allocator"
        );
        debug_assert!(
            allocation.end() <= self.offset,
            "Stack allocation at {} released out of order (offset {})",
            allocation.offset,
            self.offset
        );

        let start = allocation.offset;
        let mut raw = [0u8; AllocationHeader::SIZE];
        raw.copy_from_slice(&self.buffer[start - AllocationHeader::SIZE..start]);
        let header = AllocationHeader::decode(raw);

        debug_assert!(
            header.padding() >= AllocationHeader::SIZE && header.padding() <= start,
            "Corrupted allocation header at {start}"
        );

        let previous = self.offset;
        self.offset = start.saturating_sub(header.padding());
        self.registration.set_used(self.offset);

        tracing::debug!(
            allocator = self.registration.name(),
            "Deallocated {}",
            readable(previous.saturating_sub(self.offset))
        );
    }

    /// Rewinds to an empty stack, invalidating every outstanding allocation.
    pub fn reset(&mut self) {
        self.offset = 0;
        self.registration.set_used(0);
    }

    /// Bytes of a live allocation.
    ///
    /// # Panics
    ///
    /// Panics if `allocation` does not lie inside this allocator's region.
    #[inline]
    #[must_use]
    pub fn bytes(&self, allocation: &StackAllocation) -> &[u8] {
        &self.buffer[allocation.offset..allocation.end()]
    }

    /// Mutable bytes of a live allocation.
    ///
    /// # Panics
    ///
    /// Panics if `allocation` does not lie inside this allocator's region.
    #[inline]
    pub fn bytes_mut(&mut self, allocation: &StackAllocation) -> &mut [u8] {
        &mut self.buffer[allocation.offset..allocation.end()]
    }

    /// Views a live allocation as a slice of `T`.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::PodCast`] if the bytes are misaligned for `T`
    /// or their length is not a multiple of `size_of::<T>()`.
    pub fn cast_slice<T: Pod>(&self, allocation: &StackAllocation) -> MemoryResult<&[T]> {
        bytemuck::try_cast_slice(self.bytes(allocation))
            .map_err(|e| MemoryError::PodCast(format!("{e:?}")))
    }

    /// Views a live allocation as a mutable slice of `T`.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::PodCast`] if the bytes are misaligned for `T`
    /// or their length is not a multiple of `size_of::<T>()`.
    pub fn cast_slice_mut<T: Pod>(
        &mut self,
        allocation: &StackAllocation,
    ) -> MemoryResult<&mut [T]> {
        bytemuck::try_cast_slice_mut(self.bytes_mut(allocation))
            .map_err(|e| MemoryError::PodCast(format!("{e:?}")))
    }
}
