//! # Pool Allocator
//!
//! Fixed-size slot allocator for objects of one type that are frequently
//! created and destroyed (particles, layers, network packets).
//!
//! ## Layout
//!
//! ```text
//! block 0: [ Used(Some) | Free ─┐ | Used(Some) | Free ─┐ ]
//! block 1: [ Free ◀─────────────┘ | Used(None) | ...   │ ]
//!            ▲                                         │
//!            └──────────── free_head ◀─────────────────┘
//! ```
//!
//! Free slots hold only the index of the next free slot, so the free list is
//! threaded through the block storage itself. When the list runs dry a new
//! block of `chunks_per_block` slots is reserved and threaded; growth is never
//! reported to the caller.

use std::sync::Arc;

use crate::config::MemoryConfig;
use crate::error::{MemoryError, MemoryResult};
use crate::registry::{AllocatorId, AllocatorKind, AllocatorRecord, MemoryManager, Registration};

/// One chunk of pool storage.
#[derive(Debug)]
enum Slot<T> {
    /// Unused; links to the next free slot (`None` terminates the list).
    Free { next: Option<usize> },
    /// Handed out. `None` until an object is constructed into it.
    Used(Option<T>),
}

/// Handle to a slot in a pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PoolHandle {
    /// Global slot index (block * chunks per block + chunk).
    index: usize,
}

impl PoolHandle {
    /// Global slot index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.index
    }
}

/// A pool allocator for fixed-size objects.
///
/// Every slot accounts for `size_of::<T>()` bytes of used size while it is
/// handed out, and each block for `chunks_per_block * size_of::<T>()` bytes
/// of total size.
///
/// # Accounting
///
/// Sizes reported to the registry are the payload sizes above. A slot also
/// carries its free-list tag, so the heap footprint of a block is
/// `chunks_per_block * size_of::<Slot<T>>()`, which can exceed the reported
/// figure for small `T` (a `PoolAllocator<u8>` slot is 24 bytes on 64-bit
/// targets). Budget observers see payload bytes, not the tag overhead.
///
/// # Thread Safety
///
/// This pool is NOT thread-safe. Use one pool per thread.
///
/// # Example
///
/// ```rust,ignore
/// struct Particle { x: f32, y: f32, life: f32 }
///
/// let manager = MemoryManager::new(mib(64));
/// let mut pool: PoolAllocator<Particle> = PoolAllocator::new(&manager, "Particles", 1024)?;
///
/// // Create - O(1), grows by one block when the free list is empty
/// let handle = pool.create(Particle { x: 0.0, y: 0.0, life: 1.0 });
///
/// // Delete - O(1), runs the destructor and relinks the slot
/// pool.delete(handle);
/// ```
pub struct PoolAllocator<T> {
    /// Reserved blocks, each exactly `chunks_per_block` slots.
    blocks: Vec<Box<[Slot<T>]>>,
    /// Head of the free list.
    free_head: Option<usize>,
    /// Slots per block.
    chunks_per_block: usize,
    /// Number of slots currently handed out.
    allocated_count: usize,
    /// Record ownership and registry mirroring.
    registration: Registration,
}

impl<T> PoolAllocator<T> {
    /// Bytes accounted per slot.
    pub const ELEMENT_SIZE: usize = std::mem::size_of::<T>();

    /// Creates a pool and reserves its first block.
    ///
    /// # Arguments
    ///
    /// * `manager` - Registry the pool reports to
    /// * `name` - Debug name for logs and diagnostics
    /// * `chunks_per_block` - Slots per block; also the growth granularity
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::ZeroChunksPerBlock`] if `chunks_per_block` is zero.
    pub fn new(
        manager: &Arc<MemoryManager>,
        name: impl Into<String>,
        chunks_per_block: usize,
    ) -> MemoryResult<Self> {
        let name = name.into();
        if chunks_per_block == 0 {
            return Err(MemoryError::ZeroChunksPerBlock { name });
        }

        let registration =
            Registration::new(manager, AllocatorRecord::new(name, AllocatorKind::Pool, 0));

        let mut pool = Self {
            blocks: Vec::new(),
            free_head: None,
            chunks_per_block,
            allocated_count: 0,
            registration,
        };
        pool.grow();

        Ok(pool)
    }

    /// Creates a pool with the configured default block granularity.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::ZeroChunksPerBlock`] if the configured count is zero.
    pub fn from_config(
        manager: &Arc<MemoryManager>,
        name: impl Into<String>,
        config: &MemoryConfig,
    ) -> MemoryResult<Self> {
        Self::new(manager, name, config.pool.default_chunks_per_block)
    }

    /// Debug name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        self.registration.name()
    }

    /// Registry id of this pool.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> AllocatorId {
        self.registration.id()
    }

    /// Slots per block.
    #[inline]
    #[must_use]
    pub const fn chunks_per_block(&self) -> usize {
        self.chunks_per_block
    }

    /// Number of reserved blocks.
    #[inline]
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Total slots across all blocks.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.blocks.len() * self.chunks_per_block
    }

    /// Number of slots currently handed out.
    #[inline]
    #[must_use]
    pub const fn allocated_count(&self) -> usize {
        self.allocated_count
    }

    /// Number of free slots before the next growth.
    #[inline]
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.capacity() - self.allocated_count
    }

    /// Bytes handed out (`allocated_count * size_of::<T>()`).
    #[inline]
    #[must_use]
    pub const fn used_size(&self) -> usize {
        self.registration.record().used_size()
    }

    /// Bytes reserved across all blocks.
    #[inline]
    #[must_use]
    pub const fn total_size(&self) -> usize {
        self.registration.record().total_size()
    }

    /// Reserves a slot without initializing it.
    ///
    /// Grows the pool by one block when no free slot is left, so this never
    /// fails. The slot reads as empty until [`init`](Self::init) is called.
    pub fn allocate(&mut self) -> PoolHandle {
        let index = match self.free_head {
            Some(index) => index,
            None => self.grow(),
        };

        let next = match std::mem::replace(self.slot_mut(index), Slot::Used(None)) {
            Slot::Free { next } => next,
            Slot::Used(_) => unreachable!("free list links a slot in use"),
        };
        self.free_head = next;

        self.allocated_count += 1;
        let used = self.used_size() + Self::ELEMENT_SIZE;
        self.registration.set_used(used);

        tracing::debug!(
            allocator = self.registration.name(),
            "Allocated {} bytes",
            Self::ELEMENT_SIZE
        );

        PoolHandle { index }
    }

    /// Constructs `value` into a slot obtained from [`allocate`](Self::allocate).
    ///
    /// # Errors
    ///
    /// Gives `value` back if the slot is free or already holds an object.
    pub fn init(&mut self, handle: PoolHandle, value: T) -> Result<&mut T, T> {
        match self.try_slot_mut(handle.index) {
            Some(Slot::Used(empty @ None)) => Ok(empty.insert(value)),
            _ => Err(value),
        }
    }

    /// Allocates a slot and moves `value` into it.
    ///
    /// The object is fully initialized before the handle is returned.
    pub fn create(&mut self, value: T) -> PoolHandle {
        let handle = self.allocate();
        *self.slot_mut(handle.index) = Slot::Used(Some(value));
        handle
    }

    /// Allocates a slot and fills it with the result of `make`.
    pub fn create_with(&mut self, make: impl FnOnce() -> T) -> PoolHandle {
        self.create(make())
    }

    /// Returns a slot to the free list without running the object's destructor.
    ///
    /// A live object in the slot is leaked (`mem::forget`). Use
    /// [`delete`](Self::delete) to tear a live object down.
    ///
    /// Releasing the same handle twice is a caller error: debug builds
    /// panic, release builds log it and leave the free list untouched.
    pub fn deallocate(&mut self, handle: PoolHandle) {
        if let Some(Slot::Used(Some(value))) = self.release(handle) {
            std::mem::forget(value);
        }
    }

    /// Drops the object in place and returns its slot to the free list.
    pub fn delete(&mut self, handle: PoolHandle) {
        drop(self.release(handle));
    }

    /// Moves the object out and returns its slot to the free list.
    pub fn take(&mut self, handle: PoolHandle) -> Option<T> {
        match self.release(handle)? {
            Slot::Used(value) => value,
            Slot::Free { .. } => None,
        }
    }

    /// Gets a reference to a live object.
    #[inline]
    #[must_use]
    pub fn get(&self, handle: PoolHandle) -> Option<&T> {
        let block = self.blocks.get(handle.index / self.chunks_per_block)?;
        match &block[handle.index % self.chunks_per_block] {
            Slot::Used(value) => value.as_ref(),
            Slot::Free { .. } => None,
        }
    }

    /// Gets a mutable reference to a live object.
    #[inline]
    pub fn get_mut(&mut self, handle: PoolHandle) -> Option<&mut T> {
        match self.try_slot_mut(handle.index)? {
            Slot::Used(value) => value.as_mut(),
            Slot::Free { .. } => None,
        }
    }

    /// Iterates over all live objects.
    pub fn iter(&self) -> impl Iterator<Item = (PoolHandle, &T)> {
        self.blocks
            .iter()
            .flat_map(|block| block.iter())
            .enumerate()
            .filter_map(|(index, slot)| match slot {
                Slot::Used(Some(value)) => Some((PoolHandle { index }, value)),
                _ => None,
            })
    }

    /// Unlinks the slot's content and pushes the slot onto the free list.
    ///
    /// Returns the previous slot state, or `None` on misuse.
    fn release(&mut self, handle: PoolHandle) -> Option<Slot<T>> {
        let index = handle.index;

        match self.try_slot_mut(index).map(|slot| matches!(slot, Slot::Free { .. })) {
            None => {
                tracing::error!(
                    allocator = self.registration.name(),
                    index,
                    "Deallocated a handle outside the pool"
                );
                if cfg!(debug_assertions) {
                    panic!("Pool handle {index} out of bounds");
                }
                return None;
            }
            Some(true) => {
                tracing::error!(
                    allocator = self.registration.name(),
                    index,
                    "Double free of pool slot"
                );
                if cfg!(debug_assertions) {
                    panic!("Double free of pool slot {index}");
                }
                return None;
            }
            Some(false) => {}
        }

        let free_head = self.free_head;
        let previous = std::mem::replace(self.slot_mut(index), Slot::Free { next: free_head });
        self.free_head = Some(index);

        self.allocated_count -= 1;
        let used = self.used_size() - Self::ELEMENT_SIZE;
        self.registration.set_used(used);

        tracing::debug!(
            allocator = self.registration.name(),
            "Deallocated {} bytes",
            Self::ELEMENT_SIZE
        );

        Some(previous)
    }

    /// Reserves one more block and threads its slots onto the free list.
    ///
    /// Returns the new free-list head.
    fn grow(&mut self) -> usize {
        let base = self.capacity();
        let end = base + self.chunks_per_block;
        let tail = self.free_head;

        let block: Box<[Slot<T>]> = (base..end)
            .map(|index| Slot::Free {
                next: if index + 1 < end { Some(index + 1) } else { tail },
            })
            .collect();

        self.blocks.push(block);
        self.free_head = Some(base);

        let block_size = self.chunks_per_block * Self::ELEMENT_SIZE;
        self.registration.reserve(block_size);

        tracing::info!(
            allocator = self.registration.name(),
            blocks = self.blocks.len(),
            "Allocated block ({} chunks, {})",
            self.chunks_per_block,
            crate::units::readable(block_size)
        );

        base
    }

    #[inline]
    fn try_slot_mut(&mut self, index: usize) -> Option<&mut Slot<T>> {
        let block = self.blocks.get_mut(index / self.chunks_per_block)?;
        block.get_mut(index % self.chunks_per_block)
    }

    #[inline]
    fn slot_mut(&mut self, index: usize) -> &mut Slot<T> {
        &mut self.blocks[index / self.chunks_per_block][index % self.chunks_per_block]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> Arc<MemoryManager> {
        MemoryManager::new(crate::units::mib(1))
    }

    #[test]
    fn test_pool_create_delete() {
        let manager = manager();
        let mut pool: PoolAllocator<u64> = PoolAllocator::new(&manager, "u64s", 10).unwrap();
        assert_eq!(pool.used_size(), 0);
        assert_eq!(pool.total_size(), 10 * 8);

        let h1 = pool.create(42);
        assert_eq!(*pool.get(h1).unwrap(), 42);
        assert_eq!(pool.allocated_count(), 1);
        assert_eq!(pool.used_size(), 8);
        assert_eq!(manager.used_allocated_size(), 8);

        pool.delete(h1);
        assert_eq!(pool.allocated_count(), 0);
        assert_eq!(pool.used_size(), 0);
        assert!(pool.get(h1).is_none());
    }

    #[test]
    fn test_zero_chunks_rejected() {
        let manager = manager();
        let result = PoolAllocator::<u64>::new(&manager, "broken", 0);
        assert!(matches!(result, Err(MemoryError::ZeroChunksPerBlock { .. })));
        assert_eq!(manager.allocator_count(), 0);
    }

    #[test]
    fn test_pool_grows_transparently() {
        let manager = manager();
        let mut pool: PoolAllocator<u32> = PoolAllocator::new(&manager, "tiny", 2).unwrap();
        assert_eq!(pool.block_count(), 1);

        let handles: Vec<_> = (0..5).map(|i| pool.create(i)).collect();
        assert_eq!(pool.block_count(), 3);
        assert_eq!(pool.capacity(), 6);
        assert_eq!(pool.free_count(), 1);
        assert_eq!(pool.total_size(), 3 * 2 * 4);
        assert_eq!(manager.total_allocated_size(), 3 * 2 * 4);

        for (i, handle) in handles.iter().enumerate() {
            assert_eq!(*pool.get(*handle).unwrap(), i as u32);
        }
    }

    #[test]
    fn test_pool_reuse_is_lifo() {
        let manager = manager();
        let mut pool: PoolAllocator<u32> = PoolAllocator::new(&manager, "lifo", 4).unwrap();

        let h1 = pool.create(1);
        let h2 = pool.create(2);
        let _h3 = pool.create(3);

        pool.delete(h2);
        pool.delete(h1);

        // Reverse deallocation order
        assert_eq!(pool.create(4), h1);
        assert_eq!(pool.create(5), h2);
        assert_eq!(pool.block_count(), 1);
    }

    #[test]
    fn test_small_types_are_poolable() {
        let manager = manager();
        let mut pool: PoolAllocator<u8> = PoolAllocator::new(&manager, "bytes", 3).unwrap();

        let a = pool.create(b'a');
        let b = pool.create(b'b');
        assert_eq!(pool.used_size(), 2);
        assert_eq!(pool.get(a), Some(&b'a'));
        assert_eq!(pool.get(b), Some(&b'b'));
    }

    #[test]
    fn test_allocate_then_init() {
        let manager = manager();
        let mut pool: PoolAllocator<String> = PoolAllocator::new(&manager, "strings", 2).unwrap();

        let handle = pool.allocate();
        assert!(pool.get(handle).is_none());
        assert_eq!(pool.used_size(), PoolAllocator::<String>::ELEMENT_SIZE);

        pool.init(handle, "layer".to_string()).unwrap().push_str("-stack");
        assert_eq!(pool.get(handle).map(String::as_str), Some("layer-stack"));

        let rejected = pool.init(handle, "twice".to_string());
        assert_eq!(rejected, Err("twice".to_string()));
    }

    #[test]
    fn test_delete_runs_destructor_and_deallocate_does_not() {
        use std::rc::Rc;

        let manager = manager();
        let tracker = Rc::new(());
        let mut pool: PoolAllocator<Rc<()>> = PoolAllocator::new(&manager, "rc", 4).unwrap();

        let deleted = pool.create(Rc::clone(&tracker));
        let released = pool.create(Rc::clone(&tracker));
        assert_eq!(Rc::strong_count(&tracker), 3);

        pool.delete(deleted);
        assert_eq!(Rc::strong_count(&tracker), 2);

        pool.deallocate(released);
        assert_eq!(Rc::strong_count(&tracker), 2);
        assert_eq!(pool.used_size(), 0);
    }

    #[test]
    fn test_take_moves_value_out() {
        let manager = manager();
        let mut pool: PoolAllocator<Vec<u8>> = PoolAllocator::new(&manager, "vecs", 2).unwrap();

        let handle = pool.create_with(|| vec![1, 2, 3]);
        assert_eq!(pool.take(handle), Some(vec![1, 2, 3]));
        assert_eq!(pool.allocated_count(), 0);
    }

    #[test]
    fn test_get_mut_and_iter() {
        let manager = manager();
        let mut pool: PoolAllocator<i32> = PoolAllocator::new(&manager, "ints", 4).unwrap();

        let a = pool.create(1);
        let b = pool.create(2);
        *pool.get_mut(b).unwrap() += 40;

        let live: Vec<(PoolHandle, i32)> = pool.iter().map(|(h, v)| (h, *v)).collect();
        assert_eq!(live, vec![(a, 1), (b, 42)]);
    }

    #[test]
    fn test_drop_unregisters() {
        let manager = manager();
        {
            let mut pool: PoolAllocator<u64> = PoolAllocator::new(&manager, "scoped", 4).unwrap();
            let _ = pool.create(7);
            assert_eq!(manager.allocator_count(), 1);
            assert_eq!(manager.used_allocated_size(), 8);
        }
        assert_eq!(manager.allocator_count(), 0);
        assert_eq!(manager.used_allocated_size(), 0);
        assert_eq!(manager.total_allocated_size(), 32);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "Double free")]
    fn test_double_free_caught_in_debug() {
        let manager = manager();
        let mut pool: PoolAllocator<u32> = PoolAllocator::new(&manager, "double", 2).unwrap();

        let handle = pool.create(1);
        pool.delete(handle);
        pool.delete(handle);
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn test_double_free_leaves_free_list_intact_in_release() {
        let manager = manager();
        let mut pool: PoolAllocator<u64> = PoolAllocator::new(&manager, "double", 4).unwrap();

        let handle = pool.create(1);
        pool.delete(handle);
        pool.delete(handle);
        assert_eq!(pool.used_size(), 0);
        assert_eq!(pool.allocated_count(), 0);

        // A relinked slot would be handed out twice
        let a = pool.create(2);
        let b = pool.create(3);
        assert_ne!(a, b);
        assert_eq!(pool.used_size(), 2 * 8);
        assert_eq!(pool.get(a), Some(&2));
        assert_eq!(pool.get(b), Some(&3));
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn test_out_of_bounds_handle_ignored_in_release() {
        let manager = manager();
        let mut pool: PoolAllocator<u64> = PoolAllocator::new(&manager, "bounds", 2).unwrap();

        let handle = pool.create(1);
        pool.delete(PoolHandle { index: 99 });
        assert_eq!(pool.used_size(), 8);
        assert_eq!(pool.get(handle), Some(&1));
    }

    #[test]
    fn test_init_rejects_free_and_foreign_slots() {
        let manager = manager();
        let mut pool: PoolAllocator<u32> = PoolAllocator::new(&manager, "init", 2).unwrap();

        let handle = pool.allocate();
        pool.deallocate(handle);
        assert_eq!(pool.init(handle, 5), Err(5));
        assert_eq!(pool.init(PoolHandle { index: 40 }, 6), Err(6));
        assert_eq!(pool.allocated_count(), 0);
    }

    #[test]
    fn test_reported_sizes_count_payload_bytes() {
        let manager = manager();
        let pool: PoolAllocator<u8> = PoolAllocator::new(&manager, "payload", 16).unwrap();

        assert_eq!(pool.total_size(), 16);
        assert_eq!(manager.total_allocated_size(), 16);
        assert!(std::mem::size_of::<Slot<u8>>() > PoolAllocator::<u8>::ELEMENT_SIZE);
    }
}
