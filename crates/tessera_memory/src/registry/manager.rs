//! # Memory Manager
//!
//! The process-wide registry of live allocators.
//!
//! The manager is an explicit context: create it once at startup, hand an
//! `Arc` to every allocator constructor, and drop it after the allocators.
//! Allocators keep it alive through their registration, so teardown order
//! can never leave an allocator pointing at a dead registry.
//!
//! ## Thread Safety
//!
//! The registry table sits behind a single `parking_lot::Mutex`. This is the
//! only synchronized piece of the subsystem; allocators themselves are owned
//! by one thread each.

use std::sync::Arc;

use parking_lot::Mutex;

use super::id::AllocatorId;
use super::record::AllocatorRecord;
use super::report::MemoryReport;
use crate::config::MemoryConfig;

/// Registry of every live allocator plus aggregate usage.
///
/// # Example
///
/// ```rust,ignore
/// let manager = MemoryManager::new(mib(512));
/// let mut pool: PoolAllocator<Particle> = PoolAllocator::new(&manager, "Particles", 64)?;
///
/// let handle = pool.create(Particle::default());
/// assert_eq!(manager.used_allocated_size(), pool.used_size());
/// ```
#[derive(Debug)]
pub struct MemoryManager {
    /// Advisory ceiling for external observers.
    application_budget: usize,
    /// Records keyed by generational id.
    table: Mutex<RegistryTable>,
}

#[derive(Debug, Default)]
struct RegistryTable {
    /// Slots, live or vacant.
    slots: Vec<RegistrySlot>,
    /// Vacant slot indices for reuse.
    free_indices: Vec<u32>,
    /// Number of live records.
    live_count: usize,
    /// Sum of every backing reservation ever made (high-water mark).
    total_allocated_size: usize,
}

#[derive(Debug)]
struct RegistrySlot {
    generation: u32,
    record: Option<AllocatorRecord>,
}

impl RegistryTable {
    fn get(&self, id: AllocatorId) -> Option<&AllocatorRecord> {
        let slot = self.slots.get(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.record.as_ref()
    }

    fn get_mut(&mut self, id: AllocatorId) -> Option<&mut AllocatorRecord> {
        let slot = self.slots.get_mut(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.record.as_mut()
    }

    fn records(&self) -> impl Iterator<Item = &AllocatorRecord> {
        self.slots.iter().filter_map(|slot| slot.record.as_ref())
    }

    fn used_size(&self) -> usize {
        self.records().map(AllocatorRecord::used_size).sum()
    }
}

impl MemoryManager {
    /// Creates an empty registry with the given advisory budget in bytes.
    #[must_use]
    pub fn new(application_budget: usize) -> Arc<Self> {
        tracing::info!(
            budget = application_budget,
            "Memory manager initialized with budget {}",
            crate::units::readable(application_budget)
        );

        Arc::new(Self {
            application_budget,
            table: Mutex::new(RegistryTable::default()),
        })
    }

    /// Creates a registry using the configured budget.
    #[must_use]
    pub fn from_config(config: &MemoryConfig) -> Arc<Self> {
        Self::new(config.application_budget)
    }

    /// Adds a record; it contributes to aggregate queries from now on.
    pub fn register(&self, record: AllocatorRecord) -> AllocatorId {
        let mut table = self.table.lock();

        tracing::debug!(allocator = record.name(), kind = %record.kind(), "Registered allocator");

        let id = if let Some(index) = table.free_indices.pop() {
            let slot = &mut table.slots[index as usize];
            slot.record = Some(record);
            AllocatorId::new(index, slot.generation)
        } else {
            debug_assert!(
                table.slots.len() < u32::MAX as usize,
                "Registry table cannot exceed u32::MAX slots"
            );
            #[allow(clippy::cast_possible_truncation)]
            let index = table.slots.len() as u32;
            table.slots.push(RegistrySlot {
                generation: 0,
                record: Some(record),
            });
            AllocatorId::new(index, 0)
        };

        table.live_count += 1;
        id
    }

    /// Removes a record, returning it.
    ///
    /// Unregistering an id that is not (or no longer) registered is a no-op
    /// and returns `None`.
    pub fn unregister(&self, id: AllocatorId) -> Option<AllocatorRecord> {
        let mut table = self.table.lock();

        let slot = table.slots.get_mut(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        let record = slot.record.take()?;
        slot.generation = slot.generation.wrapping_add(1);

        table.free_indices.push(id.index());
        table.live_count -= 1;

        tracing::debug!(allocator = record.name(), "Unregistered allocator");
        Some(record)
    }

    /// Mirrors an allocator's current usage into its registry entry.
    pub(crate) fn sync_usage(&self, id: AllocatorId, used_size: usize, total_size: usize) {
        let mut table = self.table.lock();
        if let Some(record) = table.get_mut(id) {
            record.set_used_size(used_size);
            record.set_total_size(total_size);
        }
    }

    /// Records a new backing reservation of `size` bytes.
    ///
    /// The running total never decreases, not even when allocators are
    /// unregistered: it is a high-water mark of reservations.
    pub fn update_total_size(&self, size: usize) {
        let mut table = self.table.lock();
        table.total_allocated_size = table.total_allocated_size.saturating_add(size);
    }

    /// Sum of used bytes over all registered allocators, computed on each call.
    #[must_use]
    pub fn used_allocated_size(&self) -> usize {
        self.table.lock().used_size()
    }

    /// High-water mark of all backing reservations ever made.
    #[must_use]
    pub fn total_allocated_size(&self) -> usize {
        self.table.lock().total_allocated_size
    }

    /// The configured advisory ceiling. Never enforced here.
    #[inline]
    #[must_use]
    pub const fn application_budget(&self) -> usize {
        self.application_budget
    }

    /// Number of live allocators.
    #[must_use]
    pub fn allocator_count(&self) -> usize {
        self.table.lock().live_count
    }

    /// Snapshot of one registered record.
    #[must_use]
    pub fn record(&self, id: AllocatorId) -> Option<AllocatorRecord> {
        self.table.lock().get(id).cloned()
    }

    /// Snapshot of every registered record, in table order.
    #[must_use]
    pub fn allocators(&self) -> Vec<AllocatorRecord> {
        self.table.lock().records().cloned().collect()
    }

    /// Consistent snapshot of records and aggregates for diagnostics.
    #[must_use]
    pub fn report(&self) -> MemoryReport {
        let table = self.table.lock();
        MemoryReport::new(
            table.records().cloned().collect(),
            table.used_size(),
            table.total_allocated_size,
            self.application_budget,
        )
    }
}
