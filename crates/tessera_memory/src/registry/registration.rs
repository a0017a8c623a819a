//! # Registration Guard
//!
//! Owns an allocator's record and keeps the registry copy in step with it.

use std::sync::Arc;

use super::id::AllocatorId;
use super::manager::MemoryManager;
use super::record::AllocatorRecord;

/// Exclusive owner of one allocator's record.
///
/// Registers on creation, mirrors every usage change, unregisters on drop.
#[derive(Debug)]
pub(crate) struct Registration {
    manager: Arc<MemoryManager>,
    id: AllocatorId,
    record: AllocatorRecord,
}

impl Registration {
    pub(crate) fn new(manager: &Arc<MemoryManager>, record: AllocatorRecord) -> Self {
        let id = manager.register(record.clone());
        Self {
            manager: Arc::clone(manager),
            id,
            record,
        }
    }

    #[inline]
    pub(crate) const fn id(&self) -> AllocatorId {
        self.id
    }

    #[inline]
    pub(crate) const fn record(&self) -> &AllocatorRecord {
        &self.record
    }

    #[inline]
    pub(crate) fn name(&self) -> &str {
        self.record.name()
    }

    /// Sets the used size and publishes it.
    pub(crate) fn set_used(&mut self, used_size: usize) {
        self.record.set_used_size(used_size);
        self.publish();
    }

    /// Accounts for a fresh backing reservation of `size` bytes.
    pub(crate) fn reserve(&mut self, size: usize) {
        let total = self.record.total_size() + size;
        self.record.set_total_size(total);
        self.manager.update_total_size(size);
        self.publish();
    }

    fn publish(&self) {
        self.manager
            .sync_usage(self.id, self.record.used_size(), self.record.total_size());
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.manager.unregister(self.id);
        tracing::info!(
            allocator = self.record.name(),
            "Released {}",
            crate::units::readable(self.record.total_size())
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::AllocatorKind;

    #[test]
    fn test_registration_lifecycle() {
        let manager = MemoryManager::new(0);

        let mut registration = Registration::new(
            &manager,
            AllocatorRecord::new("Guarded", AllocatorKind::Pool, 0),
        );
        assert_eq!(manager.allocator_count(), 1);

        registration.reserve(128);
        registration.set_used(48);

        let mirrored = manager.record(registration.id()).unwrap();
        assert_eq!(mirrored, *registration.record());
        assert_eq!(mirrored.total_size(), 128);
        assert_eq!(mirrored.used_size(), 48);
        assert_eq!(registration.name(), "Guarded");

        drop(registration);
        assert_eq!(manager.allocator_count(), 0);
        assert_eq!(manager.total_allocated_size(), 128);
    }
}
