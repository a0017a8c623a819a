//! # Memory Report
//!
//! Read-only snapshot handed to profilers and editor panels.

use std::fmt;

use super::record::AllocatorRecord;
use crate::units::readable;

/// Snapshot of registry state at one point in time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemoryReport {
    allocators: Vec<AllocatorRecord>,
    used_size: usize,
    total_allocated_size: usize,
    application_budget: usize,
}

impl MemoryReport {
    pub(crate) fn new(
        allocators: Vec<AllocatorRecord>,
        used_size: usize,
        total_allocated_size: usize,
        application_budget: usize,
    ) -> Self {
        Self {
            allocators,
            used_size,
            total_allocated_size,
            application_budget,
        }
    }

    /// Records of every allocator live at snapshot time.
    #[inline]
    #[must_use]
    pub fn allocators(&self) -> &[AllocatorRecord] {
        &self.allocators
    }

    /// Sum of used bytes at snapshot time.
    #[inline]
    #[must_use]
    pub const fn used_size(&self) -> usize {
        self.used_size
    }

    /// Reservation high-water mark at snapshot time.
    #[inline]
    #[must_use]
    pub const fn total_allocated_size(&self) -> usize {
        self.total_allocated_size
    }

    /// Configured advisory budget.
    #[inline]
    #[must_use]
    pub const fn application_budget(&self) -> usize {
        self.application_budget
    }

    /// Whether reservations have gone past the budget.
    #[inline]
    #[must_use]
    pub const fn is_over_budget(&self) -> bool {
        self.total_allocated_size > self.application_budget
    }

    /// Reservations as a percentage of the budget (0 when no budget is set).
    #[must_use]
    pub fn budget_usage_percent(&self) -> f64 {
        if self.application_budget == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let ratio = self.total_allocated_size as f64 / self.application_budget as f64;
        ratio * 100.0
    }
}

impl fmt::Display for MemoryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<32} {:>6} {:>12} {:>12}",
            "allocator", "kind", "used", "reserved"
        )?;
        for record in &self.allocators {
            writeln!(
                f,
                "{:<32} {:>6} {:>12} {:>12}",
                record.name(),
                record.kind().to_string(),
                readable(record.used_size()),
                readable(record.total_size()),
            )?;
        }
        writeln!(
            f,
            "used {} / reserved {} / budget {} ({:.1}%)",
            readable(self.used_size),
            readable(self.total_allocated_size),
            readable(self.application_budget),
            self.budget_usage_percent(),
        )
    }
}
