//! # Allocator Registry
//!
//! Tracks every live allocator and aggregate memory usage.
//!
//! ```text
//!   PoolAllocator ──┐                       ┌── used_allocated_size()
//!                   ├── Registration ──▶ MemoryManager ──┼── total_allocated_size()
//!   StackAllocator ─┘   (owns record)      (Mutex table)  └── report()
//! ```
//!
//! Each allocator exclusively owns its [`AllocatorRecord`]; the manager keeps
//! a mirrored copy keyed by [`AllocatorId`] and drops it on unregistration.

mod id;
mod manager;
mod record;
mod registration;
mod report;

pub use id::AllocatorId;
pub use manager::MemoryManager;
pub use record::{AllocatorKind, AllocatorRecord};
pub use report::MemoryReport;

pub(crate) use registration::Registration;
