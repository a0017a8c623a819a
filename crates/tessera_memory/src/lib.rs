//! # TESSERA Memory
//!
//! Deterministic allocators for performance-critical engine subsystems:
//! - Fixed-size object pools with transparent block growth
//! - Per-frame scratch stacks with header-based rewind
//! - A shared registry aggregating usage for profilers and editor panels
//!
//! ## Architecture Rules
//!
//! 1. **Explicit context** - Every allocator is created against an
//!    `Arc<MemoryManager>`; there is no hidden global
//! 2. **One owner per allocator** - Pools and stacks are not synchronized;
//!    only the registry takes a lock
//! 3. **Budget is advisory** - Nothing here refuses memory on budget grounds
//!
//! ## Example
//!
//! ```rust,ignore
//! use tessera_memory::{MemoryManager, PoolAllocator, StackAllocator, units::mib};
//!
//! let manager = MemoryManager::new(mib(512));
//!
//! let mut layers: PoolAllocator<Layer> = PoolAllocator::new(&manager, "LayerStack", 8)?;
//! let mut scratch = StackAllocator::new(&manager, "Frame Scratch", mib(4))?;
//!
//! let layer = layers.create(Layer::new("Editor"));
//! let temp = scratch.allocate(4096, 16)?;
//!
//! println!("{}", manager.report());
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod error;
pub mod pool;
pub mod registry;
pub mod stack;
pub mod units;

pub use config::{MemoryConfig, PoolConfig, StackConfig};
pub use error::{MemoryError, MemoryResult};
pub use pool::{PoolAllocator, PoolHandle};
pub use registry::{AllocatorId, AllocatorKind, AllocatorRecord, MemoryManager, MemoryReport};
pub use stack::{AllocationHeader, StackAllocation, StackAllocator, MAX_STACK_SIZE};
