//! Generation-checked slot pools for Warren.
//!
//! Provides [`Pool`], a slot allocator that hands out stable, copyable
//! [`Handle`](warren_core::Handle)s instead of references, plus the view
//! types layered on top of it. This crate is the only one in the workspace
//! that may contain `unsafe` code.
//!
//! # Architecture
//!
//! ```text
//! Pool (façade: identity, capacity policy, copy-on-write choke point)
//! ├── Arc<SlotStore> (slot array + free-list; shared with snapshots)
//! ├── Cursor / Drain (scans tolerating mid-scan removal)
//! ├── Frozen (typestate: mutation statically unavailable, checks skipped)
//! ├── Snapshot (cloneable shared view; pool detaches lazily on mutation)
//! └── Chunk / ChunkMut (disjoint partitions for parallel sweeps)
//! ```
//!
//! # Validity model
//!
//! A slot's generation steps by one on every occupancy transition, so live
//! slots hold even generations and free slots odd ones. A handle resolves
//! only while its pool id and its (even) generation both match; removal
//! makes every outstanding handle to that slot stale forever. A slot that
//! can no longer complete a reuse cycle below the layout's generation
//! ceiling is retired rather than wrapped — stale handles never come back
//! to life.
//!
//! # Safety
//!
//! Safe paths check everything and report misses as `None`. The `unsafe`
//! surface is small: the `*_unchecked` resolution paths on [`Pool`],
//! [`Frozen`], and [`Snapshot`], the raw slot split behind [`ChunkMut`],
//! and the registry's type-checked pointer lookup. Every `unsafe` block
//! carries a `// SAFETY:` comment naming the obligation it discharges;
//! the rest of the crate is `deny(unsafe_code)`.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod cursor;
pub mod frozen;
pub mod partition;
pub mod pool;
pub mod registry;
pub mod snapshot;
mod store;
mod unchecked;

// Public re-exports for the primary API surface.
pub use cursor::{Cursor, Drain};
pub use frozen::Frozen;
pub use partition::{Chunk, ChunkMut, PartitionStrategy};
pub use pool::{Pool, PoolStats};
pub use snapshot::Snapshot;
pub use warren_core::{
    CompactLayout, DefaultLayout, Handle, HandleLayout, HandleReader, HandleWriter, PoolError,
    PoolId,
};
