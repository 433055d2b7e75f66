//! Warren: generation-checked handle pools.
//!
//! This is the top-level facade crate that re-exports the public API from
//! the Warren sub-crates. For most users, adding `warren` as a single
//! dependency is sufficient.
//!
//! A [`prelude::Pool`] stores values in stable slots and hands back
//! [`prelude::Handle`]s — plain packed integers carrying a pool id, a
//! slot index, and a generation stamp. Handles copy freely, survive pool
//! growth, and detect their own staleness: once the value is removed,
//! every copy of its handle misses forever, even after the slot is
//! reused.
//!
//! # Quick start
//!
//! ```rust
//! use warren::prelude::*;
//!
//! // A pool of entities addressed by copyable handles.
//! let mut pool: Pool<&str> = Pool::new();
//! let hero = pool.insert("hero").unwrap();
//! let troll = pool.insert("troll").unwrap();
//!
//! // Handles survive other removals and pool growth...
//! pool.remove(troll);
//! assert_eq!(pool.get(hero), Some(&"hero"));
//!
//! // ...and go permanently stale once their own element is gone, even
//! // when the slot is reused for something else.
//! let imp = pool.insert("imp").unwrap();
//! assert_eq!(imp.index(), troll.index());
//! assert_eq!(pool.get(troll), None);
//!
//! // O(1) snapshots keep observing a fixed state while the pool moves on.
//! let before = pool.snapshot();
//! pool.remove(hero);
//! assert_eq!(before.get(hero), Some(&"hero"));
//! assert_eq!(pool.get(hero), None);
//!
//! // Disjoint partitions hand exclusive mutable chunks to workers.
//! let mut scores: Pool<u32> = Pool::new();
//! for i in 0..5 {
//!     scores.insert(i).unwrap();
//! }
//! scores.with_partition_mut(2, |chunks| {
//!     for chunk in chunks.iter_mut() {
//!         for (_, score) in chunk.iter_mut() {
//!             *score *= 10;
//!         }
//!     }
//! });
//! assert_eq!(scores.iter().map(|(_, s)| *s).sum::<u32>(), 100);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the
//! prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`pool`] | `warren-pool` | `Pool`, cursors, frozen views, snapshots, partitions, the ambient registry |
//! | [`types`] | `warren-core` | Handles, handle layouts, pool ids, errors, access traits |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Pools and the views layered over them (`warren-pool`).
///
/// Most users only need [`pool::Pool`] and the view types from this
/// module — they are also available in the [`prelude`]. The ambient
/// [`pool::registry`] is only reachable here.
pub use warren_pool as pool;

/// Handles, layouts, ids, and core traits (`warren-core`).
///
/// Contains [`types::Handle`], the [`types::HandleLayout`] width
/// configuration, [`types::PoolId`], [`types::PoolError`], and the
/// [`types::HandleReader`]/[`types::HandleWriter`] access traits.
pub use warren_core as types;

/// Common imports for typical Warren usage.
///
/// ```rust
/// use warren::prelude::*;
/// ```
///
/// This imports the pool, its view types, handles and layouts, and the
/// access traits.
pub mod prelude {
    // Pool and views
    pub use warren_pool::{Chunk, ChunkMut, Cursor, Drain, Frozen, Pool, PoolStats, Snapshot};

    // Partition strategy selection
    pub use warren_pool::PartitionStrategy;

    // Handles and layouts
    pub use warren_core::{CompactLayout, DefaultLayout, Handle, HandleLayout, PoolId};

    // Errors and access traits
    pub use warren_core::{HandleReader, HandleWriter, PoolError};
}
