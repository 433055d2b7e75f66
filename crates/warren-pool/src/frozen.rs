//! Frozen pools: structural immutability enforced by ownership.
//!
//! [`Frozen`] consumes a [`Pool`], and with it every `&mut self` method:
//! while the value is frozen, insert/remove/clear/drain do not exist to
//! call, and freezing twice is unrepresentable. No slot can change
//! occupancy or generation for the frozen value's whole lifetime, so a
//! handle that was live at freeze time stays live until [`Frozen::thaw`]
//! hands the pool back.
//!
//! That standstill is what pays for the fast path. `frozen[handle]`
//! indexes storage directly and skips the generation comparison; it is
//! only meaningful for handles that were live at freeze time. A handle
//! that was already stale either hits a vacant slot (panic) or a reused
//! one (reads the slot's current occupant). Both are loud or wrong, never
//! unsound — the truly check-free variant is [`Frozen::get_unchecked`]
//! and carries the `unsafe` contract. The fully validated path remains
//! available as [`Frozen::get`].

use std::fmt;
use std::ops::Index;

use warren_core::{DefaultLayout, Handle, HandleLayout, HandleReader};

use crate::partition::{self, Chunk, PartitionStrategy};
use crate::pool::Pool;
use crate::unchecked;

/// A pool whose structure is frozen for the lifetime of this value.
///
/// Created by [`Pool::freeze`]; destroyed by [`Frozen::thaw`], which
/// returns the pool unchanged.
#[must_use = "freezing consumes the pool; thaw() to get it back"]
pub struct Frozen<T, L: HandleLayout = DefaultLayout> {
    pool: Pool<T, L>,
}

impl<T, L: HandleLayout> Frozen<T, L> {
    pub(crate) fn new(pool: Pool<T, L>) -> Self {
        Self { pool }
    }

    /// Return the pool to its ordinary mutable state.
    pub fn thaw(self) -> Pool<T, L> {
        self.pool
    }

    /// The handle-visible pool identity.
    pub fn id(&self) -> u32 {
        self.pool.id()
    }

    /// Number of live values.
    pub fn len(&self) -> usize {
        self.pool.len()
    }

    /// Whether the pool holds no live values.
    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    /// Fully validated read, identical to [`Pool::get`]. The check-free
    /// paths are [`Index`] and [`Frozen::get_unchecked`].
    pub fn get(&self, handle: Handle<L>) -> Option<&T> {
        self.pool.get(handle)
    }

    /// Whether `handle` was live at freeze time (liveness cannot have
    /// changed since).
    pub fn contains(&self, handle: Handle<L>) -> bool {
        self.pool.contains(handle)
    }

    /// Resolve `handle` with no checks at all.
    ///
    /// # Safety
    ///
    /// `handle` must have been live in this pool at freeze time.
    #[allow(unsafe_code)]
    pub unsafe fn get_unchecked(&self, handle: Handle<L>) -> &T {
        debug_assert!(self.contains(handle), "handle is not live in this pool");
        // SAFETY: liveness at freeze time (caller contract) still holds,
        // as the structure cannot have changed while frozen.
        unsafe { unchecked::value_unchecked(self.pool.store().slots(), handle.index()) }
    }

    /// Live `(handle, value)` pairs in ascending slot-index order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle<L>, &T)> + '_ {
        self.pool.iter()
    }

    /// Live handles in ascending slot-index order.
    pub fn handles(&self) -> impl Iterator<Item = Handle<L>> + '_ {
        self.pool.iter().map(|(handle, _)| handle)
    }

    /// Split the live handles into `parts` read-only chunks
    /// (round-robin) and run `f` on them.
    ///
    /// # Panics
    ///
    /// Panics if `parts == 0`.
    pub fn with_partition<R>(&self, parts: usize, f: impl FnOnce(&[Chunk<'_, T, L>]) -> R) -> R {
        self.with_partition_by(PartitionStrategy::RoundRobin, parts, f)
    }

    /// [`Frozen::with_partition`] with an explicit assignment strategy.
    ///
    /// # Panics
    ///
    /// Panics if `parts == 0`.
    pub fn with_partition_by<R>(
        &self,
        strategy: PartitionStrategy,
        parts: usize,
        f: impl FnOnce(&[Chunk<'_, T, L>]) -> R,
    ) -> R {
        partition::with_partition(&self.pool, strategy, parts, f)
    }
}

/// Direct indexing: the generation comparison is skipped.
///
/// Intended for handles that were live at freeze time; those are
/// guaranteed to resolve to their exact value. A handle that was already
/// stale panics if its slot is vacant and otherwise reads whatever the
/// slot currently holds — use [`Frozen::get`] when staleness is in play.
impl<T, L: HandleLayout> Index<Handle<L>> for Frozen<T, L> {
    type Output = T;

    fn index(&self, handle: Handle<L>) -> &T {
        debug_assert_eq!(
            handle.pool_id(),
            self.pool.id(),
            "foreign handle indexed into a frozen pool"
        );
        let slot = self
            .pool
            .store()
            .slots()
            .get(handle.index() as usize)
            .expect("handle index out of range for this pool");
        slot.value
            .as_ref()
            .expect("handle was stale at freeze time (its slot is vacant)")
    }
}

impl<T, L: HandleLayout> fmt::Debug for Frozen<T, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Frozen").field(&self.pool).finish()
    }
}

impl<T, L: HandleLayout> HandleReader<T, L> for Frozen<T, L> {
    fn read(&self, handle: Handle<L>) -> Option<&T> {
        self.get(handle)
    }
}
