//! The pool façade: identity, capacity policy, and the copy-on-write
//! choke point.
//!
//! [`Pool`] wraps a [`SlotStore`] with the two things the store does not
//! know about: *whose* handles it resolves (the pool identity packed into
//! every handle) and *when* allocation must be refused (the capacity
//! policy and the handle layout's index space).
//!
//! Storage sits behind an `Arc` so snapshots can share it. A pool that
//! has never been snapshotted always holds the unique reference and every
//! mutation goes straight through; after a snapshot, the first operation
//! that would change anything observable clones the storage once
//! ([`Pool::store_mut`]) and the snapshot keeps the pre-mutation image.
//! Reads never copy, and neither do mutations that miss (a stale-handle
//! `remove` is a no-op).

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use warren_core::{
    DefaultLayout, Handle, HandleLayout, HandleReader, HandleWriter, PoolError, PoolId,
};

use crate::cursor::{Cursor, Drain};
use crate::frozen::Frozen;
use crate::partition::{self, Chunk, ChunkMut, PartitionStrategy};
use crate::snapshot::Snapshot;
use crate::store::SlotStore;
use crate::unchecked;

/// Monomorphized storage cloner, stashed by [`Pool::snapshot`] so the
/// detach path can run without a `T: Clone` bound of its own.
fn clone_store<T: Clone>(store: &SlotStore<T>) -> SlotStore<T> {
    store.clone()
}

/// A generation-checked slot pool.
///
/// Values are inserted for a [`Handle`] — a stable, copyable name that
/// outlives any internal reallocation and goes permanently stale when the
/// value is removed. All safe access re-validates the handle (pool
/// identity, slot generation, occupancy) and reports misses as `None`.
///
/// `L` fixes the packed handle layout; the default is 32 bits for each of
/// pool id, index, and generation. Capacity policy is per pool:
/// [`Pool::new`] grows without bound (within the layout's index space),
/// [`Pool::with_capacity`] rejects inserts past a fixed live count.
pub struct Pool<T, L: HandleLayout = DefaultLayout> {
    store: Arc<SlotStore<T>>,
    /// Handle-visible identity: a fresh [`PoolId`] truncated to the
    /// layout's pool-id width.
    id: u32,
    /// Configured bound on the live count; `None` = unbounded.
    capacity: Option<usize>,
    /// Set once the first snapshot is taken; used to detach shared storage.
    clone_store: Option<fn(&SlotStore<T>) -> SlotStore<T>>,
    _layout: PhantomData<L>,
}

impl<T, L: HandleLayout> Pool<T, L> {
    /// An empty, unbounded pool.
    pub fn new() -> Self {
        let () = L::VALID;
        Self {
            store: Arc::new(SlotStore::new(L::MAX_GENERATION)),
            id: PoolId::next().truncate(L::POOL_ID_BITS),
            capacity: None,
            clone_store: None,
            _layout: PhantomData,
        }
    }

    /// An empty pool bounded to `n` live values, pre-reserved.
    ///
    /// # Panics
    ///
    /// Panics if `n` exceeds the layout's index space
    /// ([`Pool::max_slots`]).
    pub fn with_capacity(n: usize) -> Self {
        let () = L::VALID;
        assert!(
            n <= Self::max_slots(),
            "capacity {n} exceeds the layout's index space ({} slots)",
            Self::max_slots()
        );
        Self {
            store: Arc::new(SlotStore::with_slot_capacity(L::MAX_GENERATION, n)),
            id: PoolId::next().truncate(L::POOL_ID_BITS),
            capacity: Some(n),
            clone_store: None,
            _layout: PhantomData,
        }
    }

    /// Total slots the handle layout can address. Live, free, and retired
    /// slots all count toward it.
    pub fn max_slots() -> usize {
        (L::MAX_INDEX as usize).saturating_add(1)
    }

    /// The handle-visible pool identity.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Number of live values.
    pub fn len(&self) -> usize {
        self.store.live() as usize
    }

    /// Whether the pool holds no live values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The configured bound on live values; `None` for unbounded pools.
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Inserts still accepted before the bound; `None` for unbounded pools.
    pub fn remaining(&self) -> Option<usize> {
        self.capacity.map(|cap| cap.saturating_sub(self.len()))
    }

    /// Occupancy counters for diagnostics.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            slots: self.store.slot_count(),
            live: self.len(),
            free: self.store.free_count(),
            retired: self.store.retired_count() as usize,
            shared: Arc::strong_count(&self.store) > 1,
        }
    }

    /// Insert `value` and return its handle.
    ///
    /// Reuses the most recently freed slot when one exists, else grows.
    /// Fails — leaving the pool untouched — when a bounded pool is at
    /// capacity or when growth would step outside the layout's index
    /// space.
    pub fn insert(&mut self, value: T) -> Result<Handle<L>, PoolError> {
        if let Some(cap) = self.capacity {
            if self.len() >= cap {
                return Err(PoolError::CapacityExhausted { capacity: cap });
            }
        }
        if self.store.will_grow() && self.store.slot_count() >= Self::max_slots() {
            return Err(PoolError::IndexSpaceExhausted {
                max_slots: Self::max_slots(),
            });
        }
        let (index, generation) = self.store_mut().allocate(value);
        Ok(Handle::from_parts(self.id, index, generation))
    }

    /// Remove the value `handle` names and return it.
    ///
    /// Idempotent: a stale or foreign handle returns `None` and changes
    /// nothing. Removal steps the slot's generation, so every copy of the
    /// handle is stale from here on.
    pub fn remove(&mut self, handle: Handle<L>) -> Option<T> {
        // Validity is checked before detaching so a missed remove on
        // shared storage stays copy-free.
        if !self.contains(handle) {
            return None;
        }
        self.store_mut().remove(handle.index(), handle.generation())
    }

    /// Resolve `handle` to a shared borrow of its value.
    pub fn get(&self, handle: Handle<L>) -> Option<&T> {
        if handle.pool_id() != self.id {
            return None;
        }
        self.store.get(handle.index(), handle.generation())
    }

    /// Resolve `handle` to a mutable borrow of its value.
    pub fn get_mut(&mut self, handle: Handle<L>) -> Option<&mut T> {
        if !self.contains(handle) {
            return None;
        }
        self.store_mut().get_mut(handle.index(), handle.generation())
    }

    /// Copy the value out (for cheaply copyable `T`).
    pub fn copied(&self, handle: Handle<L>) -> Option<T>
    where
        T: Copy,
    {
        self.get(handle).copied()
    }

    /// Run `f` on the value `handle` names, if live.
    pub fn with<R>(&self, handle: Handle<L>, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.get(handle).map(f)
    }

    /// Run `f` on the value `handle` names with mutable access, if live.
    pub fn with_mut<R>(&mut self, handle: Handle<L>, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        self.get_mut(handle).map(f)
    }

    /// Resolve `handle` without identity, generation, or occupancy checks.
    ///
    /// # Safety
    ///
    /// `handle` must be live in this pool (i.e. [`Pool::contains`] would
    /// return `true`). Anything else is undefined behavior.
    #[allow(unsafe_code)]
    pub unsafe fn get_unchecked(&self, handle: Handle<L>) -> &T {
        debug_assert!(self.contains(handle), "handle is not live in this pool");
        // SAFETY: liveness (caller contract) implies the index is in range
        // and the slot occupied.
        unsafe { unchecked::value_unchecked(self.store.slots(), handle.index()) }
    }

    /// Mutable variant of [`Pool::get_unchecked`]. Detaches shared
    /// storage first, so snapshot isolation survives the fast path.
    ///
    /// # Safety
    ///
    /// Same contract as [`Pool::get_unchecked`].
    #[allow(unsafe_code)]
    pub unsafe fn get_unchecked_mut(&mut self, handle: Handle<L>) -> &mut T {
        debug_assert!(self.contains(handle), "handle is not live in this pool");
        let store = self.store_mut();
        // SAFETY: liveness (caller contract) implies the index is in range
        // and the slot occupied.
        unsafe { unchecked::value_unchecked_mut(store.slots_mut(), handle.index()) }
    }

    /// Whether `handle` currently resolves here. This is the weak-handle
    /// check: liveness is recomputed on every call, never cached.
    pub fn contains(&self, handle: Handle<L>) -> bool {
        handle.pool_id() == self.id
            && self
                .store
                .get(handle.index(), handle.generation())
                .is_some()
    }

    /// Remove every live value. All outstanding handles go stale; slot
    /// generations step exactly as individual removes would.
    pub fn clear(&mut self) {
        if self.is_empty() {
            return;
        }
        self.store_mut().clear();
    }

    /// Live `(handle, value)` pairs in ascending slot-index order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle<L>, &T)> + '_ {
        let id = self.id;
        self.store
            .iter_occupied()
            .map(move |(index, generation, value)| {
                (Handle::from_parts(id, index, generation), value)
            })
    }

    /// Mutable variant of [`Pool::iter`].
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Handle<L>, &mut T)> + '_ {
        let id = self.id;
        self.store_mut()
            .iter_occupied_mut()
            .map(move |(index, generation, value)| {
                (Handle::from_parts(id, index, generation), value)
            })
    }

    /// A scan that tolerates mutation: yields each live handle once and
    /// permits removal (of the current element or any other) and
    /// insertion while it runs. See [`Cursor`].
    pub fn cursor(&mut self) -> Cursor<'_, T, L> {
        Cursor::new(self)
    }

    /// A consuming scan: yields `(handle, value)` and empties each
    /// visited slot; dropping it early empties the rest. See [`Drain`].
    pub fn drain(&mut self) -> Drain<'_, T, L> {
        Drain::new(self)
    }

    /// Freeze the pool: structural mutation becomes statically
    /// unavailable and reads skip the generation check. [`Frozen::thaw`]
    /// gives the pool back.
    pub fn freeze(self) -> Frozen<T, L> {
        Frozen::new(self)
    }

    /// Take an O(1) immutable snapshot sharing this pool's storage.
    ///
    /// The pool remains fully usable; its first subsequent mutation
    /// copies the storage once so the snapshot (and its clones) keep
    /// observing exactly the state captured here.
    pub fn snapshot(&mut self) -> Snapshot<T, L>
    where
        T: Clone,
    {
        self.clone_store = Some(clone_store::<T>);
        Snapshot::new(Arc::clone(&self.store), self.id)
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

    /// [`Pool::with_partition`] with an explicit assignment strategy.
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
        partition::with_partition(self, strategy, parts, f)
    }

    /// Split the live handles into `parts` disjoint read-write chunks
    /// (round-robin) and run `f` on them.
    ///
    /// Chunks may move to other threads (`Send`); each grants exclusive
    /// mutable access to its own slots' values and nothing structural, so
    /// however `f` exits — normally or by panic — the pool is intact and
    /// reunified.
    ///
    /// # Panics
    ///
    /// Panics if `parts == 0`.
    pub fn with_partition_mut<R>(
        &mut self,
        parts: usize,
        f: impl FnOnce(&mut [ChunkMut<'_, T, L>]) -> R,
    ) -> R {
        self.with_partition_by_mut(PartitionStrategy::RoundRobin, parts, f)
    }

    /// [`Pool::with_partition_mut`] with an explicit assignment strategy.
    ///
    /// # Panics
    ///
    /// Panics if `parts == 0`.
    pub fn with_partition_by_mut<R>(
        &mut self,
        strategy: PartitionStrategy,
        parts: usize,
        f: impl FnOnce(&mut [ChunkMut<'_, T, L>]) -> R,
    ) -> R {
        partition::with_partition_mut(self, strategy, parts, f)
    }

    /// Read access to the store for sibling modules.
    pub(crate) fn store(&self) -> &SlotStore<T> {
        &self.store
    }

    /// The mutation choke point: every write path funnels through here.
    ///
    /// If the storage is shared with snapshots, detach by cloning it once
    /// (the copy-on-write of [`Pool::snapshot`]); afterwards the `Arc` is
    /// unique again and mutation is O(1) until the next snapshot.
    pub(crate) fn store_mut(&mut self) -> &mut SlotStore<T> {
        if Arc::get_mut(&mut self.store).is_none() {
            let cloner = self
                .clone_store
                .expect("storage can only be shared by snapshot(), which stashes the cloner");
            self.store = Arc::new(cloner(&self.store));
        }
        Arc::get_mut(&mut self.store).expect("storage is uniquely owned after detach")
    }

    /// Whether this pool still shares storage with `snapshot`.
    pub fn shares_storage_with(&self, snapshot: &Snapshot<T, L>) -> bool {
        snapshot.is_backed_by(&self.store)
    }
}

impl<T, L: HandleLayout> Default for Pool<T, L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, L: HandleLayout> fmt::Debug for Pool<T, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("id", &self.id)
            .field("live", &self.len())
            .field("slots", &self.store.slot_count())
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl<T, L: HandleLayout> HandleReader<T, L> for Pool<T, L> {
    fn read(&self, handle: Handle<L>) -> Option<&T> {
        self.get(handle)
    }
}

impl<T, L: HandleLayout> HandleWriter<T, L> for Pool<T, L> {
    fn write(&mut self, handle: Handle<L>) -> Option<&mut T> {
        self.get_mut(handle)
    }
}

// Compile-time check: pools move between threads like the values they hold.
const _: fn() = || {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Pool<u64>>();
};

/// Occupancy counters reported by [`Pool::stats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Total slots backing the pool (live + free + retired).
    pub slots: usize,
    /// Slots currently holding a value.
    pub live: usize,
    /// Slots available for reuse.
    pub free: usize,
    /// Slots permanently withdrawn after generation saturation.
    pub retired: usize,
    /// Whether storage is currently shared with at least one snapshot.
    pub shared: bool,
}
