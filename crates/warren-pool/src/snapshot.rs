//! Snapshots: O(1) immutable captures of a pool's state.
//!
//! A [`Snapshot`] is a frozen view that shares the pool's backing storage
//! through a reference count instead of consuming the pool. Taking one is
//! O(1); the cost is deferred to the pool's *first* structural mutation
//! afterwards, which duplicates the storage before applying itself (see
//! [`Pool::store_mut`](crate::pool::Pool)). From then on the snapshot and
//! the pool have parted ways: the snapshot keeps the captured state
//! forever, the pool is O(1)-mutable again until the next snapshot.
//!
//! Snapshots are cheaply cloneable (clones share the same capture) and
//! the storage is freed when the last holder — snapshot or pool — drops.

use std::fmt;
use std::marker::PhantomData;
use std::ops::Index;
use std::sync::Arc;

use warren_core::{DefaultLayout, Handle, HandleLayout, HandleReader};

use crate::store::SlotStore;
use crate::unchecked;

/// An immutable capture of a pool's state at one instant.
///
/// Created by [`Pool::snapshot`](crate::pool::Pool::snapshot). Reads
/// exactly like a [`Frozen`](crate::frozen::Frozen) pool: fully validated
/// access through [`Snapshot::get`], generation-skipping direct access
/// through `snapshot[handle]`, and the `unsafe` check-free path through
/// [`Snapshot::get_unchecked`].
#[must_use = "a snapshot observes nothing unless it is held"]
pub struct Snapshot<T, L: HandleLayout = DefaultLayout> {
    store: Arc<SlotStore<T>>,
    pool_id: u32,
    _layout: PhantomData<L>,
}

impl<T, L: HandleLayout> Snapshot<T, L> {
    pub(crate) fn new(store: Arc<SlotStore<T>>, pool_id: u32) -> Self {
        Self {
            store,
            pool_id,
            _layout: PhantomData,
        }
    }

    /// Identity of the pool this snapshot was taken from.
    pub fn id(&self) -> u32 {
        self.pool_id
    }

    /// Number of values live at capture time.
    pub fn len(&self) -> usize {
        self.store.live() as usize
    }

    /// Whether the capture holds no live values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fully validated read against the captured state.
    pub fn get(&self, handle: Handle<L>) -> Option<&T> {
        if handle.pool_id() != self.pool_id {
            return None;
        }
        self.store.get(handle.index(), handle.generation())
    }

    /// Whether `handle` was live at capture time.
    pub fn contains(&self, handle: Handle<L>) -> bool {
        self.get(handle).is_some()
    }

    /// Resolve `handle` with no checks at all.
    ///
    /// # Safety
    ///
    /// `handle` must have been live in the source pool at capture time.
    #[allow(unsafe_code)]
    pub unsafe fn get_unchecked(&self, handle: Handle<L>) -> &T {
        debug_assert!(self.contains(handle), "handle is not live in this snapshot");
        // SAFETY: liveness at capture time (caller contract); the capture
        // is immutable.
        unsafe { unchecked::value_unchecked(self.store.slots(), handle.index()) }
    }

    /// Captured `(handle, value)` pairs in ascending slot-index order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle<L>, &T)> + '_ {
        let id = self.pool_id;
        self.store
            .iter_occupied()
            .map(move |(index, generation, value)| {
                (Handle::from_parts(id, index, generation), value)
            })
    }

    /// Captured handles in ascending slot-index order.
    pub fn handles(&self) -> impl Iterator<Item = Handle<L>> + '_ {
        self.iter().map(|(handle, _)| handle)
    }

    /// Whether `self` and `other` share one physical capture (clones do,
    /// until either side's origin pool diverges between them).
    pub fn ptr_eq(&self, other: &Snapshot<T, L>) -> bool {
        Arc::ptr_eq(&self.store, &other.store)
    }

    pub(crate) fn is_backed_by(&self, store: &Arc<SlotStore<T>>) -> bool {
        Arc::ptr_eq(&self.store, store)
    }
}

impl<T, L: HandleLayout> Clone for Snapshot<T, L> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            pool_id: self.pool_id,
            _layout: PhantomData,
        }
    }
}

/// Direct indexing with the generation comparison skipped, as for
/// [`Frozen`](crate::frozen::Frozen): meant for handles live at capture
/// time, panics on vacant slots, reads the current occupant on reused
/// ones.
impl<T, L: HandleLayout> Index<Handle<L>> for Snapshot<T, L> {
    type Output = T;

    fn index(&self, handle: Handle<L>) -> &T {
        debug_assert_eq!(
            handle.pool_id(),
            self.pool_id,
            "foreign handle indexed into a snapshot"
        );
        let slot = self
            .store
            .slots()
            .get(handle.index() as usize)
            .expect("handle index out of range for this snapshot");
        slot.value
            .as_ref()
            .expect("handle was stale at capture time (its slot is vacant)")
    }
}

impl<T, L: HandleLayout> fmt::Debug for Snapshot<T, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("id", &self.pool_id)
            .field("live", &self.len())
            .finish()
    }
}

impl<T, L: HandleLayout> HandleReader<T, L> for Snapshot<T, L> {
    fn read(&self, handle: Handle<L>) -> Option<&T> {
        self.get(handle)
    }
}

// Compile-time check: captures are immutable, so sharing them across
// threads is fine whenever the element type allows it.
const _: fn() = || {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Snapshot<u64>>();
};
