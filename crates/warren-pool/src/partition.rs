//! Partitioning: splitting a pool's live handles into disjoint chunks.
//!
//! ```text
//!   occupied indices   0   2   3   5   6      (ascending scan)
//!                      │   │   │   │   │
//!   round-robin, n=2   A   B   A   B   A   →  A = {0, 3, 6}
//!                                              B = {2, 5}
//!   contiguous,  n=2   A   A   A   B   B   →  A = {0, 2, 3}
//!                                              B = {5, 6}
//! ```
//!
//! Disjointness is established once, at construction: every occupied
//! index is assigned to exactly one chunk, so no two chunks can ever name
//! the same slot. That single proof is what lets a [`ChunkMut`] hand out
//! `&mut` borrows with no locking and no per-access occupancy checks —
//! workers on separate threads touch separate slots by construction.
//!
//! Both entry points are scoped: they build the chunks, run the caller's
//! closure, and give the borrow back when it returns *or unwinds*. Chunks
//! hold index lists and borrows, never structural state, so a panicking
//! worker cannot strand the free-list or leak an element; the pool is
//! whole again as soon as the scope exits.

use std::marker::PhantomData;

use smallvec::{smallvec, SmallVec};

use warren_core::{DefaultLayout, Handle, HandleLayout, HandleReader, HandleWriter};

use crate::pool::Pool;
use crate::store::Slot;
use crate::unchecked::RawSlots;

/// How live handles are assigned to chunks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PartitionStrategy {
    /// The k-th live handle (in ascending slot order) goes to chunk
    /// `k % parts`. Balances load when element cost varies with age.
    RoundRobin,
    /// Ascending runs of near-equal length, one per chunk. Keeps each
    /// chunk's slots adjacent in memory.
    Contiguous,
}

/// Inline space for chunk collections; partitions wider than this spill.
type ChunkVec<C> = SmallVec<[C; 8]>;

/// `(index, generation)` of one live slot, captured at partition time.
type Entry = (u32, u32);

fn assign(occupied: &[Entry], strategy: PartitionStrategy, parts: usize) -> ChunkVec<Vec<Entry>> {
    let mut sets: ChunkVec<Vec<Entry>> = smallvec![Vec::new(); parts];
    match strategy {
        PartitionStrategy::RoundRobin => {
            for (k, &entry) in occupied.iter().enumerate() {
                sets[k % parts].push(entry);
            }
        }
        PartitionStrategy::Contiguous => {
            let base = occupied.len() / parts;
            let extra = occupied.len() % parts;
            let mut start = 0;
            for (k, set) in sets.iter_mut().enumerate() {
                let take = base + usize::from(k < extra);
                set.extend_from_slice(&occupied[start..start + take]);
                start += take;
            }
        }
    }
    sets
}

pub(crate) fn with_partition<T, L: HandleLayout, R>(
    pool: &Pool<T, L>,
    strategy: PartitionStrategy,
    parts: usize,
    f: impl FnOnce(&[Chunk<'_, T, L>]) -> R,
) -> R {
    assert!(parts > 0, "cannot partition a pool into zero chunks");
    let occupied: Vec<Entry> = pool
        .store()
        .iter_occupied()
        .map(|(index, generation, _)| (index, generation))
        .collect();
    let slots = pool.store().slots();
    let pool_id = pool.id();
    let chunks: ChunkVec<Chunk<'_, T, L>> = assign(&occupied, strategy, parts)
        .into_iter()
        .map(|entries| Chunk {
            slots,
            entries,
            pool_id,
            _layout: PhantomData,
        })
        .collect();
    f(&chunks)
}

pub(crate) fn with_partition_mut<T, L: HandleLayout, R>(
    pool: &mut Pool<T, L>,
    strategy: PartitionStrategy,
    parts: usize,
    f: impl FnOnce(&mut [ChunkMut<'_, T, L>]) -> R,
) -> R {
    assert!(parts > 0, "cannot partition a pool into zero chunks");
    let pool_id = pool.id();
    // Mutable chunks are a write path: detach from any snapshot first.
    let store = pool.store_mut();
    let occupied: Vec<Entry> = store
        .iter_occupied()
        .map(|(index, generation, _)| (index, generation))
        .collect();
    let raw = RawSlots::new(store.slots_mut());
    let mut chunks: ChunkVec<ChunkMut<'_, T, L>> = assign(&occupied, strategy, parts)
        .into_iter()
        .map(|entries| ChunkMut {
            raw,
            entries,
            pool_id,
            _layout: PhantomData,
        })
        .collect();
    f(&mut chunks)
}

/// A read-only chunk of a partitioned pool.
///
/// Iteration covers exactly the handles assigned to this chunk, with no
/// per-access validity checks (the occupied list was computed at
/// partition time and nothing can change while the pool is borrowed).
/// [`Chunk::get`] is not so restricted: reads alias freely, so any live
/// handle of the pool resolves through any of its chunks.
pub struct Chunk<'a, T, L: HandleLayout = DefaultLayout> {
    slots: &'a [Slot<T>],
    entries: Vec<Entry>,
    pool_id: u32,
    _layout: PhantomData<L>,
}

impl<'a, T, L: HandleLayout> Chunk<'a, T, L> {
    /// Number of handles assigned to this chunk.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the chunk was assigned no handles.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// This chunk's handles in ascending slot order.
    pub fn handles(&self) -> impl Iterator<Item = Handle<L>> + '_ {
        let id = self.pool_id;
        self.entries
            .iter()
            .map(move |&(index, generation)| Handle::from_parts(id, index, generation))
    }

    /// This chunk's `(handle, value)` pairs in ascending slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle<L>, &'a T)> + '_ {
        let slots = self.slots;
        let id = self.pool_id;
        self.entries.iter().map(move |&(index, generation)| {
            let value = slots[index as usize]
                .value
                .as_ref()
                .expect("chunk entries reference slots occupied at partition time");
            (Handle::from_parts(id, index, generation), value)
        })
    }

    /// Checked read against the whole pool, not just this chunk.
    pub fn get(&self, handle: Handle<L>) -> Option<&'a T> {
        if handle.pool_id() != self.pool_id {
            return None;
        }
        let slot = self.slots.get(handle.index() as usize)?;
        if slot.generation != handle.generation() {
            return None;
        }
        slot.value.as_ref()
    }
}

impl<T, L: HandleLayout> HandleReader<T, L> for Chunk<'_, T, L> {
    fn read(&self, handle: Handle<L>) -> Option<&T> {
        self.get(handle)
    }
}

/// A read-write chunk of a partitioned pool.
///
/// Grants exclusive mutable access to the values of its own slots and
/// nothing else: [`ChunkMut::get_mut`] refuses handles assigned to other
/// chunks, because those slots may be under mutation on another thread.
/// Chunks are `Send` (hand one to each worker) but deliberately not
/// `Sync` — a single chunk must never be shared.
///
/// Structural operations do not exist here. A chunk cannot insert,
/// remove, or retire anything, which is why reunification after the
/// partition scope needs no work at all, even when a worker panics.
pub struct ChunkMut<'a, T, L: HandleLayout = DefaultLayout> {
    raw: RawSlots<'a, T>,
    entries: Vec<Entry>,
    pool_id: u32,
    _layout: PhantomData<L>,
}

impl<'a, T, L: HandleLayout> ChunkMut<'a, T, L> {
    /// Number of handles assigned to this chunk.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the chunk was assigned no handles.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// This chunk's handles in ascending slot order.
    pub fn handles(&self) -> impl Iterator<Item = Handle<L>> + '_ {
        let id = self.pool_id;
        self.entries
            .iter()
            .map(move |&(index, generation)| Handle::from_parts(id, index, generation))
    }

    /// This chunk's `(handle, value)` pairs with mutable access, in
    /// ascending slot order.
    #[allow(unsafe_code)]
    pub fn iter_mut<'s>(&'s mut self) -> impl Iterator<Item = (Handle<L>, &'s mut T)> + 's {
        let raw = self.raw;
        let id = self.pool_id;
        self.entries.iter().map(move |&(index, generation)| {
            // SAFETY: partition construction assigned `index` to this chunk
            // alone; the `&mut self` borrow keeps this pass exclusive, and
            // each entry appears once, so no two yielded borrows alias.
            let (_, value) = unsafe { raw.slot_parts_mut(index) };
            (Handle::from_parts(id, index, generation), value)
        })
    }

    /// Position of `handle` in this chunk's entry list, fully validated.
    fn position(&self, handle: Handle<L>) -> Option<usize> {
        if handle.pool_id() != self.pool_id {
            return None;
        }
        let at = self
            .entries
            .binary_search_by_key(&handle.index(), |&(index, _)| index)
            .ok()?;
        (self.entries[at].1 == handle.generation()).then_some(at)
    }

    /// Whether `handle` belongs to this chunk.
    pub fn contains(&self, handle: Handle<L>) -> bool {
        self.position(handle).is_some()
    }

    /// Checked read of one of *this chunk's* values.
    ///
    /// Returns `None` for handles assigned to other chunks — their slots
    /// may be under mutation elsewhere, so even reads must stay home.
    #[allow(unsafe_code)]
    pub fn get(&self, handle: Handle<L>) -> Option<&T> {
        let at = self.position(handle)?;
        // SAFETY: membership proves the slot is this chunk's and occupied;
        // `&self` forbids a live `&mut` from this chunk.
        let (_, value) = unsafe { self.raw.slot_parts(self.entries[at].0) };
        Some(value)
    }

    /// Checked mutable access to one of this chunk's values.
    #[allow(unsafe_code)]
    pub fn get_mut(&mut self, handle: Handle<L>) -> Option<&mut T> {
        let at = self.position(handle)?;
        // SAFETY: membership proves the slot is this chunk's and occupied;
        // `&mut self` makes this the only live borrow from this chunk.
        let (_, value) = unsafe { self.raw.slot_parts_mut(self.entries[at].0) };
        Some(value)
    }
}

impl<T, L: HandleLayout> HandleReader<T, L> for ChunkMut<'_, T, L> {
    fn read(&self, handle: Handle<L>) -> Option<&T> {
        self.get(handle)
    }
}

impl<T, L: HandleLayout> HandleWriter<T, L> for ChunkMut<'_, T, L> {
    fn write(&mut self, handle: Handle<L>) -> Option<&mut T> {
        self.get_mut(handle)
    }
}

// Compile-time checks: read chunks are shareable, write chunks only move.
const _: fn() = || {
    fn assert_send_sync<C: Send + Sync>() {}
    fn assert_send<C: Send>() {}
    assert_send_sync::<Chunk<'static, u64>>();
    assert_send::<ChunkMut<'static, u64>>();
};

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(n: u32) -> Pool<u32> {
        let mut pool = Pool::new();
        for i in 0..n {
            pool.insert(i).unwrap();
        }
        pool
    }

    fn sizes(sets: &[Vec<Entry>]) -> Vec<usize> {
        sets.iter().map(Vec::len).collect()
    }

    #[test]
    fn round_robin_interleaves_entries() {
        let occupied: Vec<Entry> = (0..5).map(|i| (i, 0)).collect();
        let sets = assign(&occupied, PartitionStrategy::RoundRobin, 2);
        assert_eq!(sizes(&sets), vec![3, 2]);
        assert_eq!(sets[0], vec![(0, 0), (2, 0), (4, 0)]);
        assert_eq!(sets[1], vec![(1, 0), (3, 0)]);
    }

    #[test]
    fn contiguous_splits_into_balanced_runs() {
        let occupied: Vec<Entry> = (0..7).map(|i| (i, 0)).collect();
        let sets = assign(&occupied, PartitionStrategy::Contiguous, 3);
        assert_eq!(sizes(&sets), vec![3, 2, 2]);
        assert_eq!(sets[0], vec![(0, 0), (1, 0), (2, 0)]);
        assert_eq!(sets[1], vec![(3, 0), (4, 0)]);
        assert_eq!(sets[2], vec![(5, 0), (6, 0)]);
    }

    #[test]
    fn surplus_parts_come_back_empty() {
        let occupied: Vec<Entry> = vec![(0, 0), (1, 0)];
        for strategy in [PartitionStrategy::RoundRobin, PartitionStrategy::Contiguous] {
            let sets = assign(&occupied, strategy, 5);
            assert_eq!(sets.len(), 5);
            assert_eq!(sets.iter().map(Vec::len).sum::<usize>(), 2);
            assert_eq!(sets.iter().filter(|s| s.is_empty()).count(), 3);
        }
    }

    #[test]
    fn assignment_keeps_entries_ascending() {
        let occupied: Vec<Entry> = (0..20).map(|i| (i * 3, 0)).collect();
        for strategy in [PartitionStrategy::RoundRobin, PartitionStrategy::Contiguous] {
            for set in assign(&occupied, strategy, 3) {
                assert!(set.windows(2).all(|w| w[0].0 < w[1].0));
            }
        }
    }

    #[test]
    #[should_panic(expected = "zero chunks")]
    fn zero_way_read_partition_panics() {
        let pool = filled(3);
        pool.with_partition(0, |_| ());
    }

    #[test]
    #[should_panic(expected = "zero chunks")]
    fn zero_way_write_partition_panics() {
        let mut pool = filled(3);
        pool.with_partition_mut(0, |_| ());
    }

    #[test]
    fn read_chunks_cover_every_handle_once() {
        let pool = filled(5);
        let expected: Vec<_> = pool.iter().map(|(h, _)| h).collect();
        pool.with_partition(2, |chunks| {
            assert_eq!(chunks.len(), 2);
            let mut seen: Vec<_> = chunks.iter().flat_map(|c| c.handles()).collect();
            assert_eq!(seen.len(), 5);
            seen.sort();
            assert_eq!(seen, expected);
        });
    }

    #[test]
    fn read_chunk_values_match_the_pool() {
        let pool = filled(6);
        pool.with_partition_by(PartitionStrategy::Contiguous, 3, |chunks| {
            for chunk in chunks {
                for (handle, value) in chunk.iter() {
                    assert_eq!(pool.get(handle), Some(value));
                }
            }
        });
    }

    #[test]
    fn read_chunk_get_reaches_the_whole_pool() {
        let pool = filled(4);
        let all: Vec<_> = pool.iter().map(|(h, _)| h).collect();
        pool.with_partition(2, |chunks| {
            for h in &all {
                assert!(chunks[0].get(*h).is_some());
                assert!(chunks[1].get(*h).is_some());
            }
        });
    }

    #[test]
    fn write_chunks_stay_on_their_own_slots() {
        let mut pool = filled(5);
        let all: Vec<_> = pool.iter().map(|(h, _)| h).collect();
        pool.with_partition_mut(2, |chunks| {
            for h in &all {
                let owners = chunks.iter().filter(|c| c.contains(*h)).count();
                assert_eq!(owners, 1, "each handle belongs to exactly one chunk");
            }
            let (a, b) = chunks.split_at_mut(1);
            for h in &all {
                let in_a = a[0].get_mut(*h).is_some();
                let in_b = b[0].get_mut(*h).is_some();
                assert!(in_a != in_b, "get_mut must refuse foreign-chunk handles");
            }
        });
    }

    #[test]
    fn writes_through_chunks_land_in_the_pool() {
        let mut pool = filled(6);
        pool.with_partition_mut(3, |chunks| {
            for chunk in chunks.iter_mut() {
                for (_, value) in chunk.iter_mut() {
                    *value += 100;
                }
            }
        });
        for (_, value) in pool.iter() {
            assert!(*value >= 100);
        }
        assert_eq!(pool.iter().map(|(_, v)| *v).sum::<u32>(), 615);
    }

    #[test]
    fn stale_handles_miss_inside_chunks() {
        let mut pool = filled(3);
        let doomed = pool.iter().map(|(h, _)| h).next().unwrap();
        pool.remove(doomed);
        pool.with_partition_mut(2, |chunks| {
            for chunk in chunks.iter_mut() {
                assert_eq!(chunk.get_mut(doomed), None);
                assert!(!chunk.contains(doomed));
            }
        });
    }

    #[test]
    fn empty_pool_partitions_into_empty_chunks() {
        let mut pool: Pool<u32> = Pool::new();
        pool.with_partition_mut(4, |chunks| {
            assert_eq!(chunks.len(), 4);
            assert!(chunks.iter().all(|c| c.is_empty()));
        });
    }

    #[test]
    fn chunk_traits_resolve_generically() {
        fn sum_via<R: HandleReader<u32, DefaultLayout>>(r: &R, hs: &[Handle]) -> u32 {
            hs.iter().filter_map(|h| r.read(*h)).sum()
        }
        let mut pool = filled(4);
        pool.with_partition_mut(1, |chunks| {
            let hs: Vec<_> = chunks[0].handles().collect();
            assert_eq!(sum_via(&chunks[0], &hs), 6);
            *chunks[0].write(hs[0]).unwrap() = 10;
        });
        assert_eq!(pool.iter().map(|(_, v)| *v).sum::<u32>(), 16);
    }
}
