//! Slot storage: the generation-checked backing array of a pool.
//!
//! A [`SlotStore`] is a fixed-stride array of [`Slot`]s plus a LIFO
//! free-list. Slots never move: an index is stable for the life of the
//! store, so growth can only append. Occupancy and the generation counter
//! move in lockstep — the generation steps by one on every transition, so
//! even generations mean occupied and odd mean free, and a handle (which
//! always carries the even, allocation-time generation) goes permanently
//! stale the moment its slot is freed.
//!
//! Generations never wrap. A freed slot whose next reuse cycle would step
//! past the ceiling configured at construction is *retired*: it is not
//! returned to the free-list and its index is never handed out again. The
//! store stays fully usable; retirement just burns one index.
//!
//! Identity (which pool a handle belongs to) and capacity policy live a
//! level up in [`crate::pool::Pool`]; the store works purely in indices
//! and generations.

/// One slot: a generation counter and the value storage it guards.
#[derive(Clone)]
pub(crate) struct Slot<T> {
    /// Steps by one on every occupancy transition. Even ⇔ occupied.
    pub(crate) generation: u32,
    /// The stored value; `None` while the slot is free.
    pub(crate) value: Option<T>,
}

/// Slot array, free-list, and occupancy bookkeeping.
#[derive(Clone)]
pub(crate) struct SlotStore<T> {
    slots: Vec<Slot<T>>,
    /// Indices of reusable free slots, popped LIFO.
    free: Vec<u32>,
    /// Number of occupied slots.
    live: u32,
    /// Number of slots permanently withdrawn from reuse.
    retired: u32,
    /// Generation ceiling (the layout's mask; always odd).
    max_generation: u32,
}

impl<T> SlotStore<T> {
    /// An empty store whose generations saturate at `max_generation`.
    pub(crate) fn new(max_generation: u32) -> Self {
        debug_assert!(
            max_generation % 2 == 1,
            "generation ceiling must be odd (a field mask)"
        );
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
            retired: 0,
            max_generation,
        }
    }

    /// Like [`SlotStore::new`] with space for `n` slots pre-reserved.
    pub(crate) fn with_slot_capacity(max_generation: u32, n: usize) -> Self {
        let mut store = Self::new(max_generation);
        store.slots.reserve_exact(n);
        store
    }

    /// Number of occupied slots.
    pub(crate) fn live(&self) -> u32 {
        self.live
    }

    /// Total slots ever created (occupied + free + retired).
    pub(crate) fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Number of free slots available for reuse.
    pub(crate) fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Number of retired slots.
    pub(crate) fn retired_count(&self) -> u32 {
        self.retired
    }

    /// Whether the next allocation must append a fresh slot.
    pub(crate) fn will_grow(&self) -> bool {
        self.free.is_empty()
    }

    /// Place `value` in a slot and return `(index, generation)`.
    ///
    /// Reuses the most recently freed slot if one exists (stepping its odd
    /// generation up to the next even value), otherwise appends a fresh
    /// slot at generation 0. Callers enforce capacity and index-space
    /// limits before calling; the store itself always has room.
    pub(crate) fn allocate(&mut self, value: T) -> (u32, u32) {
        self.live += 1;
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                debug_assert!(slot.value.is_none(), "free-listed slot was occupied");
                debug_assert!(
                    slot.generation % 2 == 1 && slot.generation < self.max_generation,
                    "free-listed slot cannot start another cycle"
                );
                slot.generation += 1;
                slot.value = Some(value);
                (index, slot.generation)
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    value: Some(value),
                });
                (index, 0)
            }
        }
    }

    /// Take the value out of `index` if it still holds `generation`.
    ///
    /// On success the slot's generation steps to the next odd value and
    /// the slot re-enters the free-list — unless that odd value is the
    /// ceiling, in which case the slot is retired. A miss (out of range,
    /// stale generation, already free) changes nothing and returns `None`,
    /// which is what makes removal idempotent.
    pub(crate) fn remove(&mut self, index: u32, generation: u32) -> Option<T> {
        let slot = self.slots.get_mut(index as usize)?;
        if slot.generation != generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation += 1;
        self.live -= 1;
        if slot.generation == self.max_generation {
            self.retired += 1;
        } else {
            self.free.push(index);
        }
        Some(value)
    }

    /// Checked read of the value at `index` under `generation`.
    pub(crate) fn get(&self, index: u32, generation: u32) -> Option<&T> {
        let slot = self.slots.get(index as usize)?;
        if slot.generation != generation {
            return None;
        }
        slot.value.as_ref()
    }

    /// Checked mutable access to the value at `index` under `generation`.
    pub(crate) fn get_mut(&mut self, index: u32, generation: u32) -> Option<&mut T> {
        let slot = self.slots.get_mut(index as usize)?;
        if slot.generation != generation {
            return None;
        }
        slot.value.as_mut()
    }

    /// Free every occupied slot, stepping each generation as
    /// [`SlotStore::remove`] would. The store ends empty; every
    /// previously issued handle is stale.
    pub(crate) fn clear(&mut self) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.value.take().is_some() {
                slot.generation += 1;
                self.live -= 1;
                if slot.generation == self.max_generation {
                    self.retired += 1;
                } else {
                    self.free.push(index as u32);
                }
            }
        }
        debug_assert_eq!(self.live, 0, "live count out of sync after clear");
    }

    /// Occupied slots in ascending index order, as `(index, generation, value)`.
    pub(crate) fn iter_occupied(&self) -> impl Iterator<Item = (u32, u32, &T)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value
                .as_ref()
                .map(|value| (index as u32, slot.generation, value))
        })
    }

    /// Mutable variant of [`SlotStore::iter_occupied`].
    pub(crate) fn iter_occupied_mut(&mut self) -> impl Iterator<Item = (u32, u32, &mut T)> + '_ {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(index, slot)| {
                let generation = slot.generation;
                slot.value
                    .as_mut()
                    .map(move |value| (index as u32, generation, value))
            })
    }

    /// First occupied slot at or after `pos`, as `(index, generation)`.
    ///
    /// Scan primitive for cursors: indices are stable, so advancing `pos`
    /// monotonically visits every slot that stays occupied exactly once.
    pub(crate) fn next_occupied_at_or_after(&self, pos: usize) -> Option<(u32, u32)> {
        let start = pos.min(self.slots.len());
        self.slots[start..].iter().enumerate().find_map(|(off, slot)| {
            slot.value
                .as_ref()
                .map(|_| ((start + off) as u32, slot.generation))
        })
    }

    /// The backing slot array (read side for views and unchecked access).
    pub(crate) fn slots(&self) -> &[Slot<T>] {
        &self.slots
    }

    /// Mutable access to the slot values only. The free-list and counters
    /// are untouched, so this cannot change which slots are occupied —
    /// it exists for the disjoint partition split.
    pub(crate) fn slots_mut(&mut self) -> &mut [Slot<T>] {
        &mut self.slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Ceiling for a 32-bit generation field, as the default layout uses.
    const CEIL: u32 = u32::MAX;

    #[test]
    fn fresh_slots_start_at_generation_zero() {
        let mut store: SlotStore<&str> = SlotStore::new(CEIL);
        assert_eq!(store.allocate("a"), (0, 0));
        assert_eq!(store.allocate("b"), (1, 0));
        assert_eq!(store.live(), 2);
        assert_eq!(store.slot_count(), 2);
    }

    #[test]
    fn reuse_steps_generation_to_next_even() {
        let mut store: SlotStore<i32> = SlotStore::new(CEIL);
        let (idx, gen) = store.allocate(10);
        assert_eq!((idx, gen), (0, 0));
        assert_eq!(store.remove(idx, gen), Some(10));
        // Freed at generation 1, reused at generation 2.
        assert_eq!(store.allocate(20), (0, 2));
        assert_eq!(store.get(0, 2), Some(&20));
    }

    #[test]
    fn stale_generation_misses_after_reuse() {
        let mut store: SlotStore<i32> = SlotStore::new(CEIL);
        let (idx, first) = store.allocate(10);
        store.remove(idx, first);
        let (idx2, second) = store.allocate(20);
        assert_eq!(idx2, idx);
        assert_eq!(store.get(idx, first), None);
        assert_eq!(store.get(idx, second), Some(&20));
    }

    #[test]
    fn remove_is_idempotent() {
        let mut store: SlotStore<i32> = SlotStore::new(CEIL);
        let (idx, gen) = store.allocate(1);
        assert_eq!(store.remove(idx, gen), Some(1));
        assert_eq!(store.remove(idx, gen), None);
        assert_eq!(store.live(), 0);
        assert_eq!(store.free_count(), 1, "double remove must not re-free");
    }

    #[test]
    fn forged_odd_generation_never_resolves() {
        let mut store: SlotStore<i32> = SlotStore::new(CEIL);
        let (idx, gen) = store.allocate(1);
        store.remove(idx, gen);
        // The slot now sits free at generation 1. A forged handle carrying
        // that odd generation must not read, mutate, or re-free it.
        assert_eq!(store.get(idx, 1), None);
        assert_eq!(store.get_mut(idx, 1), None);
        assert_eq!(store.remove(idx, 1), None);
        assert_eq!(store.free_count(), 1);
    }

    #[test]
    fn out_of_range_index_misses() {
        let store: SlotStore<i32> = SlotStore::new(CEIL);
        assert_eq!(store.get(5, 0), None);
    }

    #[test]
    fn free_list_is_lifo() {
        let mut store: SlotStore<i32> = SlotStore::new(CEIL);
        let (a, ga) = store.allocate(1);
        let (b, gb) = store.allocate(2);
        store.remove(a, ga);
        store.remove(b, gb);
        // b freed last, so b is reused first.
        assert_eq!(store.allocate(3).0, b);
        assert_eq!(store.allocate(4).0, a);
    }

    #[test]
    fn saturated_slot_is_retired_not_wrapped() {
        // Ceiling 3 permits exactly two lifetimes: generations 0 and 2.
        let mut store: SlotStore<i32> = SlotStore::new(3);
        let (idx, gen) = store.allocate(1);
        assert_eq!(store.remove(idx, gen), Some(1)); // gen 0 -> 1, reusable
        let (idx2, gen2) = store.allocate(2);
        assert_eq!((idx2, gen2), (idx, 2));
        assert_eq!(store.remove(idx2, gen2), Some(2)); // gen 2 -> 3 == ceiling
        assert_eq!(store.retired_count(), 1);
        assert_eq!(store.free_count(), 0);
        // The next allocation must grow instead of resurrecting the slot.
        let (idx3, gen3) = store.allocate(3);
        assert_eq!((idx3, gen3), (idx + 1, 0));
        // And the retired slot's last generation stays dead.
        assert_eq!(store.get(idx, 2), None);
        assert_eq!(store.get(idx, 3), None);
    }

    #[test]
    fn clear_frees_everything_and_steps_generations() {
        let mut store: SlotStore<i32> = SlotStore::new(CEIL);
        let handles: Vec<(u32, u32)> = (0..4).map(|i| store.allocate(i)).collect();
        store.clear();
        assert_eq!(store.live(), 0);
        assert_eq!(store.free_count(), 4);
        for (idx, gen) in handles {
            assert_eq!(store.get(idx, gen), None);
        }
        // Reuse still works and yields stepped generations.
        assert_eq!(store.allocate(9), (3, 2));
    }

    #[test]
    fn clear_retires_saturated_slots() {
        let mut store: SlotStore<i32> = SlotStore::new(3);
        let (idx, gen) = store.allocate(1);
        store.remove(idx, gen);
        store.allocate(2); // reuses the slot at generation 2; next free step hits 3
        store.allocate(3); // fresh slot, generation 0
        store.clear();
        assert_eq!(store.retired_count(), 1);
        assert_eq!(store.free_count(), 1);
    }

    #[test]
    fn iter_occupied_ascends_and_skips_free() {
        let mut store: SlotStore<char> = SlotStore::new(CEIL);
        let (a, _ga) = store.allocate('a');
        let (b, gb) = store.allocate('b');
        let (c, _gc) = store.allocate('c');
        store.remove(b, gb);
        let seen: Vec<(u32, char)> = store.iter_occupied().map(|(i, _, v)| (i, *v)).collect();
        assert_eq!(seen, vec![(a, 'a'), (c, 'c')]);
    }

    #[test]
    fn next_occupied_scans_forward_only() {
        let mut store: SlotStore<i32> = SlotStore::new(CEIL);
        let (a, _) = store.allocate(1);
        let (b, gb) = store.allocate(2);
        let (c, gc) = store.allocate(3);
        store.remove(b, gb);
        assert_eq!(store.next_occupied_at_or_after(0), Some((a, 0)));
        assert_eq!(store.next_occupied_at_or_after(a as usize + 1), Some((c, gc)));
        assert_eq!(store.next_occupied_at_or_after(c as usize + 1), None);
        assert_eq!(store.next_occupied_at_or_after(999), None);
    }

    #[cfg(not(miri))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        /// Replay a removal-heavy op tape and check the bookkeeping
        /// invariants the rest of the crate leans on.
        fn check_tape(ops: Vec<u8>) {
            let mut store: SlotStore<u32> = SlotStore::new(u32::MAX);
            let mut live: Vec<(u32, u32)> = Vec::new();
            for (n, op) in ops.into_iter().enumerate() {
                if op % 3 == 0 || live.is_empty() {
                    live.push(store.allocate(n as u32));
                } else {
                    let (idx, gen) = live.swap_remove(op as usize % live.len());
                    assert!(store.remove(idx, gen).is_some());
                    assert_eq!(store.remove(idx, gen), None);
                }
                assert_eq!(store.live() as usize, live.len());
                assert_eq!(
                    store.slot_count(),
                    live.len() + store.free_count() + store.retired_count() as usize
                );
                assert_eq!(store.iter_occupied().count(), live.len());
            }
            for (idx, gen) in &live {
                assert!(store.get(*idx, *gen).is_some());
            }
        }

        proptest! {
            #[test]
            fn bookkeeping_survives_random_tapes(ops in proptest::collection::vec(any::<u8>(), 1..256)) {
                check_tape(ops);
            }

            #[test]
            fn live_slots_hold_even_generations(ops in proptest::collection::vec(any::<u8>(), 1..128)) {
                let mut store: SlotStore<u8> = SlotStore::new(u32::MAX);
                let mut live: Vec<(u32, u32)> = Vec::new();
                for op in ops {
                    if op % 2 == 0 || live.is_empty() {
                        let issued = store.allocate(op);
                        prop_assert_eq!(issued.1 % 2, 0, "issued generation must be even");
                        live.push(issued);
                    } else {
                        let (idx, gen) = live.swap_remove(op as usize % live.len());
                        store.remove(idx, gen);
                    }
                }
            }
        }
    }
}
