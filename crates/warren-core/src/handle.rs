//! Packed, generation-checked handles.
//!
//! A [`Handle`] is the stable name a pool hands out for an inserted value:
//! `(pool_id, index, generation)` packed into one word per the layout `L`.
//! Handles are plain integers — `Copy`, orderable, hashable, freely stored
//! and shared. They carry no liveness of their own: a handle is *valid*
//! exactly while the slot it names holds the generation it was packed
//! with, and every safe access path re-checks that at use. A dangling
//! handle is therefore harmless; resolving it just returns `None`.

use std::fmt;
use std::marker::PhantomData;

use crate::layout::{DefaultLayout, HandleLayout, Word};

/// Stable reference to a value in a pool.
///
/// The three fields are packed into `L::Repr`; equality, ordering, and
/// hashing operate on the packed word, which is equivalent to field-wise
/// comparison because packing is bijective. Any handle doubles as a weak
/// reference — liveness is computed by the owning pool at check time
/// (`contains`), never cached in the handle.
#[must_use]
pub struct Handle<L: HandleLayout = DefaultLayout> {
    raw: L::Repr,
    _layout: PhantomData<L>,
}

impl<L: HandleLayout> Handle<L> {
    const INDEX_SHIFT: u32 = L::GENERATION_BITS;
    const POOL_SHIFT: u32 = L::GENERATION_BITS + L::INDEX_BITS;
    /// Populated span of the word; bits above it are always zero.
    const TOTAL_BITS: u32 = L::POOL_ID_BITS + L::INDEX_BITS + L::GENERATION_BITS;

    /// Assemble a handle from its three fields.
    ///
    /// Values are masked to their field widths. Assembly places no claim of
    /// validity: whether the handle resolves is decided by the pool it is
    /// presented to.
    pub fn from_parts(pool_id: u32, index: u32, generation: u32) -> Self {
        let () = L::VALID;
        debug_assert!(pool_id <= L::MAX_POOL_ID, "pool_id exceeds layout width");
        debug_assert!(index <= L::MAX_INDEX, "index exceeds layout width");
        debug_assert!(
            generation <= L::MAX_GENERATION,
            "generation exceeds layout width"
        );
        let raw = L::Repr::from_field(pool_id & L::MAX_POOL_ID)
            .shl(Self::POOL_SHIFT)
            .or(L::Repr::from_field(index & L::MAX_INDEX).shl(Self::INDEX_SHIFT))
            .or(L::Repr::from_field(generation & L::MAX_GENERATION));
        Self {
            raw,
            _layout: PhantomData,
        }
    }

    /// Reconstruct a handle from a packed word, e.g. one persisted by the
    /// caller. Bits outside the layout's populated span are cleared so the
    /// result compares equal to the originally issued handle.
    pub fn from_raw(raw: L::Repr) -> Self {
        let () = L::VALID;
        Self {
            raw: raw.and(L::Repr::low_mask(Self::TOTAL_BITS)),
            _layout: PhantomData,
        }
    }

    /// The packed word. Round-trips through [`Handle::from_raw`].
    pub fn to_raw(self) -> L::Repr {
        self.raw
    }

    /// Identity of the issuing pool, truncated to the layout width.
    pub fn pool_id(self) -> u32 {
        self.raw.shr(Self::POOL_SHIFT).to_field() & L::MAX_POOL_ID
    }

    /// Slot index within the issuing pool.
    pub fn index(self) -> u32 {
        self.raw.shr(Self::INDEX_SHIFT).to_field() & L::MAX_INDEX
    }

    /// Slot generation at issue time.
    ///
    /// Live slots hold even generations; a handle's generation is always
    /// even. The slot's generation steps past it when the value is removed,
    /// which is what makes this handle stale.
    pub fn generation(self) -> u32 {
        self.raw.to_field() & L::MAX_GENERATION
    }
}

// Manual impls so `Handle<L>` stays `Copy`/`Eq`/`Hash` without asking the
// derive machinery to thread bounds through `PhantomData`.
impl<L: HandleLayout> Clone for Handle<L> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<L: HandleLayout> Copy for Handle<L> {}

impl<L: HandleLayout> PartialEq for Handle<L> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<L: HandleLayout> Eq for Handle<L> {}

impl<L: HandleLayout> PartialOrd for Handle<L> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<L: HandleLayout> Ord for Handle<L> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl<L: HandleLayout> std::hash::Hash for Handle<L> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<L: HandleLayout> fmt::Debug for Handle<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Handle(pool={}, index={}, gen={})",
            self.pool_id(),
            self.index(),
            self.generation()
        )
    }
}

impl<L: HandleLayout> fmt::Display for Handle<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::CompactLayout;

    #[test]
    fn pack_unpack_round_trip() {
        let h = Handle::<DefaultLayout>::from_parts(7, 1234, 42);
        assert_eq!(h.pool_id(), 7);
        assert_eq!(h.index(), 1234);
        assert_eq!(h.generation(), 42);
    }

    #[test]
    fn full_width_fields_survive_packing() {
        let h = Handle::<DefaultLayout>::from_parts(u32::MAX, u32::MAX, u32::MAX);
        assert_eq!(h.pool_id(), u32::MAX);
        assert_eq!(h.index(), u32::MAX);
        assert_eq!(h.generation(), u32::MAX);
    }

    #[test]
    fn compact_layout_round_trip() {
        let h = Handle::<CompactLayout>::from_parts(0xAB, 3_000_000, 0x00AB_CDEF);
        assert_eq!(h.pool_id(), 0xAB);
        assert_eq!(h.index(), 3_000_000);
        assert_eq!(h.generation(), 0x00AB_CDEF);
    }

    #[test]
    fn handle_sizes_match_layout_words() {
        assert_eq!(std::mem::size_of::<Handle<DefaultLayout>>(), 16);
        assert_eq!(std::mem::size_of::<Handle<CompactLayout>>(), 8);
    }

    #[test]
    fn raw_round_trip_is_identity() {
        let h = Handle::<CompactLayout>::from_parts(9, 77, 6);
        assert_eq!(Handle::<CompactLayout>::from_raw(h.to_raw()), h);
    }

    #[test]
    fn from_raw_clears_unpopulated_bits() {
        let h = Handle::<DefaultLayout>::from_parts(1, 2, 4);
        // DefaultLayout populates 96 of 128 bits.
        let dirty = h.to_raw() | (0xFFu128 << 120);
        assert_eq!(Handle::<DefaultLayout>::from_raw(dirty), h);
    }

    #[test]
    fn equality_is_field_wise() {
        let a = Handle::<DefaultLayout>::from_parts(1, 2, 4);
        let b = Handle::<DefaultLayout>::from_parts(1, 2, 4);
        let c = Handle::<DefaultLayout>::from_parts(1, 2, 6);
        let d = Handle::<DefaultLayout>::from_parts(2, 2, 4);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn display_names_all_fields() {
        let h = Handle::<DefaultLayout>::from_parts(3, 15, 8);
        assert_eq!(h.to_string(), "Handle(pool=3, index=15, gen=8)");
    }

    #[test]
    fn handles_are_hashable_and_orderable() {
        use std::collections::{BTreeSet, HashSet};
        let hs: Vec<Handle> = (0u32..8).map(|i| Handle::from_parts(1, i, 0)).collect();
        let hashed: HashSet<Handle> = hs.iter().copied().collect();
        let ordered: BTreeSet<Handle> = hs.iter().copied().collect();
        assert_eq!(hashed.len(), 8);
        assert_eq!(ordered.len(), 8);
    }

    #[cfg(not(miri))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn default_layout_round_trips(pool in any::<u32>(), index in any::<u32>(), generation in any::<u32>()) {
                let h = Handle::<DefaultLayout>::from_parts(pool, index, generation);
                prop_assert_eq!(h.pool_id(), pool);
                prop_assert_eq!(h.index(), index);
                prop_assert_eq!(h.generation(), generation);
            }

            #[test]
            fn compact_layout_round_trips_masked(pool in 0u32..=0xFF, index in any::<u32>(), generation in 0u32..=0x00FF_FFFF) {
                let h = Handle::<CompactLayout>::from_parts(pool, index, generation);
                prop_assert_eq!(h.pool_id(), pool);
                prop_assert_eq!(h.index(), index);
                prop_assert_eq!(h.generation(), generation);
            }

            #[test]
            fn raw_words_round_trip(raw in any::<u64>()) {
                let h = Handle::<CompactLayout>::from_raw(raw);
                // CompactLayout populates the full u64, so nothing is masked off.
                prop_assert_eq!(h.to_raw(), raw);
                prop_assert_eq!(Handle::<CompactLayout>::from_raw(h.to_raw()), h);
            }
        }
    }
}
