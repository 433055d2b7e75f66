//! Low-level unchecked slot access primitives.
//!
//! This module concentrates the crate's raw-pointer and
//! validity-assumed operations: the `*_unchecked` resolution paths
//! offered by pools and views, and the [`RawSlots`] split that lets
//! partition chunks hand out disjoint `&mut` borrows. Every `unsafe`
//! block carries a `// SAFETY:` comment stating the obligation its
//! caller discharges; in debug builds the same obligations are
//! `debug_assert!`ed.
//!
//! Nothing here is exported from the crate. The public `unsafe fn`
//! surface (e.g. [`crate::pool::Pool::get_unchecked`]) forwards to these
//! primitives and restates the contract in caller terms.

#![allow(unsafe_code)]

use std::marker::PhantomData;

use crate::store::Slot;

/// Resolve `index` without bounds, generation, or occupancy checks.
///
/// # Safety
///
/// `index` must be in range for `slots` and the slot must be occupied.
pub(crate) unsafe fn value_unchecked<T>(slots: &[Slot<T>], index: u32) -> &T {
    debug_assert!((index as usize) < slots.len(), "index out of range");
    // SAFETY: in range per the caller's contract.
    let slot = unsafe { slots.get_unchecked(index as usize) };
    debug_assert!(slot.value.is_some(), "slot is not occupied");
    // SAFETY: occupied per the caller's contract.
    unsafe { slot.value.as_ref().unwrap_unchecked() }
}

/// Mutable variant of [`value_unchecked`].
///
/// # Safety
///
/// Same as [`value_unchecked`].
pub(crate) unsafe fn value_unchecked_mut<T>(slots: &mut [Slot<T>], index: u32) -> &mut T {
    debug_assert!((index as usize) < slots.len(), "index out of range");
    // SAFETY: in range per the caller's contract.
    let slot = unsafe { slots.get_unchecked_mut(index as usize) };
    debug_assert!(slot.value.is_some(), "slot is not occupied");
    // SAFETY: occupied per the caller's contract.
    unsafe { slot.value.as_mut().unwrap_unchecked() }
}

/// A slot array dissolved into a shareable base pointer, so disjoint
/// index sets can be mutated from different chunks (and threads) at once.
///
/// Possession grants nothing by itself: every access goes through
/// [`RawSlots::slot_parts_mut`], whose caller must prove exclusivity for
/// the index it touches. Partition construction provides that proof by
/// assigning each occupied index to exactly one chunk.
pub(crate) struct RawSlots<'a, T> {
    base: *mut Slot<T>,
    len: usize,
    _borrow: PhantomData<&'a mut [Slot<T>]>,
}

impl<'a, T> RawSlots<'a, T> {
    /// Dissolve an exclusive borrow of the slot array.
    pub(crate) fn new(slots: &'a mut [Slot<T>]) -> Self {
        Self {
            base: slots.as_mut_ptr(),
            len: slots.len(),
            _borrow: PhantomData,
        }
    }

    /// Read the generation and mutably borrow the value of slot `index`.
    ///
    /// # Safety
    ///
    /// `index` must be in range, the slot must be occupied, and no other
    /// borrow of slot `index` (through this or any copy of this
    /// `RawSlots`) may be live. Chunk disjointness is what discharges the
    /// last clause.
    pub(crate) unsafe fn slot_parts_mut(&self, index: u32) -> (u32, &'a mut T) {
        debug_assert!((index as usize) < self.len, "index out of range");
        // SAFETY: in range per the caller's contract; exclusivity for this
        // slot per the caller's contract, so no aliasing &mut is created.
        let slot = unsafe { &mut *self.base.add(index as usize) };
        let generation = slot.generation;
        debug_assert!(slot.value.is_some(), "slot is not occupied");
        // SAFETY: occupied per the caller's contract.
        let value = unsafe { slot.value.as_mut().unwrap_unchecked() };
        (generation, value)
    }

    /// Shared-read variant of [`RawSlots::slot_parts_mut`].
    ///
    /// # Safety
    ///
    /// `index` must be in range, the slot must be occupied, and no `&mut`
    /// borrow of slot `index` (through this or any copy of this
    /// `RawSlots`) may be live.
    pub(crate) unsafe fn slot_parts(&self, index: u32) -> (u32, &'a T) {
        debug_assert!((index as usize) < self.len, "index out of range");
        // SAFETY: in range per the caller's contract; no live &mut for
        // this slot per the caller's contract.
        let slot = unsafe { &*self.base.add(index as usize) };
        debug_assert!(slot.value.is_some(), "slot is not occupied");
        // SAFETY: occupied per the caller's contract.
        let value = unsafe { slot.value.as_ref().unwrap_unchecked() };
        (slot.generation, value)
    }
}

impl<T> Clone for RawSlots<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for RawSlots<'_, T> {}

// SAFETY: RawSlots is a borrow of `&mut [Slot<T>]` in pointer clothing;
// sending it to another thread is sound exactly when sending the borrow
// would be, i.e. when T is Send. It is deliberately not Sync: chunks own
// their copies and must never be shared between threads.
unsafe impl<T: Send> Send for RawSlots<'_, T> {}
