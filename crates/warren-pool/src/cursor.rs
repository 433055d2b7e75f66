//! Mutation-tolerant scans: [`Cursor`] and the consuming [`Drain`].
//!
//! Plain iteration ([`Pool::iter`]) borrows the pool for the whole walk,
//! so nothing can be inserted or removed mid-scan. A [`Cursor`] trades
//! borrowed references for [`Handle`]s to regain that freedom: it yields
//! each live handle at most once and stays valid across arbitrary
//! removals and insertions between steps.
//!
//! The guarantee rests on two facts: slot indices are stable (storage
//! never compacts), and the scan position only moves forward. A handle
//! that is removed before the cursor reaches it is simply skipped; one
//! removed after being yielded is never revisited. Values inserted during
//! the scan may or may not be yielded — they land wherever the free-list
//! says — but never twice.

use warren_core::{DefaultLayout, Handle, HandleLayout, PoolError};

use crate::pool::Pool;

/// A forward scan over a pool's live handles that tolerates mutation.
///
/// Created by [`Pool::cursor`]. Yields [`Handle`]s, not references, so
/// the element under scrutiny can be removed — or new ones inserted —
/// without ending the scan.
#[must_use = "a cursor is lazy; call next() to advance it"]
pub struct Cursor<'a, T, L: HandleLayout = DefaultLayout> {
    pool: &'a mut Pool<T, L>,
    /// Next slot index to examine. Monotone; never rewinds.
    pos: usize,
    /// The handle most recently yielded.
    current: Option<Handle<L>>,
}

impl<'a, T, L: HandleLayout> Cursor<'a, T, L> {
    pub(crate) fn new(pool: &'a mut Pool<T, L>) -> Self {
        Self {
            pool,
            pos: 0,
            current: None,
        }
    }

    /// The handle most recently yielded by [`Iterator::next`], if any.
    pub fn current(&self) -> Option<Handle<L>> {
        self.current
    }

    /// Remove the element most recently yielded and return its value.
    ///
    /// Returns `None` before the first step, or if that element has
    /// already been removed (by this method or by [`Cursor::remove`]).
    pub fn remove_current(&mut self) -> Option<T> {
        self.pool.remove(self.current?)
    }

    /// Remove any element by handle, ahead of or behind the scan.
    ///
    /// Elements removed ahead of the cursor are not yielded later.
    pub fn remove(&mut self, handle: Handle<L>) -> Option<T> {
        self.pool.remove(handle)
    }

    /// Insert a value mid-scan. Whether the cursor later yields the new
    /// handle is unspecified (it depends on which slot it lands in), but
    /// it is yielded at most once.
    pub fn insert(&mut self, value: T) -> Result<Handle<L>, PoolError> {
        self.pool.insert(value)
    }

    /// Checked read, same as [`Pool::get`].
    pub fn get(&self, handle: Handle<L>) -> Option<&T> {
        self.pool.get(handle)
    }

    /// Checked mutable access, same as [`Pool::get_mut`].
    pub fn get_mut(&mut self, handle: Handle<L>) -> Option<&mut T> {
        self.pool.get_mut(handle)
    }
}

impl<T, L: HandleLayout> Iterator for Cursor<'_, T, L> {
    type Item = Handle<L>;

    fn next(&mut self) -> Option<Handle<L>> {
        let (index, generation) = self.pool.store().next_occupied_at_or_after(self.pos)?;
        self.pos = index as usize + 1;
        let handle = Handle::from_parts(self.pool.id(), index, generation);
        self.current = Some(handle);
        Some(handle)
    }
}

/// A consuming scan: every step removes the element it yields.
///
/// Created by [`Pool::drain`]. Yields `(handle, value)` pairs in
/// ascending slot order; the handle is already stale by the time the
/// caller sees it (useful as a key for bookkeeping elsewhere). Dropping
/// the drain removes whatever it had not yet reached, so the pool is
/// empty afterwards either way.
#[must_use = "a drain empties the pool element by element; drop it to empty the rest"]
pub struct Drain<'a, T, L: HandleLayout = DefaultLayout> {
    pool: &'a mut Pool<T, L>,
    pos: usize,
}

impl<'a, T, L: HandleLayout> Drain<'a, T, L> {
    pub(crate) fn new(pool: &'a mut Pool<T, L>) -> Self {
        Self { pool, pos: 0 }
    }
}

impl<T, L: HandleLayout> Iterator for Drain<'_, T, L> {
    type Item = (Handle<L>, T);

    fn next(&mut self) -> Option<(Handle<L>, T)> {
        let (index, generation) = self.pool.store().next_occupied_at_or_after(self.pos)?;
        self.pos = index as usize + 1;
        let handle = Handle::from_parts(self.pool.id(), index, generation);
        let value = self
            .pool
            .remove(handle)
            .expect("slot was occupied when the drain reached it");
        Some((handle, value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        // The drain holds the pool exclusively, so every live element is
        // still ahead of the scan position.
        (self.pool.len(), Some(self.pool.len()))
    }
}

impl<T, L: HandleLayout> ExactSizeIterator for Drain<'_, T, L> {}

impl<T, L: HandleLayout> std::iter::FusedIterator for Drain<'_, T, L> {}

impl<T, L: HandleLayout> Drop for Drain<'_, T, L> {
    fn drop(&mut self) {
        for _ in self {}
    }
}

#[cfg(test)]
mod tests {
    use crate::pool::Pool;

    #[test]
    fn cursor_visits_every_live_handle_once() {
        let mut pool: Pool<i32> = Pool::new();
        let expected: Vec<_> = (0..6).map(|i| pool.insert(i).unwrap()).collect();
        let seen: Vec<_> = pool.cursor().collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn cursor_on_empty_pool_yields_nothing() {
        let mut pool: Pool<i32> = Pool::new();
        assert_eq!(pool.cursor().next(), None);
    }

    #[test]
    fn remove_current_keeps_the_scan_going() {
        let mut pool: Pool<i32> = Pool::new();
        for i in 0..5 {
            pool.insert(i).unwrap();
        }
        let mut cursor = pool.cursor();
        let mut kept = Vec::new();
        while let Some(h) = cursor.next() {
            let v = *cursor.get(h).unwrap();
            if v % 2 == 0 {
                assert_eq!(cursor.remove_current(), Some(v));
            } else {
                kept.push(v);
            }
        }
        assert_eq!(kept, vec![1, 3]);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn remove_current_before_first_step_is_none() {
        let mut pool: Pool<i32> = Pool::new();
        pool.insert(1).unwrap();
        let mut cursor = pool.cursor();
        assert_eq!(cursor.current(), None);
        assert_eq!(cursor.remove_current(), None);
        // Twice after a step only removes once.
        let h = cursor.next().unwrap();
        assert_eq!(cursor.current(), Some(h));
        assert_eq!(cursor.remove_current(), Some(1));
        assert_eq!(cursor.remove_current(), None);
    }

    #[test]
    fn removal_ahead_of_the_cursor_skips_the_element() {
        let mut pool: Pool<char> = Pool::new();
        let _a = pool.insert('a').unwrap();
        let b = pool.insert('b').unwrap();
        let _c = pool.insert('c').unwrap();
        let mut cursor = pool.cursor();
        cursor.next(); // at 'a'
        cursor.remove(b);
        let rest: Vec<_> = cursor.map(|h| h.index()).collect();
        assert_eq!(rest, vec![2], "only 'c' remains ahead");
    }

    #[test]
    fn removal_behind_the_cursor_is_never_revisited() {
        let mut pool: Pool<char> = Pool::new();
        let a = pool.insert('a').unwrap();
        pool.insert('b').unwrap();
        pool.insert('c').unwrap();
        let mut cursor = pool.cursor();
        cursor.next(); // 'a'
        cursor.next(); // 'b'
        cursor.remove(a);
        // Reuse 'a's slot mid-scan: index 0 is behind the cursor, so the
        // new element is legitimately not visited.
        let d = cursor.insert('d').unwrap();
        assert_eq!(d.index(), a.index());
        let rest: Vec<_> = cursor.collect();
        assert_eq!(rest.len(), 1, "only 'c' is ahead of the scan");
    }

    #[test]
    fn inserts_during_scan_are_yielded_at_most_once() {
        let mut pool: Pool<u32> = Pool::new();
        for i in 0..4 {
            pool.insert(i).unwrap();
        }
        let mut yielded = Vec::new();
        let mut cursor = pool.cursor();
        let mut spawned = 0;
        while let Some(h) = cursor.next() {
            yielded.push(h);
            if spawned < 8 {
                spawned += 1;
                cursor.insert(100 + spawned).unwrap();
            }
        }
        let mut dedup = yielded.clone();
        dedup.sort();
        dedup.dedup();
        assert_eq!(dedup.len(), yielded.len(), "a handle was yielded twice");
    }

    #[test]
    fn cursor_mutates_through_get_mut() {
        let mut pool: Pool<i32> = Pool::new();
        for i in 1..=3 {
            pool.insert(i).unwrap();
        }
        let mut cursor = pool.cursor();
        while let Some(h) = cursor.next() {
            *cursor.get_mut(h).unwrap() *= 2;
        }
        let values: Vec<i32> = pool.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec![2, 4, 6]);
    }

    #[test]
    fn drain_yields_stale_handles_with_values() {
        let mut pool: Pool<&str> = Pool::new();
        let a = pool.insert("a").unwrap();
        let b = pool.insert("b").unwrap();
        let drained: Vec<_> = pool.drain().collect();
        assert_eq!(drained, vec![(a, "a"), (b, "b")]);
        assert!(pool.is_empty());
        assert!(!pool.contains(a), "drained handles are stale");
        assert!(!pool.contains(b));
    }

    #[test]
    fn dropping_a_drain_empties_the_rest() {
        let mut pool: Pool<i32> = Pool::new();
        for i in 0..10 {
            pool.insert(i).unwrap();
        }
        {
            let mut drain = pool.drain();
            assert_eq!(drain.len(), 10);
            let (_, first) = drain.next().unwrap();
            assert_eq!(first, 0);
            assert_eq!(drain.len(), 9);
        }
        assert!(pool.is_empty());
        // Slots freed by the drain are reusable.
        assert!(pool.insert(99).is_ok());
    }
}
