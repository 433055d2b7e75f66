//! Ambient handle resolution through a thread-local pool registry.
//!
//! A handle already names its pool (the `pool_id` field), so code that
//! only holds handles can resolve them without threading a `&Pool`
//! through every call — *if* the pool announced itself first.
//! [`enter`] registers a pool for the duration of a closure and
//! [`read`] looks a handle's pool up by id:
//!
//! ```
//! use warren_pool::{registry, Pool};
//!
//! let mut pool: Pool<String> = Pool::new();
//! let h = pool.insert("ambient".into()).unwrap();
//! let len = registry::enter(&pool, || {
//!     registry::read(h, |s: &String| s.len())
//! });
//! assert_eq!(len, Some(7));
//! assert_eq!(registry::read(h, |s: &String| s.len()), None, "scope over");
//! ```
//!
//! The registry is strictly thread-local and strictly scoped: an entry
//! exists only while the registering [`enter`] frame is on the current
//! thread's stack, and it is removed on the way out even if the closure
//! panics. A lookup can therefore miss (unregistered id, other thread,
//! scope already over) but never dangle. Entries also record the concrete
//! pool type, so a handle whose id collides with a pool of another
//! element type or layout misses instead of misreading.
//!
//! Mutation is deliberately absent. The registry hands out `&Pool`
//! reads; anything more would let two call sites alias one pool mutably
//! through the back door.

use std::any::TypeId;
use std::cell::RefCell;

use indexmap::IndexMap;

use warren_core::{Handle, HandleLayout};

use crate::pool::Pool;

struct Entry {
    /// Type-erased `&Pool<T, L>`, valid while its `enter` frame lives.
    pool: *const (),
    /// `TypeId` of the concrete `Pool<T, L>` behind `pool`.
    type_id: TypeId,
}

thread_local! {
    static REGISTRY: RefCell<IndexMap<u32, Entry>> = RefCell::new(IndexMap::new());
}

/// Register `pool` for ambient [`read`]s on this thread while `f` runs.
///
/// Scopes nest (registering different pools) and the entry is removed
/// when `f` returns or unwinds.
///
/// # Panics
///
/// Panics if a pool with the same truncated id is already registered on
/// this thread — re-entering one pool twice, or a genuine id collision
/// under a narrow `pool_id` field. Both mask bugs if tolerated silently.
pub fn enter<T: 'static, L: HandleLayout, R>(pool: &Pool<T, L>, f: impl FnOnce() -> R) -> R {
    struct Unregister(u32);
    impl Drop for Unregister {
        fn drop(&mut self) {
            REGISTRY.with(|r| r.borrow_mut().swap_remove(&self.0));
        }
    }

    let id = pool.id();
    REGISTRY.with(|r| {
        let mut map = r.borrow_mut();
        assert!(
            !map.contains_key(&id),
            "pool {id} is already registered on this thread"
        );
        map.insert(
            id,
            Entry {
                pool: (pool as *const Pool<T, L>).cast(),
                type_id: TypeId::of::<Pool<T, L>>(),
            },
        );
    });
    let _guard = Unregister(id);
    f()
}

/// Resolve `handle` against whichever pool registered its id on this
/// thread, running `f` on the value if the handle is live.
///
/// Returns `None` when no pool with that id is registered here, when the
/// registered pool's element type or layout does not match, or when the
/// handle is stale — the same misses the pool itself would report, plus
/// the lookup's own.
#[allow(unsafe_code)]
pub fn read<T: 'static, L: HandleLayout, R>(
    handle: Handle<L>,
    f: impl FnOnce(&T) -> R,
) -> Option<R> {
    let found = REGISTRY.with(|r| {
        let map = r.borrow();
        let entry = map.get(&handle.pool_id())?;
        (entry.type_id == TypeId::of::<Pool<T, L>>())
            .then_some(entry.pool as *const Pool<T, L>)
    })?;
    // SAFETY: the entry existed an instant ago on this same thread, so the
    // `enter` frame that registered it is still on our call stack (only its
    // drop guard removes entries), which keeps the borrowed pool alive; the
    // TypeId comparison proved the concrete type.
    let pool = unsafe { &*found };
    pool.get(handle).map(f)
}
