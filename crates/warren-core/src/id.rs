//! Pool identity allocation.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter for unique [`PoolId`] allocation.
static POOL_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique per-instance identifier for a pool.
///
/// Allocated from a monotonic atomic counter via [`PoolId::next`]. Two
/// distinct pools always have different IDs, even if one is dropped and
/// another is allocated at the same address, so a handle issued by a dead
/// pool can never resolve against its successor.
///
/// Handles carry the ID truncated to the layout's pool-id field width
/// ([`PoolId::truncate`]); uniqueness as seen through handles is therefore
/// modulo that width. The default 32-bit field gives four billion pools
/// before the truncated identity can repeat.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolId(u64);

impl PoolId {
    /// Allocate a fresh, unique pool ID.
    ///
    /// Each call returns a new ID that has never been returned before
    /// within this process. Thread-safe.
    pub fn next() -> Self {
        Self(POOL_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// The handle-visible identity: the ID truncated to `bits` (1..=32).
    pub fn truncate(self, bits: u32) -> u32 {
        let mask = if bits >= 32 {
            u32::MAX
        } else {
            (1u32 << bits) - 1
        };
        (self.0 as u32) & mask
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_is_unique_and_monotonic() {
        let a = PoolId::next();
        let b = PoolId::next();
        let c = PoolId::next();
        assert!(a < b && b < c);
    }

    #[test]
    fn truncate_masks_to_width() {
        let id = PoolId(0xDEAD_BEEF_CAFE);
        assert_eq!(id.truncate(8), 0xFE);
        assert_eq!(id.truncate(16), 0xCAFE);
        assert_eq!(id.truncate(32), 0xBEEF_CAFE);
    }

    #[test]
    fn next_is_unique_across_threads() {
        let ids: Vec<PoolId> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(|| (0..64).map(|_| PoolId::next()).collect::<Vec<_>>()))
                .collect();
            handles.into_iter().flat_map(|h| h.join().unwrap()).collect()
        });
        let unique: std::collections::HashSet<PoolId> = ids.iter().copied().collect();
        assert_eq!(unique.len(), ids.len());
    }
}
