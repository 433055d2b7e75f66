//! Pool-specific error types.

use std::error::Error;
use std::fmt;

/// Errors that can occur when inserting into a pool.
///
/// Both variants are recoverable: the pool is unchanged and the rejected
/// value is dropped by the caller, not the pool. Stale or foreign handles
/// are not errors — lookup paths report them as `None`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PoolError {
    /// A bounded pool is full — no free slot and growth is not permitted.
    CapacityExhausted {
        /// The configured capacity of the pool.
        capacity: usize,
    },
    /// The handle layout's index field cannot address another slot.
    ///
    /// Reached by unbounded pools whose slot count (live plus retired)
    /// has hit the layout's index space; widening `INDEX_BITS` is the
    /// remedy.
    IndexSpaceExhausted {
        /// Total slots addressable under the layout.
        max_slots: usize,
    },
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityExhausted { capacity } => {
                write!(f, "pool capacity exhausted: {capacity} slots")
            }
            Self::IndexSpaceExhausted { max_slots } => {
                write!(
                    f,
                    "handle index space exhausted: layout addresses at most {max_slots} slots"
                )
            }
        }
    }
}

impl Error for PoolError {}
