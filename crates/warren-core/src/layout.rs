//! Bit-field layouts for packed handles.
//!
//! A handle packs three unsigned fields — pool identity, slot index, and
//! slot generation — into one machine word. [`HandleLayout`] fixes the
//! width of each field and the backing [`Word`] at compile time, so a pool
//! type chooses its own trade-off between address space and handle
//! footprint. The widths are checked once per instantiated layout: an
//! illegal layout fails to compile at the first use of its codec.
//!
//! Two layouts are provided. [`DefaultLayout`] gives every field the full
//! 32 bits in a `u128` (a 16-byte handle, still pass-by-value territory).
//! [`CompactLayout`] squeezes into a `u64` for callers with few pools and
//! shorter slot lifetimes.

use std::fmt;
use std::hash::Hash;

mod sealed {
    pub trait Sealed {}
}

/// Unsigned machine word a handle packs into.
///
/// Implemented for `u32`, `u64`, and `u128`; sealed because the codec
/// assumes two's-complement shift/mask behavior on exactly these types.
pub trait Word:
    Copy + Eq + Ord + Hash + fmt::Debug + Send + Sync + sealed::Sealed + 'static
{
    /// Width of the word in bits.
    const BITS: u32;
    /// Widen a field value into the word.
    fn from_field(v: u32) -> Self;
    /// Truncate the word to its low 32 bits. Callers mask afterwards.
    fn to_field(self) -> u32;
    /// Left shift.
    fn shl(self, n: u32) -> Self;
    /// Logical right shift.
    fn shr(self, n: u32) -> Self;
    /// Bitwise or.
    fn or(self, rhs: Self) -> Self;
    /// Bitwise and.
    fn and(self, rhs: Self) -> Self;
    /// Word with the lowest `n` bits set (`n <= BITS`).
    fn low_mask(n: u32) -> Self;
}

macro_rules! impl_word {
    ($($ty:ty),* $(,)?) => {$(
        impl sealed::Sealed for $ty {}

        impl Word for $ty {
            const BITS: u32 = <$ty>::BITS;

            #[inline]
            fn from_field(v: u32) -> Self {
                v as $ty
            }

            #[inline]
            fn to_field(self) -> u32 {
                self as u32
            }

            #[inline]
            fn shl(self, n: u32) -> Self {
                self << n
            }

            #[inline]
            fn shr(self, n: u32) -> Self {
                self >> n
            }

            #[inline]
            fn or(self, rhs: Self) -> Self {
                self | rhs
            }

            #[inline]
            fn and(self, rhs: Self) -> Self {
                self & rhs
            }

            #[inline]
            fn low_mask(n: u32) -> Self {
                if n >= Self::BITS {
                    <$ty>::MAX
                } else {
                    (1 << n) - 1
                }
            }
        }
    )*};
}

impl_word!(u32, u64, u128);

/// Mask for a field of `bits` width, as a field value.
const fn field_mask(bits: u32) -> u32 {
    if bits >= 32 {
        u32::MAX
    } else {
        (1u32 << bits) - 1
    }
}

/// Compile-time bit-field configuration of a packed handle.
///
/// Each field takes 1..=32 bits and the three together must fit
/// [`Self::Repr`]. Violations are caught by [`Self::VALID`], which the
/// codec evaluates on first use, so a bad layout is a compile error rather
/// than a runtime surprise.
///
/// Implementors are zero-sized marker types:
///
/// ```
/// use warren_core::{Handle, HandleLayout};
///
/// /// 4-bit pool id, 16-bit index, 12-bit generation in a `u32`.
/// #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// struct Tiny;
///
/// impl HandleLayout for Tiny {
///     type Repr = u32;
///     const POOL_ID_BITS: u32 = 4;
///     const INDEX_BITS: u32 = 16;
///     const GENERATION_BITS: u32 = 12;
/// }
///
/// let h = Handle::<Tiny>::from_parts(3, 70, 2);
/// assert_eq!((h.pool_id(), h.index(), h.generation()), (3, 70, 2));
/// assert_eq!(std::mem::size_of::<Handle<Tiny>>(), 4);
/// ```
pub trait HandleLayout:
    Copy + Eq + Ord + Hash + fmt::Debug + Send + Sync + 'static
{
    /// Packed representation the three fields occupy.
    type Repr: Word;

    /// Width of the pool-identity field.
    const POOL_ID_BITS: u32;
    /// Width of the slot-index field.
    const INDEX_BITS: u32;
    /// Width of the slot-generation field.
    const GENERATION_BITS: u32;

    /// Layout legality check, evaluated post-monomorphization.
    const VALID: () = {
        assert!(
            Self::POOL_ID_BITS >= 1 && Self::POOL_ID_BITS <= 32,
            "pool-id field must be 1..=32 bits"
        );
        assert!(
            Self::INDEX_BITS >= 1 && Self::INDEX_BITS <= 32,
            "index field must be 1..=32 bits"
        );
        assert!(
            Self::GENERATION_BITS >= 1 && Self::GENERATION_BITS <= 32,
            "generation field must be 1..=32 bits"
        );
        assert!(
            Self::POOL_ID_BITS + Self::INDEX_BITS + Self::GENERATION_BITS
                <= <Self::Repr as Word>::BITS,
            "handle fields exceed the backing word"
        );
    };

    /// Largest pool identity the layout can carry.
    const MAX_POOL_ID: u32 = field_mask(Self::POOL_ID_BITS);
    /// Largest slot index the layout can carry.
    const MAX_INDEX: u32 = field_mask(Self::INDEX_BITS);
    /// Largest generation the layout can carry.
    const MAX_GENERATION: u32 = field_mask(Self::GENERATION_BITS);
}

/// 32-bit pool id, 32-bit index, 32-bit generation in a `u128`.
///
/// 16-byte handles: the widest layout that still behaves like a small
/// integer. Four billion slots per pool and two billion reuse cycles per
/// slot before retirement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DefaultLayout;

impl HandleLayout for DefaultLayout {
    type Repr = u128;
    const POOL_ID_BITS: u32 = 32;
    const INDEX_BITS: u32 = 32;
    const GENERATION_BITS: u32 = 32;
}

/// 8-bit pool id, 32-bit index, 24-bit generation in a `u64`.
///
/// 8-byte handles for callers that keep few pools alive and accept
/// earlier slot retirement (eight million reuse cycles per slot).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CompactLayout;

impl HandleLayout for CompactLayout {
    type Repr = u64;
    const POOL_ID_BITS: u32 = 8;
    const INDEX_BITS: u32 = 32;
    const GENERATION_BITS: u32 = 24;
}
