//! Core abstraction traits for checked handle access.

use crate::handle::Handle;
use crate::layout::HandleLayout;

/// Read-only, generation-checked access to pooled values.
///
/// Implemented by pools and every read view over them (frozen views,
/// snapshots, partition chunks), so algorithms can be written once against
/// "anything that resolves handles". Returns `None` for stale handles,
/// foreign handles, and handles whose slot has been reused.
pub trait HandleReader<T, L: HandleLayout> {
    /// Resolve a handle to a shared borrow of its value.
    ///
    /// Returns `None` if the handle does not (or no longer does) name a
    /// live value in this reader.
    fn read(&self, handle: Handle<L>) -> Option<&T>;

    /// Whether the handle currently resolves in this reader.
    fn is_live(&self, handle: Handle<L>) -> bool {
        self.read(handle).is_some()
    }
}

/// Mutable, generation-checked access to pooled values.
///
/// Implemented by pools and mutable partition chunks. Value mutation only:
/// implementors never add or remove slots through this trait.
pub trait HandleWriter<T, L: HandleLayout>: HandleReader<T, L> {
    /// Resolve a handle to a mutable borrow of its value.
    ///
    /// Returns `None` under the same conditions as
    /// [`HandleReader::read`], or when the handle's slot is outside this
    /// writer's reach (e.g. another partition chunk's slots).
    fn write(&mut self, handle: Handle<L>) -> Option<&mut T>;
}
