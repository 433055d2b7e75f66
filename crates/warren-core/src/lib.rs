//! Core types for Warren generation-checked handle pools.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! packed [`Handle`] and its bit-field [`layout`]s, pool identity
//! allocation, the shared error type, and the access traits implemented by
//! every pool and view type in the workspace.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod handle;
pub mod id;
pub mod layout;
pub mod traits;

pub use error::PoolError;
pub use handle::Handle;
pub use id::PoolId;
pub use layout::{CompactLayout, DefaultLayout, HandleLayout, Word};
pub use traits::{HandleReader, HandleWriter};
