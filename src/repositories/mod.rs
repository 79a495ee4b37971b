//! Persistence layer.
//!
//! Services talk to storage only through the [`Store`] trait, resolved from
//! the application context as [`AppStore`](crate::context::AppStore).
//! [`MemoryStore`] is the in-process backend used by the CLI and tests.

mod memory;
mod traits;

pub use memory::MemoryStore;
pub use traits::Store;
