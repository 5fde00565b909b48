//! # steadfast-storage
//!
//! Reference implementations of the collaborators the gateway sits in front of:
//! revision stores with compare-and-set semantics, a listable collection
//! that reports its changes, and a wrapper that mirrors commits into it.

pub mod collection;
pub mod memory_store;
pub mod mirror;
pub mod sqlite;

pub use collection::MemoryCollection;
pub use memory_store::MemoryRevisionStore;
pub use mirror::MirroredRevisionStore;
pub use sqlite::SqliteRevisionStore;

use steadfast_core::errors::StoreError;

/// Helper to convert a backend error message into a `StoreError`.
pub(crate) fn to_store_err(msg: impl Into<String>) -> StoreError {
    StoreError::Backend {
        message: msg.into(),
    }
}
