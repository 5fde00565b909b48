//! Frozen ordered views for volatile-key listings.

mod store;

pub use store::SnapshotStore;
