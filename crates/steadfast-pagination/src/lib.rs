//! # steadfast-pagination
//!
//! Resumable listings over collections that change during iteration.
//!
//! Stable sort keys resume from a keyset marker. Volatile sort keys either
//! page through a frozen [`ViewSnapshot`](steadfast_core::models::ViewSnapshot)
//! held by the [`SnapshotStore`], or walk the [`ChangeLog`].

pub mod changelog;
pub mod cursor;
pub mod engine;
pub mod snapshot;

pub use changelog::ChangeLog;
pub use cursor::{CursorCodec, CursorState, PositionMarker};
pub use engine::{ListEntry, ListPage, ListRequest, ListingStrategy, PaginationEngine};
pub use snapshot::SnapshotStore;
