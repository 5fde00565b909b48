//! Revision-mismatch handling.

mod resolver;

pub use resolver::{ConflictResolver, Resolution};
