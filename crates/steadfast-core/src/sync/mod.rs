//! Bounded-wait coordination primitives.
//!
//! Every wait in the gateway goes through [`Completion::wait`], which always
//! takes a timeout. Nothing here blocks indefinitely.

pub mod completion;
pub mod single_flight;

pub use completion::Completion;
pub use single_flight::{FlightError, SingleFlight};
