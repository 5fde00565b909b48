//! Opaque pagination cursors.
//!
//! Wire layout: `base64url_nopad(version || json_body || tag)`, where `tag`
//! is a 32-byte BLAKE3 digest over `version || json_body`.

mod codec;
mod state;

pub use codec::CursorCodec;
pub use state::{CursorState, PositionMarker};
