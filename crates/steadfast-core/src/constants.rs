/// Steadfast version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum accepted idempotency token length in bytes.
pub const MAX_TOKEN_LEN: usize = 255;

/// Current cursor wire format.
pub const CURSOR_FORMAT_VERSION: u8 = 2;

/// Oldest cursor wire format still understood by the decoder.
pub const CURSOR_LEGACY_FORMAT_VERSION: u8 = 1;

/// Length in bytes of the integrity tag appended to every cursor.
pub const CURSOR_TAG_LEN: usize = 32;

/// BLAKE3 key-derivation context for cursor tags.
pub const CURSOR_KEY_CONTEXT: &str = "steadfast 2024 cursor integrity v2";

/// Revision a resource has before its first successful write.
pub const INITIAL_REVISION: u64 = 0;
