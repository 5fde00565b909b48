// Single source of truth for all default values.

// --- Idempotency ---
pub const DEFAULT_RECORD_TTL_SECS: u64 = 86_400; // 24 hours
pub const DEFAULT_MUTATION_WAIT_TIMEOUT_MS: u64 = 5_000;

// --- Conflict resolution ---
pub const DEFAULT_MAX_REBASE_ATTEMPTS: u32 = 3;
pub const DEFAULT_JOURNAL_DEPTH: usize = 128;

// --- Cursors ---
pub const DEFAULT_CURSOR_TTL_SECS: u64 = 3_600;
pub const DEFAULT_ACCEPT_LEGACY_CURSORS: bool = true;
pub const MIN_CURSOR_SECRET_LEN: usize = 16;

// --- Snapshots ---
pub const DEFAULT_SNAPSHOT_IDLE_TTL_SECS: u64 = 900; // 15 minutes
pub const DEFAULT_SNAPSHOT_MAX_AGE_SECS: u64 = 3_600;
pub const DEFAULT_SNAPSHOT_CREATION_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_SNAPSHOT_MAX_IDS: usize = 100_000;

// --- Pagination ---
pub const DEFAULT_PAGE_LIMIT: usize = 50;
pub const DEFAULT_MAX_PAGE_LIMIT: usize = 500;

// --- Change log ---
pub const DEFAULT_CHANGELOG_RETENTION_SECS: u64 = 86_400;

// --- Eviction ---
pub const DEFAULT_EVICTION_INTERVAL_MS: u64 = 30_000;
