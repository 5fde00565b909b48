//! Configuration system for Steadfast.
//! TOML-based, 3-layer resolution: env > project file > compiled defaults.

pub mod defaults;
pub mod idempotency_config;
pub mod pagination_config;
pub mod snapshot_config;
pub mod steadfast_config;

pub use idempotency_config::{ConflictConfig, IdempotencyConfig};
pub use pagination_config::{ChangeLogConfig, CursorConfig, PaginationConfig, VolatileStrategy};
pub use snapshot_config::{EvictionConfig, SnapshotConfig};
pub use steadfast_config::SteadfastConfig;
