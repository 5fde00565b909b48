//! Error handling for Steadfast.
//! One error enum per subsystem, `thiserror` only.

pub mod config_error;
pub mod cursor_error;
pub mod error_code;
pub mod gateway_error;
pub mod mutation_error;
pub mod pagination_error;
pub mod snapshot_error;
pub mod store_error;
pub mod update_error;

pub use config_error::ConfigError;
pub use cursor_error::CursorError;
pub use error_code::SteadfastErrorCode;
pub use gateway_error::GatewayError;
pub use mutation_error::MutationError;
pub use pagination_error::PaginationError;
pub use snapshot_error::SnapshotError;
pub use store_error::StoreError;
pub use update_error::UpdateError;
