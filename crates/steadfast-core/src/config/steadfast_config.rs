//! Top-level Steadfast configuration with layered resolution.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{
    defaults, ChangeLogConfig, ConflictConfig, CursorConfig, EvictionConfig, IdempotencyConfig,
    PaginationConfig, SnapshotConfig, VolatileStrategy,
};
use crate::errors::ConfigError;

/// File name looked up in the project root.
pub const PROJECT_CONFIG_FILE: &str = "steadfast.toml";

/// Top-level configuration aggregating all sub-configs.
///
/// Resolution order (highest priority first):
/// 1. Environment variables (`STEADFAST_*`)
/// 2. Project config (`steadfast.toml` in the given root)
/// 3. Compiled defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SteadfastConfig {
    pub idempotency: IdempotencyConfig,
    pub conflict: ConflictConfig,
    pub cursor: CursorConfig,
    pub snapshot: SnapshotConfig,
    pub pagination: PaginationConfig,
    pub changelog: ChangeLogConfig,
    pub eviction: EvictionConfig,
}

impl SteadfastConfig {
    /// Load configuration from `root/steadfast.toml` (if present) and the
    /// environment, then validate the result.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let project_config_path = root.join(PROJECT_CONFIG_FILE);
        if project_config_path.exists() {
            Self::merge_toml_file(&mut config, &project_config_path)?;
        }

        Self::apply_env_overrides(&mut config);
        Self::validate(&config)?;

        Ok(config)
    }

    /// Load configuration from a TOML string (for testing and embedding).
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| ConfigError::ParseError {
            path: "<string>".to_string(),
            message: e.to_string(),
        })?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate the configuration values.
    pub fn validate(config: &SteadfastConfig) -> Result<(), ConfigError> {
        let zero_checks: [(&str, Option<u64>); 8] = [
            ("idempotency.record_ttl_secs", config.idempotency.record_ttl_secs),
            ("idempotency.wait_timeout_ms", config.idempotency.wait_timeout_ms),
            ("cursor.ttl_secs", config.cursor.ttl_secs),
            ("snapshot.idle_ttl_secs", config.snapshot.idle_ttl_secs),
            ("snapshot.max_age_secs", config.snapshot.max_age_secs),
            ("snapshot.creation_timeout_ms", config.snapshot.creation_timeout_ms),
            ("changelog.retention_secs", config.changelog.retention_secs),
            ("eviction.interval_ms", config.eviction.interval_ms),
        ];
        for (field, value) in zero_checks {
            if value == Some(0) {
                return Err(invalid(field, "must be greater than 0"));
            }
        }

        if config.conflict.max_rebase_attempts == Some(0) {
            return Err(invalid("conflict.max_rebase_attempts", "must be greater than 0"));
        }
        if config.conflict.journal_depth == Some(0) {
            return Err(invalid("conflict.journal_depth", "must be greater than 0"));
        }
        if config.snapshot.max_ids == Some(0) {
            return Err(invalid("snapshot.max_ids", "must be greater than 0"));
        }

        let default_limit = config.pagination.effective_default_limit();
        let max_limit = config.pagination.effective_max_limit();
        if default_limit == 0 || max_limit == 0 {
            return Err(invalid("pagination", "limits must be greater than 0"));
        }
        if default_limit > max_limit {
            return Err(invalid(
                "pagination.default_limit",
                "must not exceed pagination.max_limit",
            ));
        }

        if let Some(ref secret) = config.cursor.secret {
            if secret.len() < defaults::MIN_CURSOR_SECRET_LEN {
                return Err(invalid(
                    "cursor.secret",
                    format!(
                        "must be at least {} bytes",
                        defaults::MIN_CURSOR_SECRET_LEN
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Merge a TOML file into the existing config.
    /// Unknown keys are silently ignored (forward-compatible).
    fn merge_toml_file(config: &mut SteadfastConfig, path: &Path) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;

        let file_config: SteadfastConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        Self::merge(config, &file_config);
        Ok(())
    }

    /// Merge `other` into `base`; `other` wins wherever it has a `Some` value.
    fn merge(base: &mut SteadfastConfig, other: &SteadfastConfig) {
        macro_rules! take {
            ($($section:ident . $field:ident),* $(,)?) => {
                $(
                    if other.$section.$field.is_some() {
                        base.$section.$field = other.$section.$field.clone();
                    }
                )*
            };
        }

        take!(
            idempotency.record_ttl_secs,
            idempotency.wait_timeout_ms,
            conflict.max_rebase_attempts,
            conflict.journal_depth,
            cursor.secret,
            cursor.ttl_secs,
            cursor.accept_legacy,
            snapshot.idle_ttl_secs,
            snapshot.max_age_secs,
            snapshot.creation_timeout_ms,
            snapshot.max_ids,
            pagination.default_limit,
            pagination.max_limit,
            pagination.volatile_strategy,
            changelog.retention_secs,
            eviction.interval_ms,
        );
    }

    /// Apply environment variable overrides (`STEADFAST_*`).
    /// Values that fail to parse are ignored.
    fn apply_env_overrides(config: &mut SteadfastConfig) {
        if let Some(v) = env_parse::<u64>("STEADFAST_IDEMPOTENCY_RECORD_TTL_SECS") {
            config.idempotency.record_ttl_secs = Some(v);
        }
        if let Some(v) = env_parse::<u64>("STEADFAST_IDEMPOTENCY_WAIT_TIMEOUT_MS") {
            config.idempotency.wait_timeout_ms = Some(v);
        }
        if let Some(v) = env_parse::<u32>("STEADFAST_CONFLICT_MAX_REBASE_ATTEMPTS") {
            config.conflict.max_rebase_attempts = Some(v);
        }
        if let Ok(val) = std::env::var("STEADFAST_CURSOR_SECRET") {
            config.cursor.secret = Some(val);
        }
        if let Some(v) = env_parse::<u64>("STEADFAST_CURSOR_TTL_SECS") {
            config.cursor.ttl_secs = Some(v);
        }
        if let Some(v) = env_parse::<bool>("STEADFAST_CURSOR_ACCEPT_LEGACY") {
            config.cursor.accept_legacy = Some(v);
        }
        if let Some(v) = env_parse::<u64>("STEADFAST_SNAPSHOT_IDLE_TTL_SECS") {
            config.snapshot.idle_ttl_secs = Some(v);
        }
        if let Some(v) = env_parse::<usize>("STEADFAST_PAGINATION_MAX_LIMIT") {
            config.pagination.max_limit = Some(v);
        }
        if let Some(v) = env_parse::<VolatileStrategy>("STEADFAST_PAGINATION_VOLATILE_STRATEGY") {
            config.pagination.volatile_strategy = Some(v);
        }
        if let Some(v) = env_parse::<u64>("STEADFAST_EVICTION_INTERVAL_MS") {
            config.eviction.interval_ms = Some(v);
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|val| val.parse::<T>().ok())
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationFailed {
        field: field.to_string(),
        message: message.into(),
    }
}
