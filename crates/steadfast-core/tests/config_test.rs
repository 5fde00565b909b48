//! Tests for layered configuration: defaults, project file, env overrides.

use std::sync::Mutex;
use std::time::Duration;

use steadfast_core::config::{SteadfastConfig, VolatileStrategy};
use steadfast_core::errors::ConfigError;

/// Serializes tests that touch `STEADFAST_*` environment variables.
static ENV_MUTEX: Mutex<()> = Mutex::new(());

fn clear_steadfast_env_vars() {
    for key in [
        "STEADFAST_IDEMPOTENCY_RECORD_TTL_SECS",
        "STEADFAST_IDEMPOTENCY_WAIT_TIMEOUT_MS",
        "STEADFAST_CONFLICT_MAX_REBASE_ATTEMPTS",
        "STEADFAST_CURSOR_SECRET",
        "STEADFAST_CURSOR_TTL_SECS",
        "STEADFAST_CURSOR_ACCEPT_LEGACY",
        "STEADFAST_SNAPSHOT_IDLE_TTL_SECS",
        "STEADFAST_PAGINATION_MAX_LIMIT",
        "STEADFAST_PAGINATION_VOLATILE_STRATEGY",
        "STEADFAST_EVICTION_INTERVAL_MS",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_steadfast_env_vars();

    let dir = tempfile::tempdir().unwrap();
    let config = SteadfastConfig::load(dir.path()).unwrap();

    assert_eq!(config.idempotency.effective_record_ttl(), Duration::from_secs(86_400));
    assert_eq!(config.idempotency.effective_wait_timeout(), Duration::from_secs(5));
    assert_eq!(config.conflict.effective_max_rebase_attempts(), 3);
    assert_eq!(config.cursor.effective_ttl(), Duration::from_secs(3_600));
    assert!(config.cursor.effective_accept_legacy());
    assert_eq!(config.snapshot.effective_idle_ttl(), Duration::from_secs(900));
    assert_eq!(config.pagination.effective_default_limit(), 50);
    assert_eq!(config.pagination.effective_max_limit(), 500);
    assert_eq!(
        config.pagination.effective_volatile_strategy(),
        VolatileStrategy::Snapshot
    );
    assert_eq!(config.eviction.effective_interval(), Duration::from_secs(30));
}

#[test]
fn env_overrides_project_file() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_steadfast_env_vars();

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("steadfast.toml"),
        r#"
[idempotency]
record_ttl_secs = 600

[pagination]
max_limit = 200
volatile_strategy = "event_log"
"#,
    )
    .unwrap();
    std::env::set_var("STEADFAST_PAGINATION_MAX_LIMIT", "100");

    let config = SteadfastConfig::load(dir.path()).unwrap();
    assert_eq!(config.idempotency.record_ttl_secs, Some(600));
    assert_eq!(config.pagination.max_limit, Some(100));
    assert_eq!(
        config.pagination.effective_volatile_strategy(),
        VolatileStrategy::EventLog
    );

    clear_steadfast_env_vars();
}

#[test]
fn unparseable_env_value_is_ignored() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_steadfast_env_vars();

    std::env::set_var("STEADFAST_CURSOR_TTL_SECS", "soon");
    std::env::set_var("STEADFAST_PAGINATION_VOLATILE_STRATEGY", "event_log");
    let dir = tempfile::tempdir().unwrap();
    let config = SteadfastConfig::load(dir.path()).unwrap();
    assert_eq!(config.cursor.ttl_secs, None);
    assert_eq!(
        config.pagination.volatile_strategy,
        Some(VolatileStrategy::EventLog)
    );

    clear_steadfast_env_vars();
}

#[test]
fn invalid_toml_is_a_parse_error() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_steadfast_env_vars();

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("steadfast.toml"), "[pagination\nmax_limit = ").unwrap();
    match SteadfastConfig::load(dir.path()) {
        Err(ConfigError::ParseError { .. }) => {}
        other => panic!("expected ParseError, got {other:?}"),
    }
}

#[test]
fn zero_ttl_fails_validation() {
    let err = SteadfastConfig::from_toml("[idempotency]\nrecord_ttl_secs = 0\n").unwrap_err();
    match err {
        ConfigError::ValidationFailed { field, .. } => {
            assert_eq!(field, "idempotency.record_ttl_secs")
        }
        other => panic!("expected ValidationFailed, got {other:?}"),
    }
}

#[test]
fn default_limit_above_max_fails_validation() {
    let err = SteadfastConfig::from_toml("[pagination]\ndefault_limit = 600\n").unwrap_err();
    assert!(matches!(err, ConfigError::ValidationFailed { .. }));
}

#[test]
fn short_cursor_secret_fails_validation() {
    let err = SteadfastConfig::from_toml("[cursor]\nsecret = \"short\"\n").unwrap_err();
    assert!(matches!(err, ConfigError::ValidationFailed { ref field, .. } if field == "cursor.secret"));

    let ok = SteadfastConfig::from_toml("[cursor]\nsecret = \"0123456789abcdef\"\n").unwrap();
    assert_eq!(ok.cursor.secret.as_deref(), Some("0123456789abcdef"));
}

#[test]
fn unknown_keys_are_ignored() {
    let config = SteadfastConfig::from_toml("[future]\nflag = true\n").unwrap();
    assert_eq!(config.conflict.effective_journal_depth(), 128);
}
