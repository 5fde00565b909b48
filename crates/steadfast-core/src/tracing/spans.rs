//! Span definitions per operation: mutate, list, evict.

/// Create a mutation span.
#[macro_export]
macro_rules! mutation_span {
    ($scope:expr) => {
        ::tracing::info_span!(
            "steadfast.mutate",
            user_id = %$scope.user_id,
            resource_id = %$scope.resource_id,
        )
    };
}

/// Create a listing span.
#[macro_export]
macro_rules! list_span {
    ($strategy:expr, $limit:expr) => {
        ::tracing::info_span!("steadfast.list", strategy = %$strategy, limit = $limit)
    };
}

/// Create an eviction sweep span.
#[macro_export]
macro_rules! eviction_span {
    ($target:expr) => {
        ::tracing::debug_span!("steadfast.evict", target = %$target)
    };
}

/// Span names as constants for programmatic use.
pub mod names {
    pub const MUTATE: &str = "steadfast.mutate";
    pub const LIST: &str = "steadfast.list";
    pub const EVICT: &str = "steadfast.evict";
}
