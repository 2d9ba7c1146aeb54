//! Tracing/logging setup shared by the storefront binary and its tests.

/// Initialize process-wide observability (JSON logs filtered by `RUST_LOG`).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(tracing::DEFAULT_FILTER);
}

/// Tracing configuration (filters, formatters).
pub mod tracing;
