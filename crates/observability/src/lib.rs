//! Tracing/logging setup shared by the kitchenflow binaries.

/// Initialize process-wide logging at `info` unless `RUST_LOG` says otherwise.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init_with_default_filter("info");
}

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use self::tracing::LogFormat;
