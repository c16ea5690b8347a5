//! Tracing and logging setup shared by binaries and tests.

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use crate::tracing::LogOutput;

/// Initialize process-wide tracing/logging.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init(output: LogOutput) {
    tracing::init(output);
}
