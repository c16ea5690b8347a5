//! Tracing/logging initialization.
//!
//! Filtering comes from `RUST_LOG` (default `info`). JSON lines are the default output;
//! `Pretty` is meant for local development.

use tracing_subscriber::EnvFilter;

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogOutput {
    #[default]
    Json,
    Pretty,
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init(output: LogOutput) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_timer(tracing_subscriber::fmt::time::SystemTime);

    let _ = match output {
        LogOutput::Json => builder.json().with_target(false).try_init(),
        LogOutput::Pretty => builder.pretty().try_init(),
    };

    ::tracing::debug!(?output, "tracing initialized");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_is_a_no_op() {
        init(LogOutput::Json);
        init(LogOutput::Pretty);
        ::tracing::info!("still logging");
    }
}
