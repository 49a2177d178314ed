//! Structured logging for ClawFix
//!
//! This module sets up tracing-based logging with configurable levels and outputs.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the logging system
///
/// This sets up tracing with:
/// - Environment-based filtering via RUST_LOG env var
/// - Default level of INFO in release builds, DEBUG in debug builds
/// - Stderr output with target, file and line information, so stdout stays
///   free for scripts and JSON printed by the CLI
pub fn init() {
    let default_level = if cfg!(debug_assertions) {
        "clawfix=debug,info"
    } else {
        "clawfix=info,warn"
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // try_init so a second call (e.g. from an embedding host) is a no-op
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .try_init();
}

/// Initialize logging for tests
///
/// Uses try_init() to avoid panicking if called multiple times.
#[cfg(test)]
pub fn init_test() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::new("debug"))
        .with(fmt::layer().with_test_writer())
        .try_init();
}

/// Macro for creating a span with common fields
#[macro_export]
macro_rules! operation_span {
    ($name:expr) => {
        tracing::info_span!($name)
    };
    ($name:expr, $($field:tt)*) => {
        tracing::info_span!($name, $($field)*)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_does_not_panic() {
        init_test();
        init_test();
    }

    #[test]
    fn test_operation_span_macro() {
        init_test();
        let span = crate::operation_span!("diagnose", fix_id = "abc");
        let _guard = span.enter();
        tracing::debug!("inside span");
    }
}
