//! Tracing setup
//!
//! The crate is a library; the embedding application calls
//! [`init_logging`] once. Tests use [`init_test_logging`], which is safe
//! to call from every test.

use crate::config::AppConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the global subscriber: env-filtered, rolling file appender
/// plus stdout. Returns the guard that flushes the non-blocking writer;
/// the caller must keep it alive.
pub fn init_logging(config: &AppConfig) -> WorkerGuard {
    let appender = rolling_appender(config);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let registry = tracing_subscriber::registry().with(env_filter(config));

    if config.use_json {
        // JSON goes to the file only; structured queries keep the target
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(file_writer)
                    .with_ansi(false),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(file_writer)
                    .with_ansi(false),
            )
            .with(fmt::layer().with_target(false).with_ansi(true))
            .init();
    }

    guard
}

/// Best-effort subscriber for tests; repeated calls are no-ops.
pub fn init_test_logging() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(fmt::layer().with_target(false).with_test_writer())
        .try_init();
}

fn rolling_appender(config: &AppConfig) -> tracing_appender::rolling::RollingFileAppender {
    match config.rotation.as_str() {
        "hourly" => tracing_appender::rolling::hourly(&config.log_dir, &config.log_file),
        "daily" => tracing_appender::rolling::daily(&config.log_dir, &config.log_file),
        _ => tracing_appender::rolling::never(&config.log_dir, &config.log_file),
    }
}

fn env_filter(config: &AppConfig) -> EnvFilter {
    let directives = if config.enable_tracing {
        config.log_level.clone()
    } else {
        format!("{},withdraw_flow=off", config.log_level)
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives))
}
