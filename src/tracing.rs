//! Logging setup for the scenario runner
//!
//! Every subsystem logs under its module path, so `RUST_LOG` can single one out:
//! `panelkit::manager` (open/close/destroy, async completions), `panelkit::cache` (promotion,
//! cool-down), `panelkit::level` (re-sorts, blockers), `panelkit::stack`, `panelkit::dialog`
//! and `panelkit::focus`. Example: `RUST_LOG=panelkit::cache=debug,panelkit::level=debug`.
//!
//! A second, always-debug layer appends to a daily rotated `panelkit.log` under the logs
//! directory from [`crate::config_paths`].

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Install the console (stderr, `RUST_LOG`, default `warn`) and rotating file layers
///
/// Reports go to stdout, so log lines never interleave with a printed snapshot.
pub fn init() {
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .with_filter(console_filter);

    let file_layer = match crate::config_paths::ensure_logs_dir() {
        Ok(logs_dir) => {
            let file_appender =
                tracing_appender::rolling::daily(logs_dir, crate::config_paths::LOG_FILE_NAME);
            Some(
                fmt::layer()
                    .with_writer(file_appender)
                    .with_ansi(false)
                    .with_target(true)
                    .with_line_number(true)
                    .with_filter(EnvFilter::new("debug")),
            )
        }
        Err(e) => {
            eprintln!("Warning: Could not initialize file logging: {}", e);
            None
        }
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();
}
