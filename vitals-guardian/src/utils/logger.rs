//! Logging configuration using tracing.
//!
//! Log lines go to stdout and, when a vitals directory is available, to an
//! append-only operation log inside it (`vitals.log`, `safe-exec.log`, ...).

use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize logging with the specified level.
///
/// `log_file` is the `(directory, file name)` of the append-only operation
/// log; pass `None` to log to stdout only (tests, ad-hoc runs).
pub fn init(level: &str, log_file: Option<(&Path, &str)>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer());

    match log_file {
        Some((dir, name)) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::never(dir, name);
            registry
                .with(tracing_subscriber::fmt::layer().with_writer(appender).with_ansi(false))
                .init();
        }
        None => registry.init(),
    }

    Ok(())
}
