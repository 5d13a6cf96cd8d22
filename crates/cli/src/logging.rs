//! Tracing setup for the daemon and operator commands

use crate::system_config::LoggingConfig;
use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "demuxd=info,cli_lib=info,ledger=info,scanner=info,watcher=info";

const VERBOSE_LOG_FILTER: &str =
    "demuxd=debug,cli_lib=debug,ledger=debug,scanner=debug,watcher=debug";

/// Log file prefix; the appender adds the date
const LOG_FILE_PREFIX: &str = "demuxd.log";

fn filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            VERBOSE_LOG_FILTER
        } else {
            DEFAULT_LOG_FILTER
        })
    })
}

/// Install the global subscriber.
///
/// Logs always go to stderr. When a log directory is configured they are
/// also written to a daily rolling file; the returned guard flushes that
/// writer and must be held until the process exits.
pub fn init(config: Option<&LoggingConfig>, verbose: bool) -> Result<Option<WorkerGuard>> {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(filter(verbose));

    let Some(directory) = config.and_then(|c| c.directory.as_ref()) else {
        tracing_subscriber::registry().with(stderr_layer).try_init()?;
        return Ok(None);
    };

    std::fs::create_dir_all(directory)
        .with_context(|| format!("Failed to create log directory: {}", directory.display()))?;

    let appender = tracing_appender::rolling::daily(directory, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(filter(verbose)),
        )
        .try_init()?;

    Ok(Some(guard))
}
