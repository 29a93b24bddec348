use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;

/// Installs the global subscriber: stdout always, plus a daily-rolling file
/// writer when `Config::log_dir` is set. The returned guard must live as
/// long as the process; dropping it flushes and stops the background writer.
pub fn init(config: &Config) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match file_writer(config) {
        Some((writer, guard)) => {
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    guard
}

fn file_writer(config: &Config) -> Option<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    let dir = config.log_dir.as_deref()?;
    if let Err(err) = std::fs::create_dir_all(dir) {
        eprintln!("log directory {} unusable: {err}", dir.display());
        return None;
    }
    Some(tracing_appender::non_blocking(rolling::daily(dir, "forest.log")))
}
