//! Logging setup for Arclight Engine
//
// This module provides logging initialization and log file management for
// the engine. Console output goes to stderr; when the app data directory is
// writable a per-run log file is kept alongside it.
//
// Usage:
//   Call `logging::init(verbose)` at the start of main().
//   Keep the returned guard alive for the program's duration.

use chrono::Local;
use directories::ProjectDirs;
use std::fs;
use tracing_subscriber::prelude::*;

#[allow(dead_code)]
pub struct LogGuard(Option<tracing_appender::non_blocking::WorkerGuard>);

/// Initializes logging for the engine.
///
/// - `verbose`: raises the default filter from `info` to `debug`; `RUST_LOG`
///   overrides either.
/// - Returns: LogGuard, which must be kept alive for file logging.
///
/// File logging is best-effort: if the log directory cannot be created the
/// engine still gets a console subscriber, so critical boot diagnostics are
/// never lost.
pub fn init(verbose: bool) -> LogGuard {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(if verbose { "debug" } else { "info" })
    });

    let (file_layer, guard, file_error) = match open_log_file() {
        Ok((writer, guard)) => (
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(true)
                    .with_thread_ids(true),
            ),
            Some(guard),
            None,
        ),
        Err(message) => (None, None, Some(message)),
    };

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    if let Some(message) = file_error {
        tracing::warn!("File logging disabled: {}", message);
    }

    LogGuard(guard)
}

/// Open a per-run `engine.log` under the app data directory.
fn open_log_file() -> Result<
    (
        tracing_appender::non_blocking::NonBlocking,
        tracing_appender::non_blocking::WorkerGuard,
    ),
    String,
> {
    let proj_dirs = ProjectDirs::from("com", "Arclight", "Arclight_Engine")
        .ok_or_else(|| "could not determine app data directory".to_string())?;
    let logs_dir = proj_dirs.data_dir().join("logs");
    let now = Local::now();
    let log_folder = logs_dir.join(format!("{}", now.format("%Y-%m-%d_%H-%M-%S")));
    fs::create_dir_all(&log_folder)
        .map_err(|e| format!("cannot create log directory {:?}: {}", log_folder, e))?;

    let engine_log_path = log_folder.join("engine.log");
    let engine_log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&engine_log_path)
        .map_err(|e| format!("cannot open {:?}: {}", engine_log_path, e))?;

    Ok(tracing_appender::non_blocking(engine_log_file))
}
