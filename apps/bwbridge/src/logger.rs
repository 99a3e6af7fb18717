//! Logging for the bwbridge command line app.
//!
//! Colored output goes to stderr so stdout stays free for command results.
//! A plain copy goes to `bwbridge.log`.

use crate::error::BwBridgeError;

use std::io::stderr;
use std::path::Path;
use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

use fern::Dispatch;
use fern::colors::Color::{Blue, Green, Magenta, Red, Yellow};
use fern::colors::ColoredLevelConfig;
use humantime::format_rfc3339;
use log::{LevelFilter, info, warn};

static INIT_LOGGER_ONCE: Once = Once::new();

static LOGGER_ALREADY_CALLED: AtomicBool = AtomicBool::new(false);

pub const LOG_FILE_NAME: &str = "bwbridge.log";

const LOGGER_INITIALIZED_MESSAGE_PREFIX: &str = "Logger initialized with level: ";

const LOGGER_ALREADY_INITIALIZED_MESSAGE: &str = "Logger already initialized";

#[cfg(debug_assertions)]
pub const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Debug;

#[cfg(not(debug_assertions))]
pub const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Info;

/// Initialize the logger with dual output (stderr + file).
///
/// Safe to call more than once: later calls log a warning and return Ok.
/// `level` falls back to [`DEFAULT_LOG_LEVEL`].
///
/// # Errors
///
/// Returns an error if:
/// - Log file cannot be created
/// - Another global logger is already installed
pub fn initialize(log_dir: &Path, level: Option<LevelFilter>) -> Result<(), BwBridgeError> {
    if LOGGER_ALREADY_CALLED.swap(true, Ordering::SeqCst) {
        warn!("{LOGGER_ALREADY_INITIALIZED_MESSAGE}");
        return Ok(());
    }

    let level = level.unwrap_or(DEFAULT_LOG_LEVEL);
    let mut result = Ok(());

    INIT_LOGGER_ONCE.call_once(|| {
        result = initialize_internal(log_dir, level);
        if result.is_ok() {
            info!("{LOGGER_INITIALIZED_MESSAGE_PREFIX}{level:?}");
        }
    });

    result
}

#[track_caller]
pub(crate) fn initialize_internal(log_dir: &Path, level: LevelFilter) -> Result<(), BwBridgeError> {
    let log_file_path = log_dir.join(LOG_FILE_NAME);

    let color_configuration = ColoredLevelConfig::new()
        .debug(Blue)
        .info(Green)
        .warn(Yellow)
        .error(Red)
        .trace(Magenta);

    let base_dispatch = Dispatch::new().level(level);

    let stderr_dispatch = Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{date} - {level}] {message} [{target}]",
                date = format_rfc3339(SystemTime::now()),
                level = color_configuration.color(record.level()),
                message = message,
                target = record.target(),
            ))
        })
        .chain(stderr());

    let file_dispatch = Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{date} - {level}] {message} [{file}:{line}]",
                date = format_rfc3339(SystemTime::now()),
                level = record.level(),
                message = message,
                file = record.file().unwrap_or("unknown"),
                line = record.line().unwrap_or(0)
            ))
        })
        .chain(
            fern::log_file(&log_file_path)
                .map_err(|e| BwBridgeError::app(format!("Failed to create log file: {e}")))?,
        );

    base_dispatch
        .chain(stderr_dispatch)
        .chain(file_dispatch)
        .apply()
        .map_err(|e| BwBridgeError::app(format!("Failed to initialize logger: {e}")))?;

    Ok(())
}
