//! File logging for the hook binary.
//!
//! Stdout belongs to the user-facing summary, so tracing output goes to a
//! daily-rotated file under the storage root. Any setup failure leaves
//! logging off rather than disturbing the hook.

use fs_err as fs;
use hooks_core::StorageConfig;
use std::env;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

const FILTER_ENV: &str = "SESSION_HOOKS_LOG";
const DEBUG_ENV: &str = "SESSION_HOOKS_DEBUG";
const LOG_PREFIX: &str = "session-hook";
const MAX_LOG_FILES: usize = 7;

pub fn init(storage: &StorageConfig) -> Option<WorkerGuard> {
    let dir = storage.logs_dir();
    fs::create_dir_all(&dir).ok()?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_PREFIX)
        .filename_suffix("log")
        .max_log_files(MAX_LOG_FILES)
        .build(&dir)
        .ok()?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .ok()?;

    Some(guard)
}

fn filter() -> EnvFilter {
    let debug_enabled = env::var(DEBUG_ENV)
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false);
    if debug_enabled {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    }
}
