//! Storage configuration and path management for session hooks.
//!
//! All file locations the hooks read or append to are decided here:
//!
//! - Config documents under `config/`
//! - The activity stream under `activity/`
//! - Monitoring logs under `debug/`
//! - Tracing output under `logs/`
//!
//! Production code uses `StorageConfig::resolve()`. Tests use
//! `StorageConfig::with_root(temp_dir)` for isolation.

use std::env;
use std::path::{Path, PathBuf};

/// Overrides the storage root when set.
pub const HOME_ENV: &str = "SESSION_HOOKS_HOME";

const DEFAULT_RELATIVE_ROOT: &str = ".claude/session-hooks";

/// Central configuration for all session-hook storage paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    root: PathBuf,
}

impl StorageConfig {
    /// Resolves the root from `SESSION_HOOKS_HOME`, then `~/.claude/session-hooks`.
    ///
    /// Falls back to the system temp directory when no home directory exists,
    /// so path resolution itself can never stop a hook.
    pub fn resolve() -> Self {
        if let Some(root) = env::var_os(HOME_ENV).filter(|value| !value.is_empty()) {
            return Self::with_root(PathBuf::from(root));
        }
        let root = dirs::home_dir()
            .map(|home| home.join(DEFAULT_RELATIVE_ROOT))
            .unwrap_or_else(|| env::temp_dir().join("session-hooks"));
        Self { root }
    }

    /// Creates a StorageConfig with a custom root directory.
    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Config Documents
    // ─────────────────────────────────────────────────────────────────────────────

    /// Port-monitoring config for the session-start and session-end hooks.
    pub fn processes_config_file(&self) -> PathBuf {
        self.root.join("config").join("processes.jsonc")
    }

    /// Completion config for the subagent-stop hook.
    pub fn subagent_config_file(&self) -> PathBuf {
        self.root.join("config").join("subagent.jsonc")
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Append-only Logs
    // ─────────────────────────────────────────────────────────────────────────────

    /// JSONL activity stream, one record per line.
    pub fn activity_stream_file(&self) -> PathBuf {
        self.root.join("activity").join("stream.jsonl")
    }

    /// Directory holding the plain-text monitoring logs.
    pub fn monitoring_dir(&self) -> PathBuf {
        self.root.join("debug")
    }

    pub fn monitoring_file(&self, filename: &str) -> PathBuf {
        self.monitoring_dir().join(filename)
    }

    /// Directory for the tracing file appender.
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_root_places_everything_under_root() {
        let storage = StorageConfig::with_root(PathBuf::from("/tmp/hooks-test"));

        assert_eq!(
            storage.processes_config_file(),
            PathBuf::from("/tmp/hooks-test/config/processes.jsonc")
        );
        assert_eq!(
            storage.subagent_config_file(),
            PathBuf::from("/tmp/hooks-test/config/subagent.jsonc")
        );
        assert_eq!(
            storage.activity_stream_file(),
            PathBuf::from("/tmp/hooks-test/activity/stream.jsonl")
        );
        assert_eq!(
            storage.monitoring_file("health.log"),
            PathBuf::from("/tmp/hooks-test/debug/health.log")
        );
        assert_eq!(storage.logs_dir(), PathBuf::from("/tmp/hooks-test/logs"));
    }
}
