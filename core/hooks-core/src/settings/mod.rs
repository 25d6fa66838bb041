//! Settings resolution for hook invocations.
//!
//! A hook resolves its settings exactly once, at the start of the invocation,
//! and passes the snapshot down. Resolution never fails: a missing or broken
//! document yields the compiled-in defaults, and the outcome is reported as a
//! [`ConfigSource`] so the health scorer can account for it.

mod jsonc;
mod processes;
mod subagent;

pub use jsonc::strip_comments;
pub use processes::{
    BehaviorConfig, DisplayConfig, DisplaySettings, PortConfig, PortsConfig, ProcessesConfig,
    Settings, Target,
};
pub use subagent::{CompletionSettings, SubagentConfig};

use fs_err as fs;
use serde::de::DeserializeOwned;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::{HookError, Result};

/// How the settings snapshot was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    Loaded,
    /// File absent or unreadable.
    Missing,
    /// File readable but malformed.
    Invalid,
}

impl ConfigSource {
    pub fn health_points(self) -> i32 {
        match self {
            ConfigSource::Loaded => 20,
            ConfigSource::Missing => 15,
            ConfigSource::Invalid => 10,
        }
    }
}

/// A settings snapshot plus where it came from.
#[derive(Debug, Clone)]
pub struct Resolved<T> {
    pub settings: T,
    pub source: ConfigSource,
}

/// Loads the document at `path` as `D` and converts it into settings `T`.
///
/// Any failure discards the partial result and returns `T::default()`.
pub fn resolve<D, T>(path: &Path) -> Resolved<T>
where
    D: DeserializeOwned,
    T: From<D> + Default,
{
    match load_document::<D>(path) {
        Ok(document) => Resolved {
            settings: T::from(document),
            source: ConfigSource::Loaded,
        },
        Err(HookError::ConfigUnavailable { source, .. }) => {
            if source.kind() == ErrorKind::NotFound {
                tracing::debug!(path = %path.display(), "Config missing; using defaults");
            } else {
                tracing::warn!(path = %path.display(), error = %source, "Config unreadable; using defaults");
            }
            Resolved {
                settings: T::default(),
                source: ConfigSource::Missing,
            }
        }
        Err(err) => {
            tracing::warn!(error = %err, "Config invalid; using defaults");
            Resolved {
                settings: T::default(),
                source: ConfigSource::Invalid,
            }
        }
    }
}

/// Port-monitoring settings for the session-start and session-end hooks.
pub fn resolve_processes(path: &Path) -> Resolved<Settings> {
    resolve::<ProcessesConfig, Settings>(path)
}

/// Completion settings for the subagent-stop hook.
pub fn resolve_completion(path: &Path) -> Resolved<CompletionSettings> {
    resolve::<SubagentConfig, CompletionSettings>(path)
}

fn load_document<D: DeserializeOwned>(path: &Path) -> Result<D> {
    let content = fs::read_to_string(path).map_err(|source| HookError::ConfigUnavailable {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&strip_comments(&content)).map_err(|err| HookError::ConfigInvalid {
        path: path.to_path_buf(),
        details: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn missing_file_yields_defaults() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let resolved = resolve_processes(&temp_dir.path().join("processes.jsonc"));

        assert_eq!(resolved.source, ConfigSource::Missing);
        assert_eq!(resolved.settings, Settings::default());
        assert_eq!(resolved.source.health_points(), 15);
    }

    #[test]
    fn malformed_file_yields_defaults() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("processes.jsonc");
        fs_err::write(&path, "{ \"ports\": { \"enabled\": false, ").unwrap();

        let resolved = resolve_processes(&path);
        assert_eq!(resolved.source, ConfigSource::Invalid);
        assert!(resolved.settings.enabled);
        assert_eq!(resolved.source.health_points(), 10);
    }

    #[test]
    fn type_mismatch_rejects_whole_file() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("processes.jsonc");
        fs_err::write(
            &path,
            r#"{"ports": {"enabled": false}, "behavior": {"timeout_seconds": "soon"}}"#,
        )
        .unwrap();

        let resolved = resolve_processes(&path);
        assert_eq!(resolved.source, ConfigSource::Invalid);
        assert!(resolved.settings.enabled);
    }

    #[test]
    fn directory_in_place_of_file_counts_as_missing() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let resolved = resolve_processes(temp_dir.path());
        assert_eq!(resolved.source, ConfigSource::Missing);
    }

    #[test]
    fn jsonc_document_loads() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("processes.jsonc");
        fs_err::write(
            &path,
            r#"{
  // Port monitoring
  "ports": {
    "enabled": true,
    "monitored_ports": [
      { "number": "3000", "description": "React/Next.js", "enabled": true },
      { "number": "8000", "description": "Django", "enabled": false }
    ],
    "custom_ports": ["9000"]
  },
  /* Presentation */
  "display": { "separator": " | ", "show_descriptions": true },
  "behavior": { "timeout_seconds": 1, "check_command": "ss" }
}"#,
        )
        .unwrap();

        let resolved = resolve_processes(&path);
        assert_eq!(resolved.source, ConfigSource::Loaded);
        assert_eq!(resolved.source.health_points(), 20);

        let settings = resolved.settings;
        assert_eq!(settings.targets.len(), 3);
        assert!(!settings.targets[1].enabled);
        assert_eq!(settings.display.separator, " | ");
        assert!(settings.display.show_labels);
        assert_eq!(settings.display.icon, "🔌");
        assert_eq!(settings.timeout, Duration::from_secs(1));
        assert_eq!(settings.probe_command, "ss");
    }

    #[test]
    fn completion_settings_resolve_from_agent_section() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("subagent.jsonc");
        fs_err::write(&path, r#"{"agent": {"enabled": false}}"#).unwrap();

        let resolved = resolve_completion(&path);
        assert_eq!(resolved.source, ConfigSource::Loaded);
        assert!(!resolved.settings.enabled);
    }
}
