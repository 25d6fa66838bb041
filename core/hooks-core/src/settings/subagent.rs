//! Settings for the subagent-stop completion hook.

use serde::{Deserialize, Serialize};

pub const DEFAULT_HEADER: &str = "Subagent Completion";
pub const DEFAULT_SUCCESS_MESSAGE: &str = "✓ Subagent [{type}] completed successfully";
pub const DEFAULT_FAILURE_MESSAGE: &str =
    "⚠️  Subagent [{type}] completed with errors (exit code: {code})";
pub const DEFAULT_MESSAGE: &str = "✓ Subagent [{type}] completed";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SubagentConfig {
    pub agent: CompletionSettings,
}

/// Immutable per-invocation settings for completion reporting.
///
/// Message templates accept `{type}` and `{code}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionSettings {
    pub enabled: bool,
    pub show_completion: bool,
    pub show_errors: bool,
    pub header: String,
    pub success_message: String,
    pub failure_message: String,
    pub default_message: String,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            show_completion: true,
            show_errors: true,
            header: DEFAULT_HEADER.to_string(),
            success_message: DEFAULT_SUCCESS_MESSAGE.to_string(),
            failure_message: DEFAULT_FAILURE_MESSAGE.to_string(),
            default_message: DEFAULT_MESSAGE.to_string(),
        }
    }
}

impl From<SubagentConfig> for CompletionSettings {
    fn from(config: SubagentConfig) -> Self {
        config.agent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_agent_section_keeps_remaining_defaults() {
        let config: SubagentConfig =
            serde_json::from_str(r#"{"agent": {"show_errors": false}}"#).unwrap();
        let settings = CompletionSettings::from(config);

        assert!(settings.enabled);
        assert!(!settings.show_errors);
        assert_eq!(settings.success_message, DEFAULT_SUCCESS_MESSAGE);
    }
}
