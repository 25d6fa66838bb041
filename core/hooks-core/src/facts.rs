//! Environment fact extraction for the subagent-stop hook.
//!
//! All environment reads happen here, once, producing an immutable
//! [`CompletionFacts`] that later phases consume.

use serde::Serialize;
use std::env;

use crate::record::{CompletionRecord, Outcome};

pub const TYPE_ENV: &str = "SUBAGENT_TYPE";
pub const STATUS_ENV: &str = "SUBAGENT_STATUS";
pub const EXIT_CODE_ENV: &str = "SUBAGENT_EXIT_CODE";
pub const ERROR_ENV: &str = "SUBAGENT_ERROR";

pub const UNKNOWN_TYPE: &str = "unknown";
pub const EVENT_NAME: &str = "SubagentStop";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionFacts {
    pub agent_type: String,
    pub status: String,
    pub exit_code: String,
    pub error: String,
    /// How many of the four variables were actually set.
    #[serde(skip)]
    present: usize,
}

impl CompletionFacts {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds facts from an arbitrary key lookup; empty values count as absent.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let agent_type = read(TYPE_ENV);
        let status = read(STATUS_ENV);
        let exit_code = read(EXIT_CODE_ENV);
        let error = read(ERROR_ENV);
        let present = [&agent_type, &status, &exit_code, &error]
            .iter()
            .filter(|value| value.is_some())
            .count();

        Self {
            agent_type: agent_type.unwrap_or_else(|| UNKNOWN_TYPE.to_string()),
            status: status.unwrap_or_default(),
            exit_code: exit_code.unwrap_or_default(),
            error: error.unwrap_or_default(),
            present,
        }
    }

    /// Outcome recorded to sinks: any failure signal wins.
    pub fn outcome(&self) -> Outcome {
        if self.status == "failure" || self.has_failing_exit_code() {
            Outcome::Failure
        } else if self.status == "success" || self.exit_code == "0" {
            Outcome::Success
        } else {
            Outcome::Unknown
        }
    }

    /// Outcome the banner is chosen by: any success signal wins.
    pub fn display_outcome(&self) -> Outcome {
        if self.status == "success" || self.exit_code == "0" {
            Outcome::Success
        } else if self.status == "failure" || self.has_failing_exit_code() {
            Outcome::Failure
        } else {
            Outcome::Unknown
        }
    }

    fn has_failing_exit_code(&self) -> bool {
        !self.exit_code.is_empty() && self.exit_code != "0"
    }

    /// Fact-phase health: +40 with type and a status signal, +20 with some
    /// facts, −10 with none.
    pub fn health_points(&self) -> i32 {
        let has_signal = !self.status.is_empty() || !self.exit_code.is_empty();
        if self.agent_type != UNKNOWN_TYPE && has_signal {
            40
        } else if self.present > 0 {
            20
        } else {
            -10
        }
    }

    pub fn to_record(&self) -> CompletionRecord {
        CompletionRecord::new(EVENT_NAME, self.outcome())
            .with("type", self.agent_type.clone())
            .with("status", self.status.clone())
            .with("exit_code", self.exit_code.clone())
            .with("error", self.error.clone())
    }
}
