//! The completion record handed to every logging sink.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::probe::{ProbeResult, ProbeState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failure,
    Unknown,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Outcome::Success => "success",
            Outcome::Failure => "failure",
            Outcome::Unknown => "unknown",
        })
    }
}

/// Built once per invocation; sinks only ever see `&CompletionRecord`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionRecord {
    pub event_name: String,
    pub context: BTreeMap<String, String>,
    pub timestamp: DateTime<Utc>,
    pub outcome: Outcome,
}

impl CompletionRecord {
    pub fn new(event_name: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            event_name: event_name.into(),
            context: BTreeMap::new(),
            timestamp: Utc::now(),
            outcome,
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.context.insert(key.to_string(), value.into());
        self
    }

    /// Summarizes a probe run.
    ///
    /// Success when every check answered, Failure when none did, Unknown
    /// otherwise.
    pub fn from_probe(event_name: &str, results: &[ProbeResult]) -> Self {
        let degraded: Vec<&str> = results
            .iter()
            .filter(|r| r.state.is_degraded())
            .map(|r| r.target.id.as_str())
            .collect();
        let listening: Vec<&str> = results
            .iter()
            .filter(|r| r.state == ProbeState::Listening)
            .map(|r| r.target.id.as_str())
            .collect();

        let outcome = if degraded.is_empty() {
            Outcome::Success
        } else if degraded.len() == results.len() {
            Outcome::Failure
        } else {
            Outcome::Unknown
        };

        CompletionRecord::new(event_name, outcome)
            .with("checked", results.len().to_string())
            .with("listening", listening.join(","))
            .with("degraded", degraded.join(","))
    }
}
