//! Shared hook identifiers.

use serde::Serialize;
use std::fmt;

/// The host lifecycle event a hook invocation is serving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum HookKind {
    SessionStart,
    SessionEnd,
    SubagentStop,
}

impl HookKind {
    /// Event name recorded in the logging sinks.
    pub fn event_name(self) -> &'static str {
        match self {
            HookKind::SessionStart => "SessionStart",
            HookKind::SessionEnd => "SessionEnd",
            HookKind::SubagentStop => "SubagentStop",
        }
    }

    /// Monitoring log file the hook's completion records go to.
    pub fn monitoring_file(self) -> &'static str {
        match self {
            HookKind::SessionStart | HookKind::SessionEnd => "ports.log",
            HookKind::SubagentStop => "subagents.log",
        }
    }

    pub fn is_probe(self) -> bool {
        matches!(self, HookKind::SessionStart | HookKind::SessionEnd)
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HookKind::SessionStart => "session-start",
            HookKind::SessionEnd => "session-end",
            HookKind::SubagentStop => "subagent-stop",
        })
    }
}
