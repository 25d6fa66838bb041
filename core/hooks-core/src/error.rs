//! Error types for hook engine operations.
//!
//! Every variant is recovered at the boundary of the component that detects
//! it. Callers outside the crate only ever see these in logs.

use std::path::PathBuf;
use std::time::Duration;

use crate::health::Phase;

/// All errors that can occur while running a hook.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    // ─────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Configuration unavailable: {path}: {source}")]
    ConfigUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration malformed: {path}: {details}")]
    ConfigInvalid { path: PathBuf, details: String },

    // ─────────────────────────────────────────────────────────────────────
    // Probe Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Probe command unavailable: {0}")]
    ProbeUnavailable(String),

    #[error("Probe for port {port} timed out after {timeout:?}")]
    ProbeTimeout { port: String, timeout: Duration },

    #[error("Probe for port {port} failed: {details}")]
    ProbeExecution { port: String, details: String },

    // ─────────────────────────────────────────────────────────────────────
    // Output Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Sink {sink} write failed: {details}")]
    SinkWrite { sink: String, details: String },

    #[error("Format error: {0}")]
    Format(String),

    // ─────────────────────────────────────────────────────────────────────
    // Scoring Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Health phase {0:?} already recorded")]
    PhaseAlreadyRecorded(Phase),

    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience type alias for Results using HookError.
pub type Result<T> = std::result::Result<T, HookError>;

impl HookError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        HookError::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn sink(sink: &str, details: impl std::fmt::Display) -> Self {
        HookError::SinkWrite {
            sink: sink.to_string(),
            details: details.to_string(),
        }
    }
}
