//! # hooks-core
//!
//! Non-blocking diagnostic hook engine for coding-agent session lifecycle
//! hooks: dev-server port detection at session start and end, and subagent
//! completion reporting.
//!
//! ## Design Principles
//!
//! - **Never blocks the host**: every failure degrades to a default and a
//!   lower health score. No hook returns an error or a non-zero exit status.
//! - **Per-invocation state**: settings are resolved once per run and passed
//!   down; nothing outlives the invocation except appended log lines.
//! - **Synchronous**: no async runtime. Probes fan out on scoped threads.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use hooks_core::{HookKind, HookRunner, StorageConfig};
//!
//! let runner = HookRunner::new(StorageConfig::resolve());
//! let summary = runner.run(HookKind::SessionStart, &mut std::io::stdout());
//! ```

pub mod error;
pub mod facts;
pub mod health;
pub mod orchestrator;
pub mod probe;
pub mod record;
pub mod report;
pub mod settings;
pub mod sinks;
pub mod storage;
pub mod types;

pub use error::{HookError, Result};
pub use facts::CompletionFacts;
pub use health::{HealthScore, Phase};
pub use orchestrator::{guarded, HookRunner, RunSummary};
pub use probe::{probe_all, CommandCheck, PortCheck, ProbeResult, ProbeState};
pub use record::{CompletionRecord, Outcome};
pub use report::DisplayOutcome;
pub use settings::{resolve, CompletionSettings, ConfigSource, Resolved, Settings, Target};
pub use sinks::{dispatch, ActivityLogSink, DispatchSummary, MonitoringLogSink, Sink, TracingSink};
pub use storage::StorageConfig;
pub use types::HookKind;
