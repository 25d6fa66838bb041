//! Hook orchestration.
//!
//! `HookRunner::run` is the single entry point per hook invocation:
//!
//! ```text
//! resolve settings ──(disabled)──▶ return, nothing probed, logged, or printed
//!        │
//! gather facts (port probes | environment)
//!        │
//! score ─▶ build record ─▶ dispatch to sinks ─▶ report ─▶ score ─▶ health log
//! ```
//!
//! Every step goes through [`guarded`], which turns an error or a panic into
//! the step's default. Nothing here terminates the process.

use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::Result;
use crate::facts::CompletionFacts;
use crate::health::{HealthScore, Phase};
use crate::probe::{self, CommandCheck, PortCheck, ProbeResult, ProbeState};
use crate::record::{CompletionRecord, Outcome};
use crate::report::{self, DisplayOutcome};
use crate::settings::{self, CompletionSettings, ConfigSource, Resolved, Settings};
use crate::sinks::{self, ActivityLogSink, DispatchSummary, MonitoringLogSink, Sink, TracingSink};
use crate::storage::StorageConfig;
use crate::types::HookKind;

const HEALTH_LOG_FILE: &str = "health.log";

type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// What one invocation did. Informational only; the hook always succeeds.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub kind: HookKind,
    /// False when the hook was disabled by configuration.
    pub ran: bool,
    pub config_source: Option<ConfigSource>,
    pub probe_results: Vec<ProbeResult>,
    pub dispatch: DispatchSummary,
    pub display: DisplayOutcome,
    pub health: HealthScore,
}

impl RunSummary {
    fn skipped(kind: HookKind, source: ConfigSource) -> Self {
        Self {
            kind,
            ran: false,
            config_source: Some(source),
            probe_results: Vec::new(),
            dispatch: DispatchSummary::default(),
            display: DisplayOutcome::Suppressed,
            health: HealthScore::new(),
        }
    }
}

/// Runs `step`, substituting `fallback()` if it fails or panics.
///
/// The process panic hook still runs before the unwind is caught; the
/// `session-hook` binary replaces it so panics only reach the log.
pub fn guarded<T>(
    hook: HookKind,
    step: &'static str,
    fallback: impl FnOnce() -> T,
    run: impl FnOnce() -> Result<T>,
) -> T {
    match panic::catch_unwind(AssertUnwindSafe(run)) {
        Ok(Ok(value)) => value,
        Ok(Err(err)) => {
            tracing::warn!(hook = %hook, step, error = %err, "Hook step failed; using default");
            fallback()
        }
        Err(_) => {
            tracing::warn!(hook = %hook, step, "Hook step panicked; using default");
            fallback()
        }
    }
}

/// Wires settings, fact sources, sinks, and output for one hook invocation.
pub struct HookRunner {
    storage: StorageConfig,
    config_path: Option<PathBuf>,
    port_check: Option<Arc<dyn PortCheck>>,
    sinks: Option<Vec<Box<dyn Sink>>>,
    env: Option<EnvLookup>,
}

impl HookRunner {
    pub fn new(storage: StorageConfig) -> Self {
        Self {
            storage,
            config_path: None,
            port_check: None,
            sinks: None,
            env: None,
        }
    }

    /// Reads configuration from `path` instead of the storage default.
    pub fn with_config_path(mut self, path: PathBuf) -> Self {
        self.config_path = Some(path);
        self
    }

    /// Replaces the subprocess-backed check built from settings.
    pub fn with_port_check(mut self, check: Arc<dyn PortCheck>) -> Self {
        self.port_check = Some(check);
        self
    }

    /// Replaces the default activity, monitoring, and tracing sinks.
    pub fn with_sinks(mut self, sinks: Vec<Box<dyn Sink>>) -> Self {
        self.sinks = Some(sinks);
        self
    }

    /// Replaces process-environment reads for the completion hook.
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Some(Arc::new(lookup));
        self
    }

    pub fn run(&self, kind: HookKind, out: &mut dyn Write) -> RunSummary {
        if kind.is_probe() {
            self.run_probe_hook(kind, out)
        } else {
            self.run_completion_hook(kind, out)
        }
    }

    fn config_path(&self, kind: HookKind) -> PathBuf {
        self.config_path.clone().unwrap_or_else(|| {
            if kind.is_probe() {
                self.storage.processes_config_file()
            } else {
                self.storage.subagent_config_file()
            }
        })
    }

    fn default_sinks(&self, kind: HookKind) -> Vec<Box<dyn Sink>> {
        vec![
            Box::new(ActivityLogSink::new(self.storage.activity_stream_file())),
            Box::new(MonitoringLogSink::new(
                self.storage.monitoring_file(kind.monitoring_file()),
            )),
            Box::new(TracingSink),
        ]
    }

    fn dispatch(&self, kind: HookKind, record: &CompletionRecord) -> DispatchSummary {
        guarded(kind, "dispatch", DispatchSummary::default, || {
            Ok(match &self.sinks {
                Some(custom) => sinks::dispatch(record, custom),
                None => sinks::dispatch(record, &self.default_sinks(kind)),
            })
        })
    }

    fn finish(&self, kind: HookKind, score: &HealthScore) {
        let path = self.storage.monitoring_file(HEALTH_LOG_FILE);
        guarded(kind, "health-log", || (), || sinks::append_health(&path, &kind.to_string(), score));
        tracing::info!(
            hook = %kind,
            health = score.total(),
            config = score.points(Phase::Config),
            probe = score.points(Phase::Probe),
            display = score.points(Phase::Display),
            "Hook finished"
        );
    }

    fn run_probe_hook(&self, kind: HookKind, out: &mut dyn Write) -> RunSummary {
        let path = self.config_path(kind);
        let Resolved { settings, source } = guarded(
            kind,
            "settings",
            || Resolved {
                settings: Settings::default(),
                source: ConfigSource::Invalid,
            },
            || Ok(settings::resolve_processes(&path)),
        );
        if !settings.enabled {
            tracing::debug!(hook = %kind, "Port monitoring disabled");
            return RunSummary::skipped(kind, source);
        }

        let mut score = HealthScore::new();
        record_phase(kind, &mut score, Phase::Config, source.health_points());

        // The show flags only gate the summary; sinks log probe results regardless.
        let results = guarded(
            kind,
            "probe",
            || all_failed(&settings),
            || {
                let check: Arc<dyn PortCheck> = match &self.port_check {
                    Some(check) => Arc::clone(check),
                    None => Arc::new(CommandCheck::new(settings.probe_command.clone())),
                };
                Ok(probe::probe_all(
                    &settings.targets,
                    settings.timeout,
                    check.as_ref(),
                    settings.require_probe_command,
                ))
            },
        );
        record_phase(kind, &mut score, Phase::Probe, probe::health_points(&results));

        let record = guarded(
            kind,
            "record",
            || CompletionRecord::new(kind.event_name(), Outcome::Unknown),
            || Ok(CompletionRecord::from_probe(kind.event_name(), &results)),
        );
        let dispatch = self.dispatch(kind, &record);

        let display = guarded(
            kind,
            "report",
            || DisplayOutcome::Failed,
            || Ok(report::report_probe(out, kind, &settings, &results)),
        );
        record_phase(kind, &mut score, Phase::Display, display.health_points());

        self.finish(kind, &score);
        RunSummary {
            kind,
            ran: true,
            config_source: Some(source),
            probe_results: results,
            dispatch,
            display,
            health: score,
        }
    }

    fn run_completion_hook(&self, kind: HookKind, out: &mut dyn Write) -> RunSummary {
        let path = self.config_path(kind);
        let Resolved { settings, source } = guarded(
            kind,
            "settings",
            || Resolved {
                settings: CompletionSettings::default(),
                source: ConfigSource::Invalid,
            },
            || Ok(settings::resolve_completion(&path)),
        );
        if !settings.enabled {
            tracing::debug!(hook = %kind, "Completion reporting disabled");
            return RunSummary::skipped(kind, source);
        }

        let mut score = HealthScore::new();
        record_phase(kind, &mut score, Phase::Config, source.health_points());

        let facts = guarded(
            kind,
            "facts",
            || CompletionFacts::from_lookup(|_| None),
            || {
                Ok(match &self.env {
                    Some(lookup) => CompletionFacts::from_lookup(|key| (**lookup)(key)),
                    None => CompletionFacts::from_env(),
                })
            },
        );
        record_phase(kind, &mut score, Phase::Probe, facts.health_points());

        let record = guarded(
            kind,
            "record",
            || CompletionRecord::new(kind.event_name(), Outcome::Unknown),
            || Ok(facts.to_record()),
        );
        let dispatch = self.dispatch(kind, &record);

        let display = guarded(
            kind,
            "report",
            || DisplayOutcome::Failed,
            || Ok(report::report_completion(out, &settings, &facts)),
        );
        record_phase(kind, &mut score, Phase::Display, display.health_points());

        self.finish(kind, &score);
        RunSummary {
            kind,
            ran: true,
            config_source: Some(source),
            probe_results: Vec::new(),
            dispatch,
            display,
            health: score,
        }
    }
}

fn record_phase(kind: HookKind, score: &mut HealthScore, phase: Phase, points: i32) {
    guarded(kind, "score", || (), || score.record(phase, points).map(|_| ()));
}

fn all_failed(settings: &Settings) -> Vec<ProbeResult> {
    settings
        .enabled_targets()
        .map(|target| ProbeResult {
            target: target.clone(),
            state: ProbeState::CheckFailed,
        })
        .collect()
}
