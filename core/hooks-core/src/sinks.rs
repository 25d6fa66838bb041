//! Logging sinks and the isolating dispatcher.
//!
//! Every sink receives the same read-only record. A sink that fails (or
//! panics) is logged and skipped; its siblings and the caller never notice.

use chrono::Utc;
use fs_err as fs;
use fs_err::OpenOptions;
use std::io::Write as _;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use crate::error::{HookError, Result};
use crate::health::{HealthScore, Phase};
use crate::record::CompletionRecord;

const MONITORING_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// An independent logging destination.
pub trait Sink: Send + Sync {
    /// Short identifier used in diagnostics.
    fn name(&self) -> &str;

    /// Appends the record. Fails when the backing store is unavailable.
    fn write(&self, record: &CompletionRecord) -> Result<()>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub delivered: Vec<String>,
    pub failed: Vec<String>,
}

/// Writes `record` to every sink in registration order.
pub fn dispatch(record: &CompletionRecord, sinks: &[Box<dyn Sink>]) -> DispatchSummary {
    let mut summary = DispatchSummary::default();

    for sink in sinks {
        let name = sink.name().to_string();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| sink.write(record)));
        match outcome {
            Ok(Ok(())) => summary.delivered.push(name),
            Ok(Err(err)) => {
                tracing::warn!(sink = %name, error = %err, "Sink write failed");
                summary.failed.push(name);
            }
            Err(_) => {
                tracing::warn!(sink = %name, "Sink panicked during write");
                summary.failed.push(name);
            }
        }
    }

    summary
}

fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", line)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Activity Log
// ═══════════════════════════════════════════════════════════════════════════════

/// Appends records as JSON lines to the activity stream.
#[derive(Debug, Clone)]
pub struct ActivityLogSink {
    path: PathBuf,
}

impl ActivityLogSink {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl Sink for ActivityLogSink {
    fn name(&self) -> &str {
        "activity"
    }

    fn write(&self, record: &CompletionRecord) -> Result<()> {
        let line = serde_json::to_string(record).map_err(|err| HookError::sink(self.name(), err))?;
        append_line(&self.path, &line).map_err(|err| HookError::sink(self.name(), err))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Monitoring Log
// ═══════════════════════════════════════════════════════════════════════════════

/// Appends `[timestamp] event=... key=value ... outcome=...` lines for grepping.
#[derive(Debug, Clone)]
pub struct MonitoringLogSink {
    path: PathBuf,
}

impl MonitoringLogSink {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn format_line(record: &CompletionRecord) -> String {
        let mut line = format!(
            "[{}] event={}",
            record.timestamp.format(MONITORING_TIMESTAMP_FORMAT),
            record.event_name
        );
        for (key, value) in &record.context {
            line.push_str(&format!(" {}={}", key, quote_if_needed(value)));
        }
        line.push_str(&format!(" outcome={}", record.outcome));
        line
    }
}

impl Sink for MonitoringLogSink {
    fn name(&self) -> &str {
        "monitoring"
    }

    fn write(&self, record: &CompletionRecord) -> Result<()> {
        append_line(&self.path, &Self::format_line(record))
            .map_err(|err| HookError::sink(self.name(), err))
    }
}

fn quote_if_needed(value: &str) -> String {
    if value.is_empty() || value.contains(char::is_whitespace) || value.contains('"') {
        format!("{:?}", value)
    } else {
        value.to_string()
    }
}

/// Appends the invocation's health breakdown to the monitoring log.
pub fn append_health(path: &Path, hook: &str, score: &HealthScore) -> Result<()> {
    let line = format!(
        "[{}] hook={} health={} config={} probe={} display={}",
        Utc::now().format(MONITORING_TIMESTAMP_FORMAT),
        hook,
        score.total(),
        score.points(Phase::Config),
        score.points(Phase::Probe),
        score.points(Phase::Display),
    );
    append_line(path, &line).map_err(|err| HookError::io("append health line", err))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tracing
// ═══════════════════════════════════════════════════════════════════════════════

/// Emits the record as a structured tracing event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl Sink for TracingSink {
    fn name(&self) -> &str {
        "tracing"
    }

    fn write(&self, record: &CompletionRecord) -> Result<()> {
        tracing::info!(
            event = %record.event_name,
            outcome = %record.outcome,
            context = ?record.context,
            "Hook completion"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Outcome;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingSink {
        name: &'static str,
        fail: bool,
        writes: Arc<AtomicUsize>,
    }

    impl Sink for CountingSink {
        fn name(&self) -> &str {
            self.name
        }

        fn write(&self, _record: &CompletionRecord) -> Result<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(HookError::sink(self.name, "store unavailable"))
            } else {
                Ok(())
            }
        }
    }

    struct PanickingSink;

    impl Sink for PanickingSink {
        fn name(&self) -> &str {
            "panicking"
        }

        fn write(&self, _record: &CompletionRecord) -> Result<()> {
            panic!("sink blew up");
        }
    }

    fn counting(name: &'static str, fail: bool) -> (Box<dyn Sink>, Arc<AtomicUsize>) {
        let writes = Arc::new(AtomicUsize::new(0));
        let sink = CountingSink {
            name,
            fail,
            writes: Arc::clone(&writes),
        };
        (Box::new(sink), writes)
    }

    #[test]
    fn failing_middle_sink_does_not_block_siblings() {
        let (first, first_writes) = counting("first", false);
        let (second, second_writes) = counting("second", true);
        let (third, third_writes) = counting("third", false);
        let sinks = vec![first, second, third];

        let summary = dispatch(&CompletionRecord::new("Test", Outcome::Success), &sinks);

        assert_eq!(first_writes.load(Ordering::SeqCst), 1);
        assert_eq!(second_writes.load(Ordering::SeqCst), 1);
        assert_eq!(third_writes.load(Ordering::SeqCst), 1);
        assert_eq!(summary.delivered, vec!["first", "third"]);
        assert_eq!(summary.failed, vec!["second"]);
    }

    #[test]
    fn all_sinks_failing_still_returns() {
        let (a, _) = counting("a", true);
        let sinks: Vec<Box<dyn Sink>> = vec![a, Box::new(PanickingSink)];

        let summary = dispatch(&CompletionRecord::new("Test", Outcome::Failure), &sinks);

        assert!(summary.delivered.is_empty());
        assert_eq!(summary.failed, vec!["a", "panicking"]);
    }

    #[test]
    fn activity_sink_appends_json_lines() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("activity").join("stream.jsonl");
        let sink = ActivityLogSink::new(path.clone());

        let record = CompletionRecord::new("SubagentStop", Outcome::Success).with("type", "research");
        sink.write(&record).unwrap();
        sink.write(&record).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed["event_name"], "SubagentStop");
        assert_eq!(parsed["outcome"], "success");
        assert_eq!(parsed["context"]["type"], "research");
    }

    #[test]
    fn activity_sink_fails_when_parent_is_a_file() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let blocker = temp_dir.path().join("activity");
        fs::write(&blocker, "not a directory").unwrap();
        let sink = ActivityLogSink::new(blocker.join("stream.jsonl"));

        let err = sink
            .write(&CompletionRecord::new("Test", Outcome::Unknown))
            .unwrap_err();
        assert!(matches!(err, HookError::SinkWrite { .. }));
    }

    #[test]
    fn monitoring_line_is_key_value() {
        let record = CompletionRecord::new("SubagentStop", Outcome::Failure)
            .with("type", "research")
            .with("error", "exit status 2");

        let line = MonitoringLogSink::format_line(&record);
        assert!(line.starts_with('['));
        assert!(line.ends_with(
            "event=SubagentStop error=\"exit status 2\" type=research outcome=failure"
        ));
    }

    #[test]
    fn health_line_is_appended() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("debug").join("health.log");
        let mut score = HealthScore::new();
        score.record(Phase::Config, 15).unwrap();
        score.record(Phase::Probe, 20).unwrap();
        score.record(Phase::Display, 20).unwrap();

        append_health(&path, "session-start", &score).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content
            .trim_end()
            .ends_with("hook=session-start health=55 config=15 probe=20 display=20"));
    }
}
