//! Deadline-bounded port probing.
//!
//! Each enabled target gets exactly one check, run on its own scoped thread
//! with its own deadline. A slow or failing check never blocks or cancels
//! its siblings, and results come back in input order regardless of which
//! check finished first.
//!
//! ## Classification
//!
//! ```text
//! exit 0, non-empty stdout      → Listening
//! exit 0, empty stdout          → NotListening
//! spawn failure / non-zero exit → CheckFailed
//! deadline exceeded             → TimedOut   (child killed and reaped)
//! ```

use serde::Serialize;
use std::env;
use std::fmt;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{HookError, Result};
use crate::settings::Target;

const POLL_INTERVAL_MS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeState {
    Listening,
    NotListening,
    CheckFailed,
    TimedOut,
}

impl ProbeState {
    /// True when the check itself did not produce an answer.
    pub fn is_degraded(self) -> bool {
        matches!(self, ProbeState::CheckFailed | ProbeState::TimedOut)
    }
}

impl fmt::Display for ProbeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ProbeState::Listening => "listening",
            ProbeState::NotListening => "not listening",
            ProbeState::CheckFailed => "check failed",
            ProbeState::TimedOut => "timed out",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeResult {
    pub target: Target,
    pub state: ProbeState,
}

impl From<Result<bool>> for ProbeState {
    fn from(outcome: Result<bool>) -> Self {
        match outcome {
            Ok(true) => ProbeState::Listening,
            Ok(false) => ProbeState::NotListening,
            Err(HookError::ProbeTimeout { .. }) => ProbeState::TimedOut,
            Err(_) => ProbeState::CheckFailed,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Port Check Backends
// ═══════════════════════════════════════════════════════════════════════════════

/// A single bounded check of one port.
///
/// Implementors must return within roughly `timeout` and report an overrun as
/// `HookError::ProbeTimeout`.
pub trait PortCheck: Send + Sync {
    /// `Ok(true)` when something is listening on `port`.
    fn check(&self, port: &str, timeout: Duration) -> Result<bool>;

    /// Whether the backing tool can be found at all.
    fn is_available(&self) -> bool {
        true
    }
}

/// Checks ports by running `lsof` (or `ss`) as a subprocess.
#[derive(Debug, Clone)]
pub struct CommandCheck {
    program: String,
}

impl CommandCheck {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn args_for(&self, port: &str) -> Vec<String> {
        let name = Path::new(&self.program)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(&self.program);
        match name {
            "ss" => vec![
                "-Htln".to_string(),
                "sport".to_string(),
                "=".to_string(),
                format!(":{}", port),
            ],
            _ => vec![
                "-i".to_string(),
                format!(":{}", port),
                "-sTCP:LISTEN".to_string(),
                "-t".to_string(),
            ],
        }
    }
}

impl PortCheck for CommandCheck {
    fn check(&self, port: &str, timeout: Duration) -> Result<bool> {
        let mut command = Command::new(&self.program);
        command.args(self.args_for(port));

        let (status, stdout) = run_with_deadline(command, &self.program, port, timeout)?;
        if !status.success() {
            return Err(HookError::ProbeExecution {
                port: port.to_string(),
                details: format!("{} exited with {}", self.program, status),
            });
        }
        Ok(!String::from_utf8_lossy(&stdout).trim().is_empty())
    }

    fn is_available(&self) -> bool {
        command_exists(&self.program)
    }
}

fn run_with_deadline(
    mut command: Command,
    program: &str,
    port: &str,
    timeout: Duration,
) -> Result<(ExitStatus, Vec<u8>)> {
    // A timeout too large to add to the clock means no practical deadline.
    let deadline = Instant::now().checked_add(timeout);
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|err| match err.kind() {
            ErrorKind::NotFound => HookError::ProbeUnavailable(format!("{}: {}", program, err)),
            _ => HookError::ProbeExecution {
                port: port.to_string(),
                details: format!("failed to spawn {}: {}", program, err),
            },
        })?;

    // Drain stdout off-thread so a chatty child can't stall on a full pipe.
    let (tx, rx) = mpsc::channel();
    if let Some(mut stdout) = child.stdout.take() {
        thread::spawn(move || {
            let mut buffer = Vec::new();
            let _ = stdout.read_to_end(&mut buffer);
            let _ = tx.send(buffer);
        });
    }

    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                let stdout = match deadline {
                    Some(deadline) => {
                        let remaining = deadline.saturating_duration_since(Instant::now());
                        rx.recv_timeout(remaining).unwrap_or_default()
                    }
                    None => rx.recv().unwrap_or_default(),
                };
                return Ok((status, stdout));
            }
            Ok(None) => {
                let mut pause = Duration::from_millis(POLL_INTERVAL_MS);
                if let Some(deadline) = deadline {
                    let now = Instant::now();
                    if now >= deadline {
                        abandon(&mut child);
                        return Err(HookError::ProbeTimeout {
                            port: port.to_string(),
                            timeout,
                        });
                    }
                    pause = pause.min(deadline - now);
                }
                thread::sleep(pause);
            }
            Err(err) => {
                abandon(&mut child);
                return Err(HookError::ProbeExecution {
                    port: port.to_string(),
                    details: format!("failed to wait on {}: {}", program, err),
                });
            }
        }
    }
}

fn abandon(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Resolves `program` the way a shell would: explicit paths are checked
/// directly, bare names are searched on `PATH`.
pub fn command_exists(program: &str) -> bool {
    if program.is_empty() {
        return false;
    }
    if program.contains(std::path::MAIN_SEPARATOR) {
        return Path::new(program).is_file();
    }
    env::var_os("PATH")
        .map(|paths| env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
        .unwrap_or(false)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Fan-out / Fan-in
// ═══════════════════════════════════════════════════════════════════════════════

/// Probes every enabled target, one result per target in input order.
///
/// With `require_command` set and the backend unavailable, no check runs and
/// every enabled target is reported as `CheckFailed`.
pub fn probe_all(
    targets: &[Target],
    timeout: Duration,
    check: &dyn PortCheck,
    require_command: bool,
) -> Vec<ProbeResult> {
    let enabled: Vec<&Target> = targets.iter().filter(|target| target.enabled).collect();

    if require_command && !check.is_available() {
        tracing::warn!(targets = enabled.len(), "Probe command unavailable; skipping checks");
        return enabled
            .into_iter()
            .map(|target| ProbeResult {
                target: target.clone(),
                state: ProbeState::CheckFailed,
            })
            .collect();
    }

    thread::scope(|scope| {
        let handles: Vec<_> = enabled
            .iter()
            .map(|target| {
                let port = target.id.as_str();
                scope.spawn(move || {
                    let outcome = check.check(port, timeout);
                    if let Err(err) = &outcome {
                        tracing::debug!(port, error = %err, "Port check degraded");
                    }
                    ProbeState::from(outcome)
                })
            })
            .collect();

        enabled
            .iter()
            .zip(handles)
            .map(|(target, handle)| ProbeResult {
                target: (*target).clone(),
                state: handle.join().unwrap_or(ProbeState::CheckFailed),
            })
            .collect()
    })
}

/// Probe-phase health: +40 when every check answered, +20 when some did,
/// −10 when none did.
pub fn health_points(results: &[ProbeResult]) -> i32 {
    let degraded = results.iter().filter(|r| r.state.is_degraded()).count();
    if degraded == 0 {
        40
    } else if degraded < results.len() {
        20
    } else {
        -10
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted backend keyed by port.
    struct FakeCheck {
        answers: HashMap<&'static str, ProbeState>,
        available: bool,
        calls: AtomicUsize,
    }

    impl FakeCheck {
        fn new(answers: &[(&'static str, ProbeState)]) -> Self {
            Self {
                answers: answers.iter().copied().collect(),
                available: true,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl PortCheck for FakeCheck {
        fn check(&self, port: &str, timeout: Duration) -> Result<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.answers.get(port).copied() {
                Some(ProbeState::Listening) => Ok(true),
                Some(ProbeState::NotListening) => Ok(false),
                Some(ProbeState::TimedOut) => Err(HookError::ProbeTimeout {
                    port: port.to_string(),
                    timeout,
                }),
                Some(ProbeState::CheckFailed) | None => Err(HookError::ProbeExecution {
                    port: port.to_string(),
                    details: "scripted failure".to_string(),
                }),
            }
        }

        fn is_available(&self) -> bool {
            self.available
        }
    }

    fn targets(ids: &[&str]) -> Vec<Target> {
        ids.iter().map(|id| Target::new(*id, "")).collect()
    }

    #[test]
    fn results_follow_input_order_and_skip_disabled() {
        let mut list = targets(&["3000", "8000", "8080"]);
        list[1].enabled = false;
        let check = FakeCheck::new(&[
            ("3000", ProbeState::NotListening),
            ("8080", ProbeState::Listening),
        ]);

        let results = probe_all(&list, Duration::from_secs(1), &check, false);

        let summary: Vec<_> = results
            .iter()
            .map(|r| (r.target.id.as_str(), r.state))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("3000", ProbeState::NotListening),
                ("8080", ProbeState::Listening)
            ]
        );
        assert_eq!(check.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn one_failure_does_not_affect_siblings() {
        let list = targets(&["1", "2", "3"]);
        let check = FakeCheck::new(&[
            ("1", ProbeState::Listening),
            ("2", ProbeState::TimedOut),
            ("3", ProbeState::Listening),
        ]);

        let states: Vec<_> = probe_all(&list, Duration::from_secs(1), &check, false)
            .into_iter()
            .map(|r| r.state)
            .collect();
        assert_eq!(
            states,
            vec![
                ProbeState::Listening,
                ProbeState::TimedOut,
                ProbeState::Listening
            ]
        );
    }

    #[test]
    fn required_but_unavailable_command_fails_every_target_without_running() {
        let list = targets(&["3000", "8080"]);
        let mut check = FakeCheck::new(&[("3000", ProbeState::Listening)]);
        check.available = false;

        let results = probe_all(&list, Duration::from_secs(1), &check, true);

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.state == ProbeState::CheckFailed));
        assert_eq!(check.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unavailable_command_is_still_attempted_when_not_required() {
        let list = targets(&["3000"]);
        let mut check = FakeCheck::new(&[("3000", ProbeState::Listening)]);
        check.available = false;

        let results = probe_all(&list, Duration::from_secs(1), &check, false);
        assert_eq!(results[0].state, ProbeState::Listening);
    }

    #[test]
    fn health_points_by_outcome_mix() {
        let ok = |s| ProbeResult {
            target: Target::new("1", ""),
            state: s,
        };
        assert_eq!(health_points(&[]), 40);
        assert_eq!(
            health_points(&[ok(ProbeState::Listening), ok(ProbeState::NotListening)]),
            40
        );
        assert_eq!(
            health_points(&[ok(ProbeState::Listening), ok(ProbeState::CheckFailed)]),
            20
        );
        assert_eq!(
            health_points(&[ok(ProbeState::TimedOut), ok(ProbeState::CheckFailed)]),
            -10
        );
    }

    #[test]
    fn missing_binary_is_check_failed() {
        let _guard = script_lock();
        let check = CommandCheck::new("definitely-not-a-real-probe-binary");
        assert!(!check.is_available());

        let state = ProbeState::from(check.check("3000", Duration::from_secs(1)));
        assert_eq!(state, ProbeState::CheckFailed);
    }

    #[test]
    fn lsof_and_ss_argument_shapes() {
        assert_eq!(
            CommandCheck::new("lsof").args_for("3000"),
            vec!["-i", ":3000", "-sTCP:LISTEN", "-t"]
        );
        assert_eq!(
            CommandCheck::new("/usr/sbin/ss").args_for("8080"),
            vec!["-Htln", "sport", "=", ":8080"]
        );
    }

    static SCRIPT_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

    /// Serializes subprocess tests so no fork inherits a script's write handle.
    fn script_lock() -> std::sync::MutexGuard<'static, ()> {
        SCRIPT_LOCK
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Writes an executable stand-in named `name` into `dir`.
    #[cfg(unix)]
    fn write_script(dir: &Path, name: &str, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        fs_err::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs_err::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[cfg(unix)]
    fn command_state(name: &str, body: &str, port: &str, timeout: Duration) -> ProbeState {
        let _guard = script_lock();
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let check = CommandCheck::new(write_script(temp_dir.path(), name, body));
        ProbeState::from(check.check(port, timeout))
    }

    #[cfg(unix)]
    #[test]
    fn exit_zero_with_output_is_listening() {
        let state = command_state("lsof", "echo 4242", "3000", Duration::from_secs(2));
        assert_eq!(state, ProbeState::Listening);
    }

    #[cfg(unix)]
    #[test]
    fn exit_zero_without_output_is_not_listening() {
        let state = command_state("lsof", "exit 0", "3000", Duration::from_secs(2));
        assert_eq!(state, ProbeState::NotListening);
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_is_check_failed_even_with_output() {
        let state = command_state("lsof", "echo 4242; exit 1", "3000", Duration::from_secs(2));
        assert_eq!(state, ProbeState::CheckFailed);
    }

    #[cfg(unix)]
    #[test]
    fn overrun_is_timed_out() {
        let started = Instant::now();
        let state = command_state("lsof", "exec sleep 5", "3000", Duration::from_millis(200));
        assert_eq!(state, ProbeState::TimedOut);
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[cfg(unix)]
    #[test]
    fn ss_backend_receives_sport_filter() {
        let body = r#"[ "$1" = "-Htln" ] && [ "$4" = ":8080" ] || exit 2
echo "LISTEN 0 511 0.0.0.0:8080 0.0.0.0:*""#;
        assert_eq!(
            command_state("ss", body, "8080", Duration::from_secs(2)),
            ProbeState::Listening
        );
        assert_eq!(
            command_state("ss", "exit 0", "8080", Duration::from_secs(2)),
            ProbeState::NotListening
        );
    }

    #[cfg(unix)]
    #[test]
    fn timeout_beyond_clock_range_still_answers() {
        let timeout = Duration::from_secs(i64::MAX as u64);
        assert_eq!(
            command_state("lsof", "echo 4242", "3000", timeout),
            ProbeState::Listening
        );
        assert_eq!(
            command_state("lsof", "exit 0", "3000", Duration::MAX),
            ProbeState::NotListening
        );
    }
}
