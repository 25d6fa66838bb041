//! session-hook: diagnostic hooks for coding-agent session lifecycle events.
//!
//! Called directly by the host's hook configuration, one subcommand per event.
//! Every subcommand exits 0, whatever happens inside.
//!
//! ## Subcommands
//!
//! - `session-start`: report dev servers already listening
//! - `session-end`: remind about dev servers still listening
//! - `subagent-stop`: report subagent completion from `SUBAGENT_*` variables

mod logging;

use clap::{Parser, Subcommand};
use hooks_core::{HookKind, HookRunner, StorageConfig};
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "session-hook")]
#[command(about = "Session lifecycle diagnostic hooks")]
#[command(version)]
struct Cli {
    /// Config file to read instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report dev servers listening when a session starts
    SessionStart,

    /// Remind about dev servers still listening when a session ends
    SessionEnd,

    /// Report an autonomous subagent's completion
    SubagentStop,
}

impl From<&Commands> for HookKind {
    fn from(command: &Commands) -> Self {
        match command {
            Commands::SessionStart => HookKind::SessionStart,
            Commands::SessionEnd => HookKind::SessionEnd,
            Commands::SubagentStop => HookKind::SubagentStop,
        }
    }
}

fn main() {
    // Usage errors print and still exit 0 so a misconfigured hook never blocks the host.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return;
        }
    };

    let storage = StorageConfig::resolve();
    let _logging_guard = logging::init(&storage);

    // Hook steps recover from panics; keep the default hook's report off the host's stderr.
    std::panic::set_hook(Box::new(|info| {
        tracing::error!(panic = %info, "Hook step panicked");
    }));
    tracing::debug!(root = %storage.root().display(), "Resolved storage root");

    let kind = HookKind::from(&cli.command);
    let mut runner = HookRunner::new(storage);
    if let Some(path) = cli.config {
        runner = runner.with_config_path(path);
    }

    let stdout = io::stdout();
    let summary = runner.run(kind, &mut stdout.lock());
    tracing::debug!(
        hook = %kind,
        ran = summary.ran,
        health = summary.health.total(),
        sinks_failed = summary.dispatch.failed.len(),
        "session-hook exiting"
    );
}
