//! Port-monitoring settings for the session-start and session-end hooks.
//!
//! `ProcessesConfig` mirrors the on-disk document (`ports`, `display`,
//! `behavior` sections). `Settings` is the validated snapshot the rest of the
//! engine consumes.

use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECS: u64 = 2;
pub const DEFAULT_PROBE_COMMAND: &str = "lsof";
pub const DEFAULT_ICON: &str = "🔌";
pub const DEFAULT_SEPARATOR: &str = ", ";
pub const DEFAULT_START_MESSAGE: &str = "Active dev servers on ports:";
pub const DEFAULT_END_MESSAGE: &str = "Dev servers still running on ports:";

const DEFAULT_PORTS: [(&str, &str); 5] = [
    ("3000", "React/Next.js"),
    ("8000", "Django/Python"),
    ("8080", "Generic HTTP"),
    ("5173", "Vite"),
    ("4200", "Angular"),
];

// ═══════════════════════════════════════════════════════════════════════════════
// Config Document
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessesConfig {
    pub ports: PortsConfig,
    pub display: DisplayConfig,
    pub behavior: BehaviorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortsConfig {
    pub enabled: bool,
    pub monitored_ports: Vec<PortConfig>,
    #[serde(deserialize_with = "port_list")]
    pub custom_ports: Vec<String>,
}

impl Default for PortsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            monitored_ports: DEFAULT_PORTS
                .iter()
                .map(|(number, description)| PortConfig {
                    number: number.to_string(),
                    description: description.to_string(),
                    enabled: true,
                })
                .collect(),
            custom_ports: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortConfig {
    #[serde(deserialize_with = "port_number")]
    pub number: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub show_at_start: bool,
    pub show_at_end: bool,
    pub icon: String,
    pub start_message: String,
    pub end_message: String,
    pub separator: String,
    pub show_descriptions: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            show_at_start: true,
            show_at_end: true,
            icon: DEFAULT_ICON.to_string(),
            start_message: DEFAULT_START_MESSAGE.to_string(),
            end_message: DEFAULT_END_MESSAGE.to_string(),
            separator: DEFAULT_SEPARATOR.to_string(),
            show_descriptions: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    pub silent_failures: bool,
    pub timeout_seconds: i64,
    pub check_command: String,
    pub require_lsof: bool,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            silent_failures: true,
            timeout_seconds: DEFAULT_TIMEOUT_SECS as i64,
            check_command: DEFAULT_PROBE_COMMAND.to_string(),
            require_lsof: false,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPort {
    Text(String),
    Number(u32),
}

impl From<RawPort> for String {
    fn from(raw: RawPort) -> Self {
        match raw {
            RawPort::Text(text) => text.trim().to_string(),
            RawPort::Number(number) => number.to_string(),
        }
    }
}

/// Accepts `"3000"` and `3000` alike.
fn port_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    RawPort::deserialize(deserializer).map(String::from)
}

fn port_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<RawPort>::deserialize(deserializer)?;
    Ok(raw.into_iter().map(String::from).collect())
}

// ═══════════════════════════════════════════════════════════════════════════════
// Resolved Snapshot
// ═══════════════════════════════════════════════════════════════════════════════

/// One monitored port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Target {
    pub id: String,
    /// Empty for custom ports.
    pub label: String,
    pub enabled: bool,
}

impl Target {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplaySettings {
    pub icon: String,
    pub start_message: String,
    pub end_message: String,
    pub separator: String,
    pub show_labels: bool,
    pub show_at_start: bool,
    pub show_at_end: bool,
}

/// Immutable per-invocation settings for the port-monitoring hooks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub enabled: bool,
    pub targets: Vec<Target>,
    pub display: DisplaySettings,
    pub timeout: Duration,
    pub probe_command: String,
    pub require_probe_command: bool,
    pub silent_failures: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings::from(ProcessesConfig::default())
    }
}

impl From<ProcessesConfig> for Settings {
    fn from(config: ProcessesConfig) -> Self {
        let ProcessesConfig {
            ports,
            display,
            behavior,
        } = config;

        let declared = ports
            .monitored_ports
            .into_iter()
            .map(|port| Target {
                id: port.number,
                label: port.description,
                enabled: port.enabled,
            })
            .chain(ports.custom_ports.into_iter().map(|id| Target::new(id, "")));

        let timeout = u64::try_from(behavior.timeout_seconds)
            .ok()
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        let probe_command = match behavior.check_command.trim() {
            "" => DEFAULT_PROBE_COMMAND.to_string(),
            command => command.to_string(),
        };

        Settings {
            enabled: ports.enabled,
            targets: merge_targets(declared),
            display: DisplaySettings {
                icon: display.icon,
                start_message: display.start_message,
                end_message: display.end_message,
                separator: display.separator,
                show_labels: display.show_descriptions,
                show_at_start: display.show_at_start,
                show_at_end: display.show_at_end,
            },
            timeout,
            probe_command,
            require_probe_command: behavior.require_lsof,
            silent_failures: behavior.silent_failures,
        }
    }
}

impl Settings {
    pub fn enabled_targets(&self) -> impl Iterator<Item = &Target> {
        self.targets.iter().filter(|target| target.enabled)
    }
}

/// Collapses duplicate ids.
///
/// Last write wins for `enabled`; the entry keeps the position of its first
/// occurrence and a later empty label never erases an earlier one.
fn merge_targets(declared: impl Iterator<Item = Target>) -> Vec<Target> {
    let mut merged: Vec<Target> = Vec::new();
    for target in declared {
        if target.id.is_empty() {
            continue;
        }
        match merged.iter_mut().find(|existing| existing.id == target.id) {
            Some(existing) => {
                existing.enabled = target.enabled;
                if !target.label.is_empty() {
                    existing.label = target.label;
                }
            }
            None => merged.push(target),
        }
    }
    merged
}
