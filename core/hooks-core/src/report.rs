//! User-visible summaries.
//!
//! The reporter is the only component that writes to the user's stream. It
//! never returns an error: formatting problems fall back to default templates,
//! write failures are logged, and either way the caller gets a
//! [`DisplayOutcome`] to score.

use chrono::{Local, NaiveDateTime, Timelike};
use std::io::Write;

use crate::error::{HookError, Result};
use crate::facts::CompletionFacts;
use crate::probe::{ProbeResult, ProbeState};
use crate::record::Outcome;
use crate::settings::{CompletionSettings, Settings};
use crate::types::HookKind;

const HEADER_RULE: &str = "━━━";
const CLOCK_ICON: &str = "🕐";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayOutcome {
    Written,
    /// Nothing to show, or showing disabled for this context.
    Suppressed,
    /// Written after a configured template failed to render.
    Fallback,
    Failed,
}

impl DisplayOutcome {
    pub fn health_points(self) -> i32 {
        match self {
            DisplayOutcome::Written | DisplayOutcome::Suppressed => 20,
            DisplayOutcome::Fallback => 10,
            DisplayOutcome::Failed => 0,
        }
    }
}

struct Rendered {
    text: String,
    fell_back: bool,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Probe Summaries
// ═══════════════════════════════════════════════════════════════════════════════

/// Composes the dev-server summary, or `None` when there is nothing to show.
///
/// ```text
/// 🔌 Active dev servers on ports: 3000, 8080
/// ```
pub fn format_probe_summary(
    kind: HookKind,
    settings: &Settings,
    results: &[ProbeResult],
) -> Option<String> {
    let display = &settings.display;
    let (show, message) = match kind {
        HookKind::SessionEnd => (display.show_at_end, &display.end_message),
        _ => (display.show_at_start, &display.start_message),
    };

    let listening: Vec<String> = results
        .iter()
        .filter(|r| r.state == ProbeState::Listening)
        .map(|r| {
            if display.show_labels && !r.target.label.is_empty() {
                format!("{} ({})", r.target.id, r.target.label)
            } else {
                r.target.id.clone()
            }
        })
        .collect();

    if !show || listening.is_empty() {
        return None;
    }

    let mut line = [display.icon.as_str(), message.as_str()]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ");
    line.push(' ');
    line.push_str(&listening.join(&display.separator));

    let mut block = format!("\n{}\n", line);
    if !settings.silent_failures {
        let degraded: Vec<&str> = results
            .iter()
            .filter(|r| r.state.is_degraded())
            .map(|r| r.target.id.as_str())
            .collect();
        if !degraded.is_empty() {
            block.push_str(&format!(
                "   (could not check ports: {})\n",
                degraded.join(&display.separator)
            ));
        }
    }
    Some(block)
}

pub fn report_probe(
    out: &mut dyn Write,
    kind: HookKind,
    settings: &Settings,
    results: &[ProbeResult],
) -> DisplayOutcome {
    let rendered = format_probe_summary(kind, settings, results).map(|text| Rendered {
        text,
        fell_back: false,
    });
    emit(out, rendered)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Completion Banner
// ═══════════════════════════════════════════════════════════════════════════════

fn format_completion(
    settings: &CompletionSettings,
    facts: &CompletionFacts,
    completed_at: NaiveDateTime,
) -> Option<Rendered> {
    if !settings.show_completion {
        return None;
    }

    let defaults = CompletionSettings::default();
    let (template, fallback) = match facts.display_outcome() {
        Outcome::Success => (&settings.success_message, defaults.success_message),
        Outcome::Failure => (&settings.failure_message, defaults.failure_message),
        Outcome::Unknown => (&settings.default_message, defaults.default_message),
    };
    let vars = [("type", facts.agent_type.as_str()), ("code", facts.exit_code.as_str())];

    let (message, fell_back) = match render_template(template, &vars) {
        Ok(message) => (message, false),
        Err(err) => {
            tracing::warn!(error = %err, "Completion template invalid; using default");
            // The compiled-in templates only use known placeholders.
            (render_template(&fallback, &vars).unwrap_or(fallback), true)
        }
    };

    let mut block = String::from("\n");
    if !settings.header.is_empty() {
        block.push_str(&format!("{} {} {}\n", HEADER_RULE, settings.header, HEADER_RULE));
    }
    block.push_str(&format!("\n  {}\n", message));
    if settings.show_errors && !facts.error.is_empty() {
        block.push_str(&format!("     Error: {}\n", facts.error));
    }
    block.push_str(&format!(
        "\n  {} Completed At:       {} ({})\n",
        CLOCK_ICON,
        completed_at.format("%a %b %d, %Y at %H:%M:%S"),
        time_of_day(completed_at.hour())
    ));
    block.push('\n');

    Some(Rendered {
        text: block,
        fell_back,
    })
}

pub fn report_completion(
    out: &mut dyn Write,
    settings: &CompletionSettings,
    facts: &CompletionFacts,
) -> DisplayOutcome {
    report_completion_at(out, settings, facts, Local::now().naive_local())
}

fn report_completion_at(
    out: &mut dyn Write,
    settings: &CompletionSettings,
    facts: &CompletionFacts,
    completed_at: NaiveDateTime,
) -> DisplayOutcome {
    emit(out, format_completion(settings, facts, completed_at))
}

fn time_of_day(hour: u32) -> &'static str {
    match hour {
        5..=11 => "morning",
        12..=16 => "afternoon",
        17..=20 => "evening",
        _ => "night",
    }
}

/// Substitutes `{name}` placeholders; unknown names and unbalanced braces fail.
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = after
            .find('}')
            .ok_or_else(|| HookError::Format(format!("unclosed placeholder in {:?}", template)))?;
        let name = &after[..close];
        let value = vars
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| *value)
            .ok_or_else(|| HookError::Format(format!("unknown placeholder {{{}}}", name)))?;
        out.push_str(value);
        rest = &after[close + 1..];
    }

    if rest.contains('}') {
        return Err(HookError::Format(format!(
            "unmatched closing brace in {:?}",
            template
        )));
    }
    out.push_str(rest);
    Ok(out)
}

fn emit(out: &mut dyn Write, rendered: Option<Rendered>) -> DisplayOutcome {
    let Some(rendered) = rendered else {
        return DisplayOutcome::Suppressed;
    };

    let written = out
        .write_all(rendered.text.as_bytes())
        .and_then(|_| out.flush());
    match written {
        Ok(()) if rendered.fell_back => DisplayOutcome::Fallback,
        Ok(()) => DisplayOutcome::Written,
        Err(err) => {
            tracing::warn!(error = %err, "Failed to write hook summary");
            DisplayOutcome::Failed
        }
    }
}
