//! Execution health scoring.
//!
//! Each invocation accumulates one contribution per phase:
//!
//! | Phase   | Range      | Source                                     |
//! |---------|------------|--------------------------------------------|
//! | Config  | 0..=40     | loaded +20, missing +15, invalid +10       |
//! | Probe   | -10..=40   | clean +40, mixed +20, all degraded −10     |
//! | Display | 0..=20     | ok +20, fallback template +10, failed 0    |
//!
//! A phase can be recorded once. A second attempt is rejected and the first
//! value stands.

use serde::Serialize;

use crate::error::{HookError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Config,
    /// Port probing, or environment fact extraction for the completion hook.
    Probe,
    Display,
}

impl Phase {
    fn range(self) -> (i32, i32) {
        match self {
            Phase::Config => (0, 40),
            Phase::Probe => (-10, 40),
            Phase::Display => (0, 20),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HealthScore {
    config_points: Option<i32>,
    probe_points: Option<i32>,
    display_points: Option<i32>,
}

impl HealthScore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `points` for `phase`, clamped to the phase's range.
    pub fn record(&mut self, phase: Phase, points: i32) -> Result<&Self> {
        if self.is_recorded(phase) {
            return Err(HookError::PhaseAlreadyRecorded(phase));
        }
        let slot = match phase {
            Phase::Config => &mut self.config_points,
            Phase::Probe => &mut self.probe_points,
            Phase::Display => &mut self.display_points,
        };
        let (min, max) = phase.range();
        *slot = Some(points.clamp(min, max));
        Ok(self)
    }

    pub fn points(&self, phase: Phase) -> i32 {
        match phase {
            Phase::Config => self.config_points,
            Phase::Probe => self.probe_points,
            Phase::Display => self.display_points,
        }
        .unwrap_or(0)
    }

    pub fn is_recorded(&self, phase: Phase) -> bool {
        match phase {
            Phase::Config => self.config_points.is_some(),
            Phase::Probe => self.probe_points.is_some(),
            Phase::Display => self.display_points.is_some(),
        }
    }

    /// Sum of recorded phases, clamped to `[0, 100]`.
    pub fn total(&self) -> u8 {
        let sum = self.points(Phase::Config)
            + self.points(Phase::Probe)
            + self.points(Phase::Display);
        sum.clamp(0, 100) as u8
    }
}
