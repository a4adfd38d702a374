//! Run diagnostics: timing and outcome of every step.
//!
//! Every call to [`Pipeline::run`](crate::Pipeline::run) collects
//! diagnostics alongside its effect on the sheet. Time is read through a
//! caller-supplied [`Clock`], which keeps this crate free of any
//! platform clock.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::pipeline::{Scope, StepState};
use crate::sheet::Sheet;
use crate::step::StepLevel;

/// Source of time for diagnostics.
pub trait Clock {
    /// A point in time.
    type Instant;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// A clock that never advances, for callers that do not measure time.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoClock;

impl Clock for NoClock {
    type Instant = ();

    fn now(&self) -> Self::Instant {}

    fn elapsed(&self, _since: &()) -> Duration {
        Duration::ZERO
    }
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunDiagnostics {
    /// One entry per step considered, in execution order.
    pub steps: Vec<StepDiagnostics>,
    /// Total wall-clock duration of the run (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Counts over the whole run.
    pub summary: RunSummary,
}

/// Diagnostics for a single step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDiagnostics {
    /// Step name.
    pub name: String,
    /// Step description.
    pub description: String,
    /// Sheet or system level.
    pub level: StepLevel,
    /// Wall-clock duration over all scopes (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// State reached in each scope.
    pub outcomes: Vec<(Scope, StepState)>,
}

impl StepDiagnostics {
    /// Number of scopes that ended in a state matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&StepState) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, state)| predicate(state)).count()
    }
}

/// High-level counts for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Number of systems on the sheet.
    pub system_count: usize,
    /// Number of glyphs held by the systems after the run.
    pub glyph_count: usize,
    /// Number of stem glyphs among them.
    pub stem_count: usize,
    /// Scopes completed, over all steps.
    pub done: usize,
    /// Scopes failed, over all steps.
    pub failed: usize,
    /// Scopes withheld, over all steps.
    pub blocked: usize,
}

impl RunSummary {
    pub(crate) fn collect(sheet: &Sheet, steps: &[StepDiagnostics]) -> Self {
        let held = sheet.systems().iter().flat_map(|s| s.glyphs().iter());
        let stem_count = held
            .clone()
            .filter(|&&id| sheet.store().get(id).is_some_and(crate::Glyph::is_stem))
            .count();
        Self {
            system_count: sheet.systems().len(),
            glyph_count: held.count(),
            stem_count,
            done: steps.iter().map(|s| s.count(StepState::is_done)).sum(),
            failed: steps
                .iter()
                .map(|s| s.count(|state| matches!(state, StepState::Failed(_))))
                .sum(),
            blocked: steps
                .iter()
                .map(|s| s.count(|state| matches!(state, StepState::Blocked)))
                .sum(),
        }
    }
}

impl RunDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Pipeline Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Systems: {}  |  Glyphs: {} ({} stems)",
            self.summary.system_count, self.summary.glyph_count, self.summary.stem_count,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<16} {:<7} {:>10} {:>8}  {}",
            "Step", "Level", "Duration", "% Total", "Outcome"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        for step in &self.steps {
            let ms = duration_ms(step.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            lines.push(format!(
                "{:<16} {:<7} {ms:>8.3}ms {pct:>7.1}%  {}",
                step.name,
                step.level,
                format_outcomes(&step.outcomes),
            ));
        }

        let failures: Vec<String> = self
            .steps
            .iter()
            .flat_map(|step| {
                step.outcomes.iter().filter_map(move |(scope, state)| match state {
                    StepState::Failed(reason) => Some(format!("  {} @ {scope}: {reason}", step.name)),
                    _ => None,
                })
            })
            .collect();
        if !failures.is_empty() {
            lines.push(String::new());
            lines.push("Failures:".to_string());
            lines.extend(failures);
        }

        lines.push(String::new());
        lines.push(format!(
            "Done: {}  |  Failed: {}  |  Blocked: {}",
            self.summary.done, self.summary.failed, self.summary.blocked,
        ));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Compact outcome of a step over its scopes.
fn format_outcomes(outcomes: &[(Scope, StepState)]) -> String {
    match outcomes {
        [] => "no scope".to_string(),
        [(Scope::Sheet, state)] => format_state(state).to_string(),
        _ => {
            let mut counts = [
                ("done", 0usize),
                ("failed", 0),
                ("blocked", 0),
                ("pending", 0),
            ];
            for (_, state) in outcomes {
                let slot = match state {
                    StepState::Done => 0,
                    StepState::Failed(_) => 1,
                    StepState::Blocked => 2,
                    StepState::Pending | StepState::Running => 3,
                };
                counts[slot].1 += 1;
            }
            counts
                .iter()
                .filter(|(_, n)| *n > 0)
                .map(|(label, n)| format!("{label}={n}"))
                .collect::<Vec<_>>()
                .join(" ")
        }
    }
}

const fn format_state(state: &StepState) -> &'static str {
    match state {
        StepState::Pending => "pending",
        StepState::Running => "running",
        StepState::Done => "done",
        StepState::Failed(_) => "failed",
        StepState::Blocked => "blocked",
    }
}
