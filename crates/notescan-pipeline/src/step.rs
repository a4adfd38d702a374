//! Processing steps and the built-in glyph steps.
//!
//! Each step declares a name, a level (whole sheet, or one system at a
//! time), whether it is mandatory, and the names of the steps it depends
//! on. The [`Pipeline`](crate::pipeline::Pipeline) uses these to order
//! execution and to decide which steps must be withheld after a failure.
//!
//! Steps carry their configuration but no state between sheets.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::builder::GlyphsBuilder;
use crate::sheet::Sheet;
use crate::system::SystemId;
use crate::types::{GlyphError, PipelineConfig};
use crate::verticals::VerticalsBuilder;

/// Name of the [`HorizontalsStep`].
pub const HORIZONTALS: &str = "horizontals";
/// Name of the [`StemSeedsStep`].
pub const STEM_SEEDS: &str = "stem_seeds";
/// Name of the [`GlyphsStep`].
pub const GLYPHS: &str = "glyphs";

/// Scope a step works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepLevel {
    /// The step runs once for the whole sheet.
    Sheet,
    /// The step runs once per system.
    System,
}

impl fmt::Display for StepLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sheet => f.pad("sheet"),
            Self::System => f.pad("system"),
        }
    }
}

/// Whether later steps may proceed after a step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mandatory {
    /// A failure withholds the dependent steps.
    Mandatory,
    /// A failure is only reported.
    Optional,
}

/// An interactive view of the sheet, refreshed after the steps it shows.
pub trait SheetView {
    /// Refresh the view once `step` has run.
    fn refresh(&mut self, step: &str, sheet: &Sheet);

    /// Add a named check board bound to a system.
    fn add_check_board(&mut self, _board: &str, _system: SystemId) {}
}

/// Errors raised while building or running a pipeline.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    /// A glyph operation failed inside a step.
    #[error(transparent)]
    Glyph(#[from] GlyphError),

    /// A step failed for a reason of its own.
    #[error("step {step} failed: {reason}")]
    Failed {
        /// The failing step.
        step: String,
        /// What went wrong.
        reason: String,
    },

    /// A step depends on a step that is not part of the pipeline.
    #[error("step {step} depends on unknown step {dependency}")]
    UnknownDependency {
        /// The dependent step.
        step: String,
        /// The missing dependency.
        dependency: String,
    },

    /// Two steps share the same name.
    #[error("step {0} is registered twice")]
    DuplicateStep(String),

    /// The step dependencies form a cycle.
    #[error("step dependencies form a cycle through {0}")]
    Cycle(String),

    /// The requested step is not part of the pipeline.
    #[error("unknown step {0}")]
    UnknownStep(String),

    /// A step was run at a level it does not support.
    #[error("step {step} cannot run at this level")]
    WrongLevel {
        /// The misused step.
        step: String,
    },
}

/// A named unit of processing.
pub trait Step {
    /// Unique name of the step.
    fn name(&self) -> &'static str;

    /// One-line description, for reports.
    fn description(&self) -> &'static str;

    /// Scope of the step.
    fn level(&self) -> StepLevel;

    /// Whether a failure withholds dependent steps.
    fn mandatory(&self) -> Mandatory {
        Mandatory::Mandatory
    }

    /// Names of the steps that must run before this one.
    fn dependencies(&self) -> &[&'static str] {
        &[]
    }

    /// Run a sheet-level step.
    ///
    /// # Errors
    ///
    /// The default implementation returns [`StepError::WrongLevel`].
    fn do_sheet(&self, _sheet: &mut Sheet) -> Result<(), StepError> {
        Err(StepError::WrongLevel {
            step: self.name().to_string(),
        })
    }

    /// Run a system-level step on one system.
    ///
    /// # Errors
    ///
    /// The default implementation returns [`StepError::WrongLevel`].
    fn do_system(&self, _sheet: &mut Sheet, _system: SystemId) -> Result<(), StepError> {
        Err(StepError::WrongLevel {
            step: self.name().to_string(),
        })
    }

    /// Update an attached view once the step has run.
    fn display_ui(&self, sheet: &Sheet, view: &mut dyn SheetView) {
        view.refresh(self.name(), sheet);
    }
}

/// Prepares the ledgers of every system.
#[derive(Debug, Clone, Copy, Default)]
pub struct HorizontalsStep;

impl Step for HorizontalsStep {
    fn name(&self) -> &'static str {
        HORIZONTALS
    }

    fn description(&self) -> &'static str {
        "Retrieve horizontal dashes (ledgers)"
    }

    fn level(&self) -> StepLevel {
        StepLevel::Sheet
    }

    fn do_sheet(&self, sheet: &mut Sheet) -> Result<(), StepError> {
        let ledgers = sheet.prepare_horizontals();
        debug!(ledgers, "horizontals ready");
        Ok(())
    }
}

/// Registers stem seeds, system by system.
#[derive(Debug, Clone, Copy, Default)]
pub struct StemSeedsStep {
    config: PipelineConfig,
}

impl StemSeedsStep {
    /// Create the step with the given configuration.
    #[must_use]
    pub const fn new(config: PipelineConfig) -> Self {
        Self { config }
    }
}

impl Step for StemSeedsStep {
    fn name(&self) -> &'static str {
        STEM_SEEDS
    }

    fn description(&self) -> &'static str {
        "Retrieve stem seeds & vertical endings"
    }

    fn level(&self) -> StepLevel {
        StepLevel::System
    }

    fn dependencies(&self) -> &[&'static str] {
        &[HORIZONTALS]
    }

    fn do_system(&self, sheet: &mut Sheet, system: SystemId) -> Result<(), StepError> {
        VerticalsBuilder::new(self.config).build_verticals(sheet, system)?;
        Ok(())
    }

    fn display_ui(&self, sheet: &Sheet, view: &mut dyn SheetView) {
        view.refresh(self.name(), sheet);
        if let Some(system) = sheet.systems().first() {
            view.add_check_board("stems", system.id());
        }
    }
}

/// Builds glyphs out of the sections left unclaimed, system by system.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlyphsStep {
    config: PipelineConfig,
}

impl GlyphsStep {
    /// Create the step with the given configuration.
    #[must_use]
    pub const fn new(config: PipelineConfig) -> Self {
        Self { config }
    }
}

impl Step for GlyphsStep {
    fn name(&self) -> &'static str {
        GLYPHS
    }

    fn description(&self) -> &'static str {
        "Build glyphs from unknown sections"
    }

    fn level(&self) -> StepLevel {
        StepLevel::System
    }

    fn dependencies(&self) -> &[&'static str] {
        &[STEM_SEEDS]
    }

    fn do_system(&self, sheet: &mut Sheet, system: SystemId) -> Result<(), StepError> {
        GlyphsBuilder::new(sheet, self.config.glyphs).extract_new_system_glyphs(system)?;
        Ok(())
    }
}
