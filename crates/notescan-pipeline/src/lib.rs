//! notescan-pipeline: Glyph building for music sheet recognition (sans-IO).
//!
//! Turns the vertical sections of a scanned sheet into glyphs, the
//! candidate symbols later handed to a shape classifier, through:
//! horizontals -> stem seeds -> glyph extraction.
//!
//! Each glyph is annotated with the features a classifier relies on:
//! moments, interline, connected stems, nearby ledgers and pitch position
//! with respect to its staff. Glyph identity is tied to section
//! membership, so extracting the same sections again yields the same
//! glyph, with its shape preserved.
//!
//! This crate has **no I/O dependencies** -- it works on an in-memory
//! [`Sheet`] whose sections were produced by an earlier stage.

pub mod builder;
pub mod diagnostics;
pub mod extract;
pub mod features;
pub mod glyph;
pub mod pipeline;
pub mod scale;
pub mod section;
pub mod shape;
pub mod sheet;
pub mod staff;
pub mod step;
pub mod store;
pub mod system;
pub mod types;
pub mod verticals;

pub use builder::GlyphsBuilder;
pub use diagnostics::{Clock, RunDiagnostics};
pub use glyph::{Glyph, GlyphId, Moments};
pub use pipeline::{Pipeline, Scope, StepProgress, StepState};
pub use scale::Scale;
pub use section::{Run, Section, SectionGraph, SectionId};
pub use shape::Shape;
pub use sheet::Sheet;
pub use staff::{Ledger, Staff};
pub use step::{Mandatory, SheetView, Step, StepError, StepLevel};
pub use system::{System, SystemId};
pub use types::{Fraction, GlyphConfig, GlyphError, PipelineConfig, Point, Rectangle, StemConfig};

/// Run the standard pipeline over a sheet.
///
/// # Pipeline steps
///
/// 1. Horizontals: sort the ledgers of every system
/// 2. Stem seeds: register thin, tall sections as stems, per system
/// 3. Glyphs: drop stale glyphs and flood-fill the remaining sections,
///    per system
///
/// A failure in one system is recorded in the returned diagnostics and
/// does not prevent the other systems from being processed.
///
/// # Errors
///
/// Returns [`StepError::Glyph`] wrapping [`GlyphError::InvalidConfig`] if
/// the configuration is invalid.
pub fn process<C: Clock>(
    sheet: &mut Sheet,
    config: &PipelineConfig,
    clock: &C,
) -> Result<RunDiagnostics, StepError> {
    config.validate()?;
    let pipeline = Pipeline::standard(*config)?;
    let mut progress = StepProgress::new();
    Ok(pipeline.run(sheet, &mut progress, None, clock))
}
