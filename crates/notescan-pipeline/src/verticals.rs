//! Stem seeds: thin, tall vertical sections registered as stems before
//! generic glyph extraction.

use tracing::debug;

use crate::builder::GlyphsBuilder;
use crate::glyph::Glyph;
use crate::section::{Section, SectionId};
use crate::shape::Shape;
use crate::sheet::Sheet;
use crate::system::SystemId;
use crate::types::{GlyphError, PipelineConfig};

/// Finds stem seeds among the vertical sections of a system.
#[derive(Debug, Clone, Copy, Default)]
pub struct VerticalsBuilder {
    config: PipelineConfig,
}

impl VerticalsBuilder {
    /// Create a builder using the stem thresholds and glyph tolerances of
    /// `config`.
    #[must_use]
    pub const fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Returns `true` if `section` is thin and tall enough to seed a stem
    /// at the given interline.
    #[must_use]
    pub fn is_seed(&self, sheet: &Sheet, section: &Section) -> bool {
        let scale = sheet.scale();
        let contour = section.contour();
        !section.is_known()
            && contour.width <= scale.to_pixels(self.config.stems.max_thickness)
            && contour.height >= scale.to_pixels(self.config.stems.min_length)
    }

    /// Register every stem seed of `system` as a glyph shaped
    /// [`Shape::Stem`], returning how many were registered.
    ///
    /// # Errors
    ///
    /// Returns [`GlyphError::UnknownSystem`] if the system does not exist.
    pub fn build_verticals(&self, sheet: &mut Sheet, system: SystemId) -> Result<usize, GlyphError> {
        let seeds: Vec<SectionId> = sheet
            .system(system)?
            .vertical_sections()
            .iter()
            .copied()
            .filter(|&id| {
                sheet
                    .sections()
                    .get(id)
                    .is_ok_and(|section| self.is_seed(sheet, section))
            })
            .collect();

        let mut builder = GlyphsBuilder::new(sheet, self.config.glyphs);
        for &seed in &seeds {
            let mut stem = Glyph::from_sections(builder.sheet().sections(), [seed])?;
            stem.set_shape(Some(Shape::Stem));
            builder.compute_features(system, &mut stem)?;
            builder.insert(stem, Some(system))?;
        }

        debug!(%system, count = seeds.len(), "stem seeds");
        Ok(seeds.len())
    }
}
