//! Contextual features of a glyph: stems, ledgers and pitch.
//!
//! Features are computed once a glyph's membership is fixed, against the
//! system that will own it. The tolerance boxes are derived from the
//! glyph contour:
//!
//! ```text
//!        left stem box                right stem box
//!      ┌──┐                                  ┌──┐
//!      │  │  ┌─────────── glyph ──────────┐  │  │
//!      │  │  │                            │  │  │
//!      │  │  └────────────────────────────┘  │  │
//!      └──┘                                  └──┘
//!    x-dx..x+dx                       right-dx..right+dx
//! ```
//!
//! Both stem boxes are heightened by `dy` above and below. The ledger box
//! keeps the glyph width and is heightened by the ledger tolerance.

use tracing::trace;

use crate::glyph::{Glyph, GlyphId};
use crate::sheet::Sheet;
use crate::system::{System, SystemId};
use crate::types::{GlyphConfig, GlyphError, Rectangle};

/// Which side of a glyph a stem is looked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Stem on the left, reached through section sources.
    Left,
    /// Stem on the right, reached through section targets.
    Right,
}

/// Computes the features of glyphs of one sheet.
#[derive(Debug, Clone, Copy)]
pub struct FeatureComputer<'a> {
    sheet: &'a Sheet,
    config: &'a GlyphConfig,
}

impl<'a> FeatureComputer<'a> {
    /// Create a computer over `sheet` using the given tolerances.
    #[must_use]
    pub const fn new(sheet: &'a Sheet, config: &'a GlyphConfig) -> Self {
        Self { sheet, config }
    }

    /// Annotate `glyph` with its features, as seen from `system`.
    ///
    /// # Errors
    ///
    /// Returns [`GlyphError::EmptyGlyph`] if the glyph has no member, and
    /// [`GlyphError::UnknownSystem`] if the system does not exist.
    pub fn compute(&self, system: SystemId, glyph: &mut Glyph) -> Result<(), GlyphError> {
        if glyph.members().is_empty() {
            return Err(GlyphError::EmptyGlyph);
        }
        let system = self.sheet.system(system)?;

        if glyph.interline() == 0 {
            glyph.set_interline(self.sheet.scale().interline());
        }

        let centroid = system.to_system_point(glyph.centroid());
        let staff = system.staff_at(centroid);

        let left = self.stem_on(system, glyph, Side::Left);
        let right = self.stem_on(system, glyph, Side::Right);
        glyph.set_stems(left, right);

        let ledger_box = self.ledger_box(&glyph.contour());
        glyph.set_with_ledger(system.ledgers().first_intersecting(&ledger_box).is_some());

        match staff {
            Some((index, staff)) => {
                glyph.set_staff(Some(index));
                glyph.set_pitch_position(staff.pitch_position_of(centroid.y));
            }
            None => {
                glyph.set_staff(None);
                glyph.set_pitch_position(0.0);
            }
        }

        Ok(())
    }

    /// The first stem of `system` connected to `glyph` on `side`.
    ///
    /// A stem qualifies when its contour meets the side box, and either
    /// one of the glyph's sections is directly linked to it, or one of
    /// those sections meets the stem's own widened contour. A glyph is
    /// never its own stem.
    #[must_use]
    pub fn stem_on(&self, system: &System, glyph: &Glyph, side: Side) -> Option<GlyphId> {
        let search = self.stem_box(&glyph.contour(), side);
        let graph = self.sheet.sections();
        let (dx, dy) = self.stem_tolerance();

        for &candidate in system.glyphs() {
            if Some(candidate) == glyph.id() {
                continue;
            }
            let Some(stem) = self.sheet.store().get(candidate) else {
                continue;
            };
            if !stem.is_stem() || stem.members() == glyph.members() {
                continue;
            }
            if !stem.contour().intersects(&search) {
                continue;
            }

            let claimed_by_stem = |n| graph.glyph_of(n) == Some(candidate);
            let linked = glyph.members().iter().any(|&section| match side {
                Side::Left => graph.sources(section).any(claimed_by_stem),
                Side::Right => graph.targets(section).any(claimed_by_stem),
            });

            let near = || {
                let stem_box = stem.contour().grown(dx, dy);
                glyph.members().iter().any(|&section| {
                    graph
                        .get(section)
                        .is_ok_and(|s| s.contour().intersects(&stem_box))
                })
            };

            if linked || near() {
                trace!(?side, stem = %candidate, glyph = %glyph, "stem found");
                return Some(candidate);
            }
        }

        None
    }

    /// Box searched for a stem on one side of `contour`.
    #[must_use]
    pub fn stem_box(&self, contour: &Rectangle, side: Side) -> Rectangle {
        let (dx, dy) = self.stem_tolerance();
        let x = match side {
            Side::Left => contour.x.saturating_sub(dx),
            Side::Right => contour.right().saturating_sub(dx),
        };
        Rectangle::new(
            x,
            contour.y.saturating_sub(dy),
            dx.saturating_mul(2),
            contour.height.saturating_add(dy.saturating_mul(2)),
        )
    }

    /// Box searched for a ledger around `contour`.
    #[must_use]
    pub fn ledger_box(&self, contour: &Rectangle) -> Rectangle {
        let dy = self.sheet.scale().to_pixels(self.config.ledger_heighten);
        Rectangle::new(
            contour.x,
            contour.y.saturating_sub(dy),
            contour.width,
            contour.height.saturating_add(dy.saturating_mul(2)),
        )
    }

    fn stem_tolerance(&self) -> (i32, i32) {
        let scale = self.sheet.scale();
        (
            scale.to_pixels(self.config.stem_widen),
            scale.to_pixels(self.config.stem_heighten),
        )
    }
}
