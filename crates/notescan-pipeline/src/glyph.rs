//! Glyphs: connected sets of sections plus the features computed on them.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::section::{SectionGraph, SectionId};
use crate::shape::Shape;
use crate::types::{GlyphError, Point, Rectangle};

/// Stable identifier of a registered glyph.
///
/// Ids are handed out by the [`GlyphStore`](crate::store::GlyphStore) and
/// are tied to the set of member sections: registering the same
/// membership again yields the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GlyphId(pub u32);

impl fmt::Display for GlyphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Running sums of pixel coordinates, fed one run at a time.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct MomentSums {
    weight: u64,
    sum_x: f64,
    sum_y: f64,
    sum_xx: f64,
    sum_yy: f64,
    sum_xy: f64,
}

impl MomentSums {
    /// Add the `length` pixels of column `x` starting at row `start`.
    pub(crate) fn push_run(&mut self, x: i32, start: i32, length: i32) {
        let n = f64::from(length);
        let x = f64::from(x);
        let y0 = f64::from(start);
        // Closed forms for sum(y) and sum(y^2) over y0..y0+n.
        let sum_y = n.mul_add(y0, n * (n - 1.0) / 2.0);
        let sum_yy = (n * y0).mul_add(y0, y0 * n * (n - 1.0))
            + (n - 1.0) * n * 2.0f64.mul_add(n, -1.0) / 6.0;

        #[allow(clippy::cast_sign_loss)]
        {
            self.weight += length.max(0) as u64;
        }
        self.sum_x += x * n;
        self.sum_xx += x * x * n;
        self.sum_y += sum_y;
        self.sum_yy += sum_yy;
        self.sum_xy += x * sum_y;
    }

    /// Normalized moments, `None` when no pixel was accumulated.
    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn finish(&self) -> Option<Moments> {
        if self.weight == 0 {
            return None;
        }
        let n = self.weight as f64;
        let cx = self.sum_x / n;
        let cy = self.sum_y / n;
        Some(Moments {
            weight: self.weight,
            centroid: Point::new(cx, cy),
            mu20: cx.mul_add(-cx, self.sum_xx / n),
            mu02: cy.mul_add(-cy, self.sum_yy / n),
            mu11: cx.mul_add(-cy, self.sum_xy / n),
        })
    }
}

/// Geometric moments of a glyph.
///
/// Central moments are normalized by the weight (they are the pixel
/// coordinate variances and covariance).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Moments {
    /// Number of pixels.
    pub weight: u64,
    /// Mass center, in sheet coordinates.
    pub centroid: Point,
    /// Horizontal variance.
    pub mu20: f64,
    /// Vertical variance.
    pub mu02: f64,
    /// Covariance.
    pub mu11: f64,
}

/// A set of sections considered as one symbol candidate.
#[derive(Debug, Clone)]
pub struct Glyph {
    id: Option<GlyphId>,
    members: BTreeSet<SectionId>,
    contour: Rectangle,
    moments: Moments,
    interline: u32,
    shape: Option<Shape>,
    parts: Vec<GlyphId>,
    part_of: Option<GlyphId>,
    left_stem: Option<GlyphId>,
    right_stem: Option<GlyphId>,
    stem_number: u8,
    with_ledger: bool,
    pitch_position: f64,
    staff: Option<usize>,
}

impl Glyph {
    /// Build a transient glyph out of the given sections.
    ///
    /// The sections are not claimed: that only happens when the glyph is
    /// inserted through [`GlyphsBuilder`](crate::builder::GlyphsBuilder).
    ///
    /// # Errors
    ///
    /// Returns [`GlyphError::EmptyGlyph`] if no section is given, and
    /// [`GlyphError::UnknownSection`] if a section is not in `graph`.
    pub fn from_sections(
        graph: &SectionGraph,
        members: impl IntoIterator<Item = SectionId>,
    ) -> Result<Self, GlyphError> {
        let members: BTreeSet<SectionId> = members.into_iter().collect();
        let mut contour: Option<Rectangle> = None;
        let mut sums = MomentSums::default();

        for &id in &members {
            let section = graph.get(id)?;
            let box_ = section.contour();
            contour = Some(contour.map_or(box_, |c| c.union(&box_)));
            section.accumulate(&mut sums);
        }

        let (Some(contour), Some(moments)) = (contour, sums.finish()) else {
            return Err(GlyphError::EmptyGlyph);
        };

        Ok(Self {
            id: None,
            members,
            contour,
            moments,
            interline: 0,
            shape: None,
            parts: Vec::new(),
            part_of: None,
            left_stem: None,
            right_stem: None,
            stem_number: 0,
            with_ledger: false,
            pitch_position: 0.0,
            staff: None,
        })
    }

    /// The registered id, `None` while the glyph is transient.
    #[must_use]
    pub const fn id(&self) -> Option<GlyphId> {
        self.id
    }

    pub(crate) const fn set_id(&mut self, id: GlyphId) {
        self.id = Some(id);
    }

    /// Member sections, in id order.
    #[must_use]
    pub const fn members(&self) -> &BTreeSet<SectionId> {
        &self.members
    }

    /// Union of the member section contours.
    #[must_use]
    pub const fn contour(&self) -> Rectangle {
        self.contour
    }

    /// Pixel moments of the member sections.
    #[must_use]
    pub const fn moments(&self) -> &Moments {
        &self.moments
    }

    /// Mass center, in sheet coordinates.
    #[must_use]
    pub const fn centroid(&self) -> Point {
        self.moments.centroid
    }

    /// Number of pixels.
    #[must_use]
    pub const fn weight(&self) -> u64 {
        self.moments.weight
    }

    /// Interline the glyph was measured with, `0` when not yet set.
    #[must_use]
    pub const fn interline(&self) -> u32 {
        self.interline
    }

    pub(crate) const fn set_interline(&mut self, interline: u32) {
        self.interline = interline;
    }

    /// The assigned shape, if any.
    #[must_use]
    pub const fn shape(&self) -> Option<Shape> {
        self.shape
    }

    /// Assign (or clear) the shape label.
    pub const fn set_shape(&mut self, shape: Option<Shape>) {
        self.shape = shape;
    }

    /// Returns `true` if the glyph is labelled as a stem.
    #[must_use]
    pub fn is_stem(&self) -> bool {
        self.shape.is_some_and(Shape::is_stem)
    }

    /// Glyphs this compound was built from (empty for a plain glyph).
    #[must_use]
    pub fn parts(&self) -> &[GlyphId] {
        &self.parts
    }

    pub(crate) fn set_parts(&mut self, parts: Vec<GlyphId>) {
        self.parts = parts;
    }

    /// The compound that absorbed this glyph, if any.
    #[must_use]
    pub const fn part_of(&self) -> Option<GlyphId> {
        self.part_of
    }

    pub(crate) const fn set_part_of(&mut self, compound: Option<GlyphId>) {
        self.part_of = compound;
    }

    /// Stem found on the left side.
    #[must_use]
    pub const fn left_stem(&self) -> Option<GlyphId> {
        self.left_stem
    }

    /// Stem found on the right side.
    #[must_use]
    pub const fn right_stem(&self) -> Option<GlyphId> {
        self.right_stem
    }

    pub(crate) fn set_stems(&mut self, left: Option<GlyphId>, right: Option<GlyphId>) {
        self.left_stem = left;
        self.right_stem = right;
        self.stem_number = u8::from(left.is_some()) + u8::from(right.is_some());
    }

    /// Number of sides with a connected stem (0, 1 or 2).
    #[must_use]
    pub const fn stem_number(&self) -> u8 {
        self.stem_number
    }

    /// Returns `true` if a ledger lies close to the glyph.
    #[must_use]
    pub const fn with_ledger(&self) -> bool {
        self.with_ledger
    }

    pub(crate) const fn set_with_ledger(&mut self, with_ledger: bool) {
        self.with_ledger = with_ledger;
    }

    /// Vertical position with respect to the owning staff, in half
    /// interlines (`0` on the middle line, positive downwards).
    #[must_use]
    pub const fn pitch_position(&self) -> f64 {
        self.pitch_position
    }

    pub(crate) const fn set_pitch_position(&mut self, pitch_position: f64) {
        self.pitch_position = pitch_position;
    }

    /// Index of the owning staff within its system.
    #[must_use]
    pub const fn staff(&self) -> Option<usize> {
        self.staff
    }

    pub(crate) const fn set_staff(&mut self, staff: Option<usize>) {
        self.staff = staff;
    }

    /// Returns `true` if the glyph is registered and every member
    /// section still points back to it.
    #[must_use]
    pub fn is_active(&self, graph: &SectionGraph) -> bool {
        self.id.is_some_and(|id| {
            self.members
                .iter()
                .all(|&section| graph.glyph_of(section) == Some(id))
        })
    }

    /// Carry over the attributes of `fresh`, an equivalent glyph just
    /// rebuilt from the same sections, into this registered one.
    ///
    /// The id is kept, and so is the shape unless this glyph has none.
    pub(crate) fn pull_from(&mut self, fresh: &Self) {
        debug_assert_eq!(self.members, fresh.members);
        self.contour = fresh.contour;
        self.moments = fresh.moments;
        if self.interline == 0 {
            self.interline = fresh.interline;
        }
        if self.shape.is_none() {
            self.shape = fresh.shape;
        }
        if !fresh.parts.is_empty() {
            self.parts.clone_from(&fresh.parts);
        }
        self.part_of = None;
        self.left_stem = fresh.left_stem;
        self.right_stem = fresh.right_stem;
        self.stem_number = fresh.stem_number;
        self.with_ledger = fresh.with_ledger;
        self.pitch_position = fresh.pitch_position;
        self.staff = fresh.staff;
    }
}

impl fmt::Display for Glyph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "glyph#{id}")?,
            None => f.write_str("glyph#?")?,
        }
        if let Some(shape) = self.shape {
            write!(f, " {shape}")?;
        }
        write!(f, " {}x{}@({},{})", self.contour.width, self.contour.height, self.contour.x, self.contour.y)
    }
}
