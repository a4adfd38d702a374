//! Shared types for the notescan glyph pipeline.

use serde::{Deserialize, Serialize};

use crate::glyph::GlyphId;
use crate::system::SystemId;

/// A 2D point in sheet (or system-local) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from left edge).
    pub x: f64,
    /// Vertical position (pixels from top edge).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned integer rectangle, in pixels.
///
/// `x`/`y` is the top-left corner; the rectangle covers the half-open
/// ranges `x..x + width` and `y..y + height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rectangle {
    /// Left abscissa.
    pub x: i32,
    /// Top ordinate.
    pub y: i32,
    /// Horizontal extent.
    pub width: i32,
    /// Vertical extent.
    pub height: i32,
}

impl Rectangle {
    /// Create a new rectangle.
    #[must_use]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Abscissa one past the right-most column.
    #[must_use]
    pub const fn right(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    /// Ordinate one past the bottom-most row.
    #[must_use]
    pub const fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height)
    }

    /// Returns `true` if the rectangle covers no pixel.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Returns `true` if both rectangles share at least one pixel.
    ///
    /// Empty rectangles never intersect anything, and rectangles that
    /// merely touch along an edge do not intersect.
    #[must_use]
    pub const fn intersects(&self, other: &Self) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Smallest rectangle containing both rectangles.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Self::new(x, y, right.saturating_sub(x), bottom.saturating_sub(y))
    }

    /// Grow the rectangle by `dx` on the left and right sides and by
    /// `dy` on the top and bottom sides.
    ///
    /// Coordinates saturate at the `i32` bounds.
    #[must_use]
    pub const fn grown(&self, dx: i32, dy: i32) -> Self {
        Self::new(
            self.x.saturating_sub(dx),
            self.y.saturating_sub(dy),
            self.width.saturating_add(dx.saturating_mul(2)),
            self.height.saturating_add(dy.saturating_mul(2)),
        )
    }
}

/// A length expressed as a fraction of the sheet interline.
///
/// Converted to pixels via [`Scale::to_pixels`](crate::scale::Scale::to_pixels).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fraction(pub f64);

impl Fraction {
    /// Create a new fraction of interline.
    #[must_use]
    pub const fn new(value: f64) -> Self {
        Self(value)
    }

    /// The raw interline fraction.
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }
}

/// Box tolerances used by glyph feature computation.
///
/// Every value is a fraction of the sheet interline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlyphConfig {
    /// Box heightening to check intersection with a ledger.
    pub ledger_heighten: Fraction,
    /// Box widening to check intersection with a stem.
    pub stem_widen: Fraction,
    /// Box heightening to check intersection with a stem.
    pub stem_heighten: Fraction,
}

impl GlyphConfig {
    /// Default box heightening for ledger checks.
    pub const DEFAULT_LEDGER_HEIGHTEN: Fraction = Fraction(0.1);
    /// Default box widening for stem checks.
    pub const DEFAULT_STEM_WIDEN: Fraction = Fraction(0.1);
    /// Default box heightening for stem checks.
    pub const DEFAULT_STEM_HEIGHTEN: Fraction = Fraction(0.1);
    /// Largest accepted tolerance.
    pub const MAX_TOLERANCE: Fraction = Fraction(4.0);

    /// Check that every tolerance is a finite fraction between zero and
    /// [`MAX_TOLERANCE`](Self::MAX_TOLERANCE).
    ///
    /// # Errors
    ///
    /// Returns [`GlyphError::InvalidConfig`] naming the first offending
    /// field.
    pub fn validate(&self) -> Result<(), GlyphError> {
        check_tolerance("ledger_heighten", self.ledger_heighten)?;
        check_tolerance("stem_widen", self.stem_widen)?;
        check_tolerance("stem_heighten", self.stem_heighten)
    }
}

impl Default for GlyphConfig {
    fn default() -> Self {
        Self {
            ledger_heighten: Self::DEFAULT_LEDGER_HEIGHTEN,
            stem_widen: Self::DEFAULT_STEM_WIDEN,
            stem_heighten: Self::DEFAULT_STEM_HEIGHTEN,
        }
    }
}

/// Thresholds used to pick stem seeds among the vertical sections.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StemConfig {
    /// Maximum section width for a stem seed.
    pub max_thickness: Fraction,
    /// Minimum section height for a stem seed.
    pub min_length: Fraction,
}

impl StemConfig {
    /// Default maximum stem thickness.
    pub const DEFAULT_MAX_THICKNESS: Fraction = Fraction(0.3);
    /// Default minimum stem length.
    pub const DEFAULT_MIN_LENGTH: Fraction = Fraction(2.0);

    /// Check that both thresholds are finite, non-negative fractions.
    ///
    /// # Errors
    ///
    /// Returns [`GlyphError::InvalidConfig`] naming the first offending
    /// field.
    pub fn validate(&self) -> Result<(), GlyphError> {
        check_fraction("max_thickness", self.max_thickness)?;
        check_fraction("min_length", self.min_length)
    }
}

impl Default for StemConfig {
    fn default() -> Self {
        Self {
            max_thickness: Self::DEFAULT_MAX_THICKNESS,
            min_length: Self::DEFAULT_MIN_LENGTH,
        }
    }
}

/// Configuration for the whole processing pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Tolerances for glyph feature computation.
    pub glyphs: GlyphConfig,
    /// Thresholds for stem seed retrieval.
    pub stems: StemConfig,
}

impl PipelineConfig {
    /// Validate every nested configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GlyphError::InvalidConfig`] on the first invalid value.
    pub fn validate(&self) -> Result<(), GlyphError> {
        self.glyphs.validate()?;
        self.stems.validate()
    }
}

fn check_tolerance(name: &str, fraction: Fraction) -> Result<(), GlyphError> {
    check_fraction(name, fraction)?;
    if fraction > GlyphConfig::MAX_TOLERANCE {
        return Err(GlyphError::InvalidConfig(format!(
            "{name} must not exceed {} interlines, got {}",
            GlyphConfig::MAX_TOLERANCE.value(),
            fraction.value()
        )));
    }
    Ok(())
}

fn check_fraction(name: &str, fraction: Fraction) -> Result<(), GlyphError> {
    if fraction.value().is_finite() && fraction.value() >= 0.0 {
        Ok(())
    } else {
        Err(GlyphError::InvalidConfig(format!(
            "{name} must be a finite, non-negative interline fraction, got {}",
            fraction.value()
        )))
    }
}

/// Errors raised by glyph building and registration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GlyphError {
    /// A glyph with no member section was handed to an operation that
    /// needs geometry.
    #[error("glyph has no member section")]
    EmptyGlyph,

    /// No system of the sheet contains or borders the given ordinate.
    #[error("no system found at ordinate {y}")]
    NoSystemAt {
        /// The ordinate that could not be resolved.
        y: i32,
    },

    /// The system id does not belong to the sheet.
    #[error("unknown system #{0}")]
    UnknownSystem(SystemId),

    /// The glyph id was never registered.
    #[error("unknown glyph #{0}")]
    UnknownGlyph(GlyphId),

    /// The section index does not belong to the section graph.
    #[error("unknown section #{0}")]
    UnknownSection(usize),

    /// A section was described with no pixel.
    #[error("invalid section: {0}")]
    InvalidSection(String),

    /// Configuration is invalid.
    #[error("invalid glyph configuration: {0}")]
    InvalidConfig(String),
}
