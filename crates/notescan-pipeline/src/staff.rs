//! Staves and ledgers, the horizontal references of a system.

use serde::{Deserialize, Serialize};

use crate::types::{GlyphError, Rectangle};

/// Number of lines of a regular staff.
pub const STAFF_LINE_COUNT: u32 = 5;

/// A staff: a set of equally spaced horizontal lines.
///
/// Ordinates are expressed in system-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Staff {
    top: f64,
    line_spacing: f64,
    line_count: u32,
}

impl Staff {
    /// Create a staff whose first line lies at ordinate `top`.
    ///
    /// # Errors
    ///
    /// Returns [`GlyphError::InvalidConfig`] if `line_spacing` is not a
    /// positive finite number or if `line_count` is zero.
    pub fn new(top: f64, line_spacing: f64, line_count: u32) -> Result<Self, GlyphError> {
        if !(line_spacing.is_finite() && line_spacing > 0.0) {
            return Err(GlyphError::InvalidConfig(format!(
                "staff line spacing must be positive, got {line_spacing}"
            )));
        }
        if line_count == 0 {
            return Err(GlyphError::InvalidConfig(
                "staff must have at least one line".to_string(),
            ));
        }
        if !top.is_finite() {
            return Err(GlyphError::InvalidConfig(format!(
                "staff top must be finite, got {top}"
            )));
        }
        Ok(Self {
            top,
            line_spacing,
            line_count,
        })
    }

    /// A regular five-line staff.
    ///
    /// # Errors
    ///
    /// See [`Staff::new`].
    pub fn five_lines(top: f64, line_spacing: f64) -> Result<Self, GlyphError> {
        Self::new(top, line_spacing, STAFF_LINE_COUNT)
    }

    /// Ordinate of the first (top) line.
    #[must_use]
    pub const fn top(&self) -> f64 {
        self.top
    }

    /// Ordinate of the last (bottom) line.
    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.line_y(self.line_count - 1)
    }

    /// Distance between two consecutive lines.
    #[must_use]
    pub const fn line_spacing(&self) -> f64 {
        self.line_spacing
    }

    /// Number of lines.
    #[must_use]
    pub const fn line_count(&self) -> u32 {
        self.line_count
    }

    /// Ordinate of line `index`, counted from the top.
    #[must_use]
    pub fn line_y(&self, index: u32) -> f64 {
        self.line_spacing.mul_add(f64::from(index), self.top)
    }

    /// Ordinate of the reference line, the middle line of the staff.
    #[must_use]
    pub fn reference_y(&self) -> f64 {
        self.line_spacing
            .mul_add(f64::from(self.line_count - 1) / 2.0, self.top)
    }

    /// Position of ordinate `y` in half line spacings from the reference
    /// line, positive downwards.
    #[must_use]
    pub fn pitch_position_of(&self, y: f64) -> f64 {
        2.0 * (y - self.reference_y()) / self.line_spacing
    }

    /// Vertical distance from `y` to the staff, zero within its lines.
    #[must_use]
    pub fn vertical_distance(&self, y: f64) -> f64 {
        if y < self.top {
            self.top - y
        } else {
            (y - self.bottom()).max(0.0)
        }
    }
}

/// A short horizontal line above or below a staff.
///
/// The contour is expressed in sheet coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    contour: Rectangle,
}

impl Ledger {
    /// Create a ledger with the given bounding box.
    #[must_use]
    pub const fn new(contour: Rectangle) -> Self {
        Self { contour }
    }

    /// Bounding box of the ledger.
    #[must_use]
    pub const fn contour(&self) -> Rectangle {
        self.contour
    }
}

/// Ledgers of a system, kept sorted by left abscissa together with the
/// largest ledger width.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerList {
    ledgers: Vec<Ledger>,
    max_width: i32,
}

impl LedgerList {
    /// Create an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a ledger at its sorted position.
    pub fn insert(&mut self, ledger: Ledger) {
        let at = self
            .ledgers
            .partition_point(|l| l.contour.x <= ledger.contour.x);
        self.max_width = self.max_width.max(ledger.contour.width);
        self.ledgers.insert(at, ledger);
    }

    /// Restore the ordering and recompute the maximum width.
    pub fn normalize(&mut self) {
        self.ledgers.sort_by_key(|l| l.contour.x);
        self.max_width = self
            .ledgers
            .iter()
            .map(|l| l.contour.width)
            .max()
            .unwrap_or(0);
    }

    /// The ledgers, sorted by left abscissa.
    #[must_use]
    pub fn as_slice(&self) -> &[Ledger] {
        &self.ledgers
    }

    /// Width of the widest ledger.
    #[must_use]
    pub const fn max_width(&self) -> i32 {
        self.max_width
    }

    /// Number of ledgers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ledgers.len()
    }

    /// Returns `true` if there is no ledger.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ledgers.is_empty()
    }

    /// Index of the first ledger whose left abscissa is at least `x`.
    #[must_use]
    pub fn index_at_x(&self, x: i32) -> usize {
        self.ledgers.partition_point(|l| l.contour.x < x)
    }

    /// The only ledgers that may intersect `area`.
    ///
    /// A ledger starting more than the maximum width to the left of
    /// `area` cannot reach it, nor can one starting to its right.
    #[must_use]
    pub fn candidates(&self, area: &Rectangle) -> &[Ledger] {
        let start = self.index_at_x(area.x - self.max_width);
        if start >= self.ledgers.len() {
            return &[];
        }
        let stop = self.index_at_x(area.right() + 1).max(start);
        &self.ledgers[start..stop]
    }

    /// The first ledger intersecting `area`, if any.
    #[must_use]
    pub fn first_intersecting(&self, area: &Rectangle) -> Option<&Ledger> {
        self.candidates(area)
            .iter()
            .find(|l| l.contour.intersects(area))
    }
}

impl FromIterator<Ledger> for LedgerList {
    fn from_iter<I: IntoIterator<Item = Ledger>>(iter: I) -> Self {
        let mut list = Self {
            ledgers: iter.into_iter().collect(),
            max_width: 0,
        };
        list.normalize();
        list
    }
}
