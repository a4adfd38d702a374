//! Systems: the horizontal bands a sheet is cut into.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::glyph::GlyphId;
use crate::section::SectionId;
use crate::staff::{Ledger, LedgerList, Staff};
use crate::types::{Point, Rectangle};

/// Index of a system within its sheet, counted from the top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SystemId(pub usize);

impl fmt::Display for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A vertical slice of the sheet.
///
/// A system owns the vertical sections enumerated for it, the ids of
/// the glyphs currently registered to it, its staves, and its ledgers.
/// Glyphs themselves live in the sheet's
/// [`GlyphStore`](crate::store::GlyphStore).
#[derive(Debug, Clone)]
pub struct System {
    id: SystemId,
    area: Rectangle,
    sections: Vec<SectionId>,
    glyphs: BTreeSet<GlyphId>,
    staffs: Vec<Staff>,
    ledgers: LedgerList,
}

impl System {
    pub(crate) fn new(id: SystemId, area: Rectangle) -> Self {
        Self {
            id,
            area,
            sections: Vec::new(),
            glyphs: BTreeSet::new(),
            staffs: Vec::new(),
            ledgers: LedgerList::new(),
        }
    }

    /// Index of the system in its sheet.
    #[must_use]
    pub const fn id(&self) -> SystemId {
        self.id
    }

    /// Area covered by the system, in sheet coordinates.
    #[must_use]
    pub const fn area(&self) -> Rectangle {
        self.area
    }

    /// Top ordinate.
    #[must_use]
    pub const fn top(&self) -> i32 {
        self.area.y
    }

    /// Ordinate one past the bottom row.
    #[must_use]
    pub const fn bottom(&self) -> i32 {
        self.area.bottom()
    }

    /// Returns `true` if ordinate `y` falls within the system band.
    #[must_use]
    pub const fn contains_y(&self, y: i32) -> bool {
        self.area.y <= y && y < self.area.bottom()
    }

    /// Enumerate `section` as one of this system's vertical sections.
    pub fn add_section(&mut self, section: SectionId) {
        self.sections.push(section);
    }

    /// The vertical sections of the system, in enumeration order.
    #[must_use]
    pub fn vertical_sections(&self) -> &[SectionId] {
        &self.sections
    }

    /// Ids of the glyphs registered to the system.
    #[must_use]
    pub const fn glyphs(&self) -> &BTreeSet<GlyphId> {
        &self.glyphs
    }

    /// Register a glyph id, returning `false` if it was already there.
    pub fn add_glyph(&mut self, glyph: GlyphId) -> bool {
        self.glyphs.insert(glyph)
    }

    /// Forget a glyph id, returning `false` if it was not there.
    pub fn remove_glyph(&mut self, glyph: GlyphId) -> bool {
        self.glyphs.remove(&glyph)
    }

    /// Add a staff, given in system-local coordinates.
    pub fn add_staff(&mut self, staff: Staff) {
        self.staffs.push(staff);
    }

    /// The staves of the system.
    #[must_use]
    pub fn staffs(&self) -> &[Staff] {
        &self.staffs
    }

    /// The staff closest to a system-local point, with its index.
    ///
    /// Ties go to the upper staff.
    #[must_use]
    pub fn staff_at(&self, point: Point) -> Option<(usize, &Staff)> {
        self.staffs.iter().enumerate().min_by(|(_, a), (_, b)| {
            a.vertical_distance(point.y)
                .total_cmp(&b.vertical_distance(point.y))
        })
    }

    /// Translate a sheet point into system-local coordinates.
    #[must_use]
    pub fn to_system_point(&self, point: Point) -> Point {
        Point::new(
            point.x - f64::from(self.area.x),
            point.y - f64::from(self.area.y),
        )
    }

    /// Add a ledger, given in sheet coordinates.
    pub fn add_ledger(&mut self, ledger: Ledger) {
        self.ledgers.insert(ledger);
    }

    /// The ledgers, sorted by abscissa.
    #[must_use]
    pub const fn ledgers(&self) -> &LedgerList {
        &self.ledgers
    }

    /// Width of the widest ledger.
    #[must_use]
    pub const fn max_ledger_width(&self) -> i32 {
        self.ledgers.max_width()
    }

    pub(crate) fn normalize_ledgers(&mut self) {
        self.ledgers.normalize();
    }
}

impl fmt::Display for System {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "system#{} [{}..{})", self.id, self.top(), self.bottom())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn system() -> System {
        System::new(SystemId(1), Rectangle::new(0, 200, 1000, 300))
    }

    #[test]
    fn band_is_half_open() {
        let system = system();
        assert!(system.contains_y(200));
        assert!(system.contains_y(499));
        assert!(!system.contains_y(500));
        assert!(!system.contains_y(199));
    }

    #[test]
    fn glyph_ids_behave_as_a_set() {
        let mut system = system();
        assert!(system.add_glyph(GlyphId(3)));
        assert!(!system.add_glyph(GlyphId(3)));
        assert!(system.remove_glyph(GlyphId(3)));
        assert!(!system.remove_glyph(GlyphId(3)));
    }

    #[test]
    fn system_point_is_relative_to_origin() {
        let system = system();
        let local = system.to_system_point(Point::new(15.0, 260.0));
        assert_eq!(local, Point::new(15.0, 60.0));
    }

    #[test]
    fn staff_at_picks_nearest() {
        let mut system = system();
        system.add_staff(Staff::five_lines(20.0, 10.0).unwrap());
        system.add_staff(Staff::five_lines(160.0, 10.0).unwrap());

        let (index, _) = system.staff_at(Point::new(0.0, 70.0)).unwrap();
        assert_eq!(index, 0);
        let (index, _) = system.staff_at(Point::new(0.0, 130.0)).unwrap();
        assert_eq!(index, 1);
        let (index, staff) = system.staff_at(Point::new(0.0, 170.0)).unwrap();
        assert_eq!(index, 1);
        assert!((staff.top() - 160.0).abs() < f64::EPSILON);
    }

    #[test]
    fn no_staff_no_match() {
        assert!(system().staff_at(Point::new(0.0, 0.0)).is_none());
    }
}
