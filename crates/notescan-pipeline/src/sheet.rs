//! The sheet: one scanned page and everything built on it.

use crate::glyph::{Glyph, GlyphId};
use crate::scale::Scale;
use crate::section::SectionGraph;
use crate::store::GlyphStore;
use crate::system::{System, SystemId};
use crate::types::{GlyphError, Rectangle};

/// A page of music being processed.
///
/// The sheet owns the section graph, the glyph arena, and the systems,
/// listed from top to bottom.
#[derive(Debug, Clone)]
pub struct Sheet {
    scale: Scale,
    sections: SectionGraph,
    store: GlyphStore,
    systems: Vec<System>,
}

impl Sheet {
    /// Create a sheet over an existing section graph, with no system yet.
    #[must_use]
    pub fn new(scale: Scale, sections: SectionGraph) -> Self {
        Self {
            scale,
            sections,
            store: GlyphStore::new(),
            systems: Vec::new(),
        }
    }

    /// Append a system below the existing ones.
    ///
    /// # Errors
    ///
    /// Returns [`GlyphError::InvalidConfig`] if the area is empty or
    /// starts above the previous system.
    pub fn add_system(&mut self, area: Rectangle) -> Result<SystemId, GlyphError> {
        if area.is_empty() {
            return Err(GlyphError::InvalidConfig(format!(
                "system area {area:?} is empty"
            )));
        }
        if let Some(last) = self.systems.last()
            && area.y < last.top()
        {
            return Err(GlyphError::InvalidConfig(format!(
                "systems must be added top to bottom: y={} is above {last}",
                area.y
            )));
        }
        let id = SystemId(self.systems.len());
        self.systems.push(System::new(id, area));
        Ok(id)
    }

    /// The sheet scale.
    #[must_use]
    pub const fn scale(&self) -> &Scale {
        &self.scale
    }

    /// The vertical section graph.
    #[must_use]
    pub const fn sections(&self) -> &SectionGraph {
        &self.sections
    }

    /// Mutable access to the section graph.
    pub const fn sections_mut(&mut self) -> &mut SectionGraph {
        &mut self.sections
    }

    /// The arena of every registered glyph.
    #[must_use]
    pub const fn store(&self) -> &GlyphStore {
        &self.store
    }

    pub(crate) const fn store_mut(&mut self) -> &mut GlyphStore {
        &mut self.store
    }

    /// Sort the ledgers of every system and refresh their maximum width,
    /// returning the number of ledgers on the sheet.
    pub fn prepare_horizontals(&mut self) -> usize {
        self.systems
            .iter_mut()
            .map(|system| {
                system.normalize_ledgers();
                system.ledgers().len()
            })
            .sum()
    }

    /// A registered glyph.
    ///
    /// # Errors
    ///
    /// Returns [`GlyphError::UnknownGlyph`] if the id was never issued.
    pub fn glyph(&self, id: GlyphId) -> Result<&Glyph, GlyphError> {
        self.store.glyph(id)
    }

    /// Mutable access to a registered glyph, e.g. to set its shape.
    ///
    /// # Errors
    ///
    /// Returns [`GlyphError::UnknownGlyph`] if the id was never issued.
    pub fn glyph_mut(&mut self, id: GlyphId) -> Result<&mut Glyph, GlyphError> {
        self.store.glyph_mut(id)
    }

    /// The systems, from top to bottom.
    #[must_use]
    pub fn systems(&self) -> &[System] {
        &self.systems
    }

    /// Ids of all systems, from top to bottom.
    pub fn system_ids(&self) -> impl Iterator<Item = SystemId> + '_ {
        self.systems.iter().map(System::id)
    }

    /// The system with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`GlyphError::UnknownSystem`] if it does not exist.
    pub fn system(&self, id: SystemId) -> Result<&System, GlyphError> {
        self.systems.get(id.0).ok_or(GlyphError::UnknownSystem(id))
    }

    /// Mutable access to a system.
    ///
    /// # Errors
    ///
    /// Returns [`GlyphError::UnknownSystem`] if it does not exist.
    pub fn system_mut(&mut self, id: SystemId) -> Result<&mut System, GlyphError> {
        self.systems
            .get_mut(id.0)
            .ok_or(GlyphError::UnknownSystem(id))
    }

    /// The system whose band contains ordinate `y`.
    ///
    /// # Errors
    ///
    /// Returns [`GlyphError::NoSystemAt`] if `y` falls outside every
    /// system.
    pub fn system_at_y(&self, y: i32) -> Result<SystemId, GlyphError> {
        self.systems
            .iter()
            .find(|s| s.contains_y(y))
            .map(System::id)
            .ok_or(GlyphError::NoSystemAt { y })
    }

    /// The neighbour of `system` lying in the direction of ordinate `y`.
    ///
    /// Inside the band, the lower half points to the next system and the
    /// upper half to the previous one.
    #[must_use]
    pub fn closest_system(&self, system: SystemId, y: i32) -> Option<SystemId> {
        let current = self.systems.get(system.0)?;
        let middle = current.top() + current.area().height / 2;
        let neighbour = if y >= middle {
            system.0.checked_add(1)
        } else {
            system.0.checked_sub(1)
        }?;
        self.systems.get(neighbour).map(System::id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sheet_with_bands(bands: &[(i32, i32)]) -> Sheet {
        let mut sheet = Sheet::new(Scale::new(20).unwrap(), SectionGraph::new());
        for &(top, bottom) in bands {
            sheet.add_system(Rectangle::new(0, top, 1000, bottom - top)).unwrap();
        }
        sheet
    }

    #[test]
    fn system_at_y_uses_bands() {
        let sheet = sheet_with_bands(&[(0, 100), (100, 200)]);
        assert_eq!(sheet.system_at_y(0).unwrap(), SystemId(0));
        assert_eq!(sheet.system_at_y(99).unwrap(), SystemId(0));
        assert_eq!(sheet.system_at_y(100).unwrap(), SystemId(1));
        assert_eq!(
            sheet.system_at_y(250).unwrap_err(),
            GlyphError::NoSystemAt { y: 250 }
        );
    }

    #[test]
    fn closest_system_follows_direction() {
        let sheet = sheet_with_bands(&[(0, 100), (100, 200), (200, 300)]);
        assert_eq!(sheet.closest_system(SystemId(1), 180), Some(SystemId(2)));
        assert_eq!(sheet.closest_system(SystemId(1), 110), Some(SystemId(0)));
        assert_eq!(sheet.closest_system(SystemId(0), 99), Some(SystemId(1)));
        assert_eq!(sheet.closest_system(SystemId(0), 10), None);
        assert_eq!(sheet.closest_system(SystemId(2), 299), None);
    }

    #[test]
    fn systems_must_be_added_top_down() {
        let mut sheet = sheet_with_bands(&[(100, 200)]);
        assert!(sheet.add_system(Rectangle::new(0, 50, 10, 10)).is_err());
        assert!(sheet.add_system(Rectangle::new(0, 300, 10, 0)).is_err());
        assert_eq!(sheet.add_system(Rectangle::new(0, 200, 10, 10)).unwrap(), SystemId(1));
    }

    #[test]
    fn unknown_system_is_an_error() {
        let sheet = sheet_with_bands(&[(0, 10)]);
        assert_eq!(
            sheet.system(SystemId(3)).unwrap_err(),
            GlyphError::UnknownSystem(SystemId(3))
        );
    }
}
