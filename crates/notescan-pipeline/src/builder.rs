//! Building, inserting and removing the glyphs of a sheet.
//!
//! [`GlyphsBuilder`] is the only place where sections get claimed by a
//! glyph. New glyphs come either from flood-filling the unclaimed
//! sections of a system ([`GlyphsBuilder::retrieve_system_glyphs`]) or
//! from merging existing glyphs ([`GlyphsBuilder::build_compound`]).
//! Either way they stay transient until passed to
//! [`GlyphsBuilder::insert`].
//!
//! Removing a glyph only cuts the links from its sections when asked to.
//! A glyph removed without cutting leaves its sections claimed, so the
//! next extraction does not rebuild anything out of them.

use std::collections::BTreeSet;

use tracing::{debug, info, trace, warn};

use crate::extract;
use crate::features::FeatureComputer;
use crate::glyph::{Glyph, GlyphId};
use crate::section::SectionId;
use crate::shape::Shape;
use crate::sheet::Sheet;
use crate::store::Registration;
use crate::system::SystemId;
use crate::types::{GlyphConfig, GlyphError};

/// Sheet-dedicated builder of glyphs.
#[derive(Debug)]
pub struct GlyphsBuilder<'a> {
    sheet: &'a mut Sheet,
    config: GlyphConfig,
}

impl<'a> GlyphsBuilder<'a> {
    /// Create a builder working on `sheet` with the given tolerances.
    #[must_use]
    pub const fn new(sheet: &'a mut Sheet, config: GlyphConfig) -> Self {
        Self { sheet, config }
    }

    /// The sheet being worked on.
    #[must_use]
    pub const fn sheet(&self) -> &Sheet {
        self.sheet
    }

    /// Compute the features of a transient glyph as seen from `system`.
    ///
    /// # Errors
    ///
    /// See [`FeatureComputer::compute`].
    pub fn compute_features(&self, system: SystemId, glyph: &mut Glyph) -> Result<(), GlyphError> {
        FeatureComputer::new(self.sheet, &self.config).compute(system, glyph)
    }

    /// Merge the sections of `parts` into a new, unregistered glyph.
    ///
    /// The member sections are left untouched and the parts keep their
    /// registration: nothing changes until the compound is inserted.
    /// Features are computed against the system found at the top of the
    /// compound.
    ///
    /// # Errors
    ///
    /// Returns [`GlyphError::EmptyGlyph`] if `parts` is empty,
    /// [`GlyphError::UnknownGlyph`] for an unregistered part, and
    /// [`GlyphError::NoSystemAt`] if no system lies at the compound top.
    pub fn build_compound(&self, parts: &[GlyphId]) -> Result<Glyph, GlyphError> {
        if parts.is_empty() {
            return Err(GlyphError::EmptyGlyph);
        }
        let mut members: BTreeSet<SectionId> = BTreeSet::new();
        for &part in parts {
            members.extend(self.sheet.glyph(part)?.members());
        }

        let mut compound = Glyph::from_sections(self.sheet.sections(), members)?;
        compound.set_parts(parts.to_vec());

        let system = self.sheet.system_at_y(compound.contour().y)?;
        self.compute_features(system, &mut compound)?;
        Ok(compound)
    }

    /// Register a glyph, claim its sections and add it to its system.
    ///
    /// When `system` is `None`, the system is the one found at the top
    /// of the glyph contour. When the glyph is a compound, its parts are
    /// first detached: they point to the compound, lose their shape and
    /// leave the system, while their sections are not unclaimed.
    ///
    /// If a glyph with the same members was registered before, that glyph
    /// stays the glyph of record: it keeps its id and shape and takes the
    /// freshly computed features.
    ///
    /// # Errors
    ///
    /// Returns [`GlyphError::NoSystemAt`] or [`GlyphError::UnknownSystem`]
    /// if the system cannot be resolved, and [`GlyphError::UnknownGlyph`]
    /// if a part is not registered.
    pub fn insert(&mut self, mut glyph: Glyph, system: Option<SystemId>) -> Result<GlyphId, GlyphError> {
        let system = match system {
            Some(id) => self.sheet.system(id)?.id(),
            None => self.sheet.system_at_y(glyph.contour().y)?,
        };
        let parts = glyph.parts().to_vec();
        for &part in &parts {
            self.sheet.glyph(part)?;
        }

        if glyph.interline() == 0 {
            glyph.set_interline(self.sheet.scale().interline());
        }

        let registration = self.sheet.store_mut().register(glyph);
        let id = registration.id();
        if let Registration::Existing(_) = registration {
            trace!(glyph = %id, "reusing registered glyph");
        }

        for part in parts.into_iter().filter(|&part| part != id) {
            let detached = self.sheet.glyph_mut(part)?;
            detached.set_part_of(Some(id));
            detached.set_shape(Some(Shape::NoLegalShape));
            self.remove(part, Some(system), false)?;
        }

        let members: Vec<SectionId> = self.sheet.glyph(id)?.members().iter().copied().collect();
        for section in members {
            self.sheet.sections_mut().set_glyph(section, Some(id))?;
        }
        self.sheet.system_mut(system)?.add_glyph(id);

        Ok(id)
    }

    /// Remove a glyph from its system.
    ///
    /// When `system` is `None`, it is resolved from the top of the glyph
    /// contour. If the system does not hold the glyph, its closest
    /// neighbour is tried; failing that, the inconsistency is logged and
    /// the removal carries on. Sections still pointing to the glyph are
    /// unclaimed only when `cut_sections` is set.
    ///
    /// # Errors
    ///
    /// Returns [`GlyphError::UnknownGlyph`] if the glyph was never
    /// registered, and [`GlyphError::NoSystemAt`] or
    /// [`GlyphError::UnknownSystem`] if the system cannot be resolved.
    pub fn remove(
        &mut self,
        id: GlyphId,
        system: Option<SystemId>,
        cut_sections: bool,
    ) -> Result<(), GlyphError> {
        let glyph = self.sheet.glyph(id)?;
        let y = glyph.contour().y;
        let members: Vec<SectionId> = if cut_sections {
            glyph.members().iter().copied().collect()
        } else {
            Vec::new()
        };

        let system = match system {
            Some(system) => system,
            None => self.sheet.system_at_y(y)?,
        };

        if !self.sheet.system_mut(system)?.remove_glyph(id) {
            match self.sheet.closest_system(system, y) {
                Some(closest) => {
                    if !self.sheet.system_mut(closest)?.remove_glyph(id) {
                        warn!(glyph = %id, %system, %closest, "cannot find glyph close to system");
                    }
                }
                None => warn!(glyph = %id, %system, "cannot find glyph in system"),
            }
        }

        for section in members {
            if self.sheet.sections().glyph_of(section) == Some(id) {
                self.sheet.sections_mut().set_glyph(section, None)?;
            }
        }

        Ok(())
    }

    /// Remove, without cutting sections, every glyph of `system` that is
    /// no longer active. Returns the number of glyphs removed.
    ///
    /// # Errors
    ///
    /// Returns [`GlyphError::UnknownSystem`] if the system does not exist.
    pub fn remove_inactive(&mut self, system: SystemId) -> Result<usize, GlyphError> {
        let graph = self.sheet.sections();
        let store = self.sheet.store();
        let inactive: Vec<GlyphId> = self
            .sheet
            .system(system)?
            .glyphs()
            .iter()
            .copied()
            .filter(|&id| store.get(id).is_some_and(|g| !g.is_active(graph)))
            .collect();

        for &id in &inactive {
            self.remove(id, Some(system), false)?;
        }
        if !inactive.is_empty() {
            debug!(%system, count = inactive.len(), "removed inactive glyphs");
        }
        Ok(inactive.len())
    }

    /// Build glyphs out of the unclaimed sections of `system`.
    ///
    /// Returns the number of glyphs built.
    ///
    /// # Errors
    ///
    /// Returns [`GlyphError::UnknownSystem`] if the system does not exist.
    pub fn retrieve_system_glyphs(&mut self, system: SystemId) -> Result<usize, GlyphError> {
        let memberships = extract::system_memberships(self.sheet.sections(), self.sheet.system(system)?);
        let count = memberships.len();

        for members in memberships {
            let mut glyph = Glyph::from_sections(self.sheet.sections(), members)?;
            self.compute_features(system, &mut glyph)?;
            self.insert(glyph, Some(system))?;
        }

        debug!(%system, count, "glyphs built");
        Ok(count)
    }

    /// Drop the stale glyphs of `system`, then build new glyphs from the
    /// sections left unclaimed.
    ///
    /// # Errors
    ///
    /// Returns [`GlyphError::UnknownSystem`] if the system does not exist.
    pub fn extract_new_system_glyphs(&mut self, system: SystemId) -> Result<usize, GlyphError> {
        self.remove_inactive(system)?;
        self.retrieve_system_glyphs(system)
    }

    /// Build new glyphs in every system of the sheet, returning the total.
    ///
    /// # Errors
    ///
    /// Propagates the first error raised by a system.
    pub fn retrieve_glyphs(&mut self) -> Result<usize, GlyphError> {
        self.sheet.prepare_horizontals();

        let systems: Vec<SystemId> = self.sheet.system_ids().collect();
        let mut total = 0;
        for system in systems {
            total += self.retrieve_system_glyphs(system)?;
        }

        if total > 0 {
            info!(count = total, "glyph{} found", if total > 1 { "s" } else { "" });
        } else {
            info!("No glyph found");
        }
        Ok(total)
    }
}
