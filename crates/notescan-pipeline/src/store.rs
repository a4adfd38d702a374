//! Arena of registered glyphs, deduplicated by section membership.
//!
//! Every glyph ever registered on a sheet lives here, indexed by its
//! [`GlyphId`]. Glyphs are never dropped from the arena: a glyph removed
//! from its system can be revived later, with its id and shape intact,
//! when the very same set of sections is registered again.

use std::collections::{BTreeSet, HashMap};
use std::hash::Hasher;

use siphasher::sip::SipHasher13;

use crate::glyph::{Glyph, GlyphId};
use crate::section::SectionId;
use crate::types::GlyphError;

/// Fixed keys so signatures are reproducible from one run to the next.
const SIGNATURE_KEYS: (u64, u64) = (0x6e6f_7465_7363_616e, 0x676c_7970_6873_2131);

/// Hash of a glyph's member sections.
///
/// Two glyphs with the same members always share a signature. Distinct
/// memberships may collide, so the store checks the full membership
/// within a signature bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature(u64);

impl Signature {
    /// Compute the signature of a membership.
    #[must_use]
    pub fn of(members: &BTreeSet<SectionId>) -> Self {
        let mut hasher = SipHasher13::new_with_keys(SIGNATURE_KEYS.0, SIGNATURE_KEYS.1);
        hasher.write_usize(members.len());
        for id in members {
            hasher.write_usize(id.index());
        }
        Self(hasher.finish())
    }
}

/// Outcome of [`GlyphStore::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The membership was new: a fresh id was assigned.
    New(GlyphId),
    /// An equivalent glyph was already registered under this id; the
    /// fresh attributes were pulled into it.
    Existing(GlyphId),
}

impl Registration {
    /// The id of the glyph of record.
    #[must_use]
    pub const fn id(self) -> GlyphId {
        match self {
            Self::New(id) | Self::Existing(id) => id,
        }
    }
}

/// Owner of every registered glyph of a sheet.
#[derive(Debug, Clone, Default)]
pub struct GlyphStore {
    glyphs: Vec<Glyph>,
    by_signature: HashMap<Signature, Vec<GlyphId>>,
}

impl GlyphStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a glyph, or merge it into the equivalent one already
    /// registered.
    pub(crate) fn register(&mut self, mut glyph: Glyph) -> Registration {
        let signature = Signature::of(glyph.members());

        if let Some(id) = self.lookup_with(signature, glyph.members()) {
            if let Some(existing) = self.glyphs.get_mut(index(id)) {
                existing.pull_from(&glyph);
            }
            return Registration::Existing(id);
        }

        #[allow(clippy::cast_possible_truncation)]
        let id = GlyphId(self.glyphs.len() as u32);
        glyph.set_id(id);
        self.glyphs.push(glyph);
        self.by_signature.entry(signature).or_default().push(id);
        Registration::New(id)
    }

    fn lookup_with(&self, signature: Signature, members: &BTreeSet<SectionId>) -> Option<GlyphId> {
        self.by_signature.get(&signature)?.iter().copied().find(|&id| {
            self.glyphs
                .get(index(id))
                .is_some_and(|g| g.members() == members)
        })
    }

    /// The registered glyph with the given id.
    #[must_use]
    pub fn get(&self, id: GlyphId) -> Option<&Glyph> {
        self.glyphs.get(index(id))
    }

    /// The registered glyph with the given id, or an error.
    ///
    /// # Errors
    ///
    /// Returns [`GlyphError::UnknownGlyph`] if the id was never issued.
    pub fn glyph(&self, id: GlyphId) -> Result<&Glyph, GlyphError> {
        self.get(id).ok_or(GlyphError::UnknownGlyph(id))
    }

    /// Mutable access to a registered glyph.
    ///
    /// # Errors
    ///
    /// Returns [`GlyphError::UnknownGlyph`] if the id was never issued.
    pub fn glyph_mut(&mut self, id: GlyphId) -> Result<&mut Glyph, GlyphError> {
        self.glyphs
            .get_mut(index(id))
            .ok_or(GlyphError::UnknownGlyph(id))
    }

    /// Number of glyphs ever registered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    /// Returns `true` if no glyph was ever registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// All registered glyphs, in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Glyph> {
        self.glyphs.iter()
    }
}

const fn index(id: GlyphId) -> usize {
    id.0 as usize
}
