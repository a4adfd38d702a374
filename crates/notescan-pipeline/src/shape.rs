//! Shape labels attached to glyphs.
//!
//! Choosing a label is the job of an external classifier. The pipeline
//! itself only relies on three of them: [`Shape::Stem`] to find stems
//! next to a glyph, [`Shape::Ledger`] for ledger marks, and
//! [`Shape::NoLegalShape`] for glyphs absorbed into a compound.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The label assigned to a glyph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    /// The glyph has been decomposed into, or merged from, other glyphs
    /// and carries no label of its own.
    NoLegalShape,
    /// Too small or too messy to mean anything.
    Noise,
    /// Known to be garbage (text, stains, ...).
    Clutter,
    /// Vertical line attached to note heads.
    Stem,
    /// Short horizontal line extending a staff.
    Ledger,
    /// Thick line joining stems.
    Beam,
    /// Filled note head.
    NoteheadBlack,
    /// Hollow note head.
    NoteheadVoid,
    /// Whole note.
    WholeNote,
    /// Augmentation dot.
    Dot,
    /// Sharp accidental.
    Sharp,
    /// Flat accidental.
    Flat,
    /// Natural accidental.
    Natural,
    /// Treble clef.
    GClef,
    /// Bass clef.
    FClef,
    /// Alto or tenor clef.
    CClef,
    /// Slur or tie.
    Slur,
}

impl Shape {
    /// Returns `true` for a stem.
    #[must_use]
    pub const fn is_stem(self) -> bool {
        matches!(self, Self::Stem)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NoLegalShape => "no-legal-shape",
            Self::Noise => "noise",
            Self::Clutter => "clutter",
            Self::Stem => "stem",
            Self::Ledger => "ledger",
            Self::Beam => "beam",
            Self::NoteheadBlack => "notehead-black",
            Self::NoteheadVoid => "notehead-void",
            Self::WholeNote => "whole-note",
            Self::Dot => "dot",
            Self::Sharp => "sharp",
            Self::Flat => "flat",
            Self::Natural => "natural",
            Self::GClef => "g-clef",
            Self::FClef => "f-clef",
            Self::CClef => "c-clef",
            Self::Slur => "slur",
        };
        f.write_str(name)
    }
}
