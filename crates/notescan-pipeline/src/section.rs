//! Sections and the directed graph that links them.
//!
//! A [`Section`] is a sequence of vertical pixel runs lying in
//! consecutive columns. Sections that touch each other from one column to
//! the next are linked in a [`SectionGraph`]: the section on the left is
//! a *source* of the one on the right, which is in turn one of its
//! *targets*.
//!
//! Building sections out of a binary image is the job of an earlier
//! stage. This module only stores them, exposes their adjacency, and
//! records which glyph currently claims each of them.

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::glyph::{GlyphId, MomentSums};
use crate::types::{GlyphError, Rectangle};

/// Index of a section within its [`SectionGraph`].
pub type SectionId = NodeIndex;

/// A vertical run of foreground pixels within one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    /// Ordinate of the first pixel.
    pub start: i32,
    /// Number of pixels.
    pub length: i32,
}

impl Run {
    /// Create a new run.
    #[must_use]
    pub const fn new(start: i32, length: i32) -> Self {
        Self { start, length }
    }

    /// Ordinate one past the last pixel.
    #[must_use]
    pub const fn end(&self) -> i32 {
        self.start + self.length
    }
}

/// A connected sequence of vertical runs, one per column.
#[derive(Debug, Clone)]
pub struct Section {
    first_pos: i32,
    runs: Vec<Run>,
    contour: Rectangle,
    weight: u64,
    glyph: Option<GlyphId>,
}

impl Section {
    /// Create a section whose first run lies in column `first_pos`.
    ///
    /// # Errors
    ///
    /// Returns [`GlyphError::InvalidSection`] if `runs` is empty or if a
    /// run has no pixel.
    pub fn new(first_pos: i32, runs: Vec<Run>) -> Result<Self, GlyphError> {
        if runs.is_empty() {
            return Err(GlyphError::InvalidSection(format!(
                "section at x={first_pos} has no run"
            )));
        }
        if let Some(run) = runs.iter().find(|r| r.length <= 0) {
            return Err(GlyphError::InvalidSection(format!(
                "run at y={} has length {}",
                run.start, run.length
            )));
        }

        let top = runs.iter().map(|r| r.start).min().unwrap_or_default();
        let bottom = runs.iter().map(Run::end).max().unwrap_or_default();
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let width = runs.len() as i32;
        #[allow(clippy::cast_sign_loss)]
        let weight = runs.iter().map(|r| r.length as u64).sum();

        Ok(Self {
            first_pos,
            contour: Rectangle::new(first_pos, top, width, bottom - top),
            runs,
            weight,
            glyph: None,
        })
    }

    /// A solid rectangular section, one full-height run per column.
    ///
    /// # Errors
    ///
    /// Returns [`GlyphError::InvalidSection`] if the rectangle is empty.
    pub fn rectangle(rect: Rectangle) -> Result<Self, GlyphError> {
        let runs = (0..rect.width.max(0))
            .map(|_| Run::new(rect.y, rect.height))
            .collect();
        Self::new(rect.x, runs)
    }

    /// Abscissa of the first run.
    #[must_use]
    pub const fn first_pos(&self) -> i32 {
        self.first_pos
    }

    /// The runs, from left to right.
    #[must_use]
    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    /// Bounding box of all the runs.
    #[must_use]
    pub const fn contour(&self) -> Rectangle {
        self.contour
    }

    /// Number of foreground pixels.
    #[must_use]
    pub const fn weight(&self) -> u64 {
        self.weight
    }

    /// The glyph currently claiming this section, if any.
    #[must_use]
    pub const fn glyph(&self) -> Option<GlyphId> {
        self.glyph
    }

    /// Returns `true` if some glyph claims this section.
    #[must_use]
    pub const fn is_known(&self) -> bool {
        self.glyph.is_some()
    }

    /// Add this section's pixels to a moment accumulator.
    pub(crate) fn accumulate(&self, sums: &mut MomentSums) {
        for (column, run) in self.runs.iter().enumerate() {
            #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
            let x = self.first_pos + column as i32;
            sums.push_run(x, run.start, run.length);
        }
    }
}

/// Directed graph of the vertical sections of a sheet.
#[derive(Debug, Clone, Default)]
pub struct SectionGraph {
    graph: DiGraph<Section, ()>,
}

impl SectionGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a section, returning its id.
    pub fn add_section(&mut self, section: Section) -> SectionId {
        self.graph.add_node(section)
    }

    /// Link `source` to `target` (at most one edge per ordered pair).
    ///
    /// # Errors
    ///
    /// Returns [`GlyphError::UnknownSection`] if either end is not part
    /// of the graph.
    pub fn link(&mut self, source: SectionId, target: SectionId) -> Result<(), GlyphError> {
        self.get(source)?;
        self.get(target)?;
        self.graph.update_edge(source, target, ());
        Ok(())
    }

    /// Number of sections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns `true` if the graph holds no section.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// All section ids, in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = SectionId> + '_ {
        self.graph.node_indices()
    }

    /// The section with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`GlyphError::UnknownSection`] if the id is out of range.
    pub fn get(&self, id: SectionId) -> Result<&Section, GlyphError> {
        self.graph
            .node_weight(id)
            .ok_or(GlyphError::UnknownSection(id.index()))
    }

    /// Sections linked *to* this one (incoming edges).
    pub fn sources(&self, id: SectionId) -> impl Iterator<Item = SectionId> + '_ {
        self.graph.neighbors_directed(id, Direction::Incoming)
    }

    /// Sections this one links to (outgoing edges).
    pub fn targets(&self, id: SectionId) -> impl Iterator<Item = SectionId> + '_ {
        self.graph.neighbors_directed(id, Direction::Outgoing)
    }

    /// The glyph claiming a section, `None` when unclaimed or unknown.
    #[must_use]
    pub fn glyph_of(&self, id: SectionId) -> Option<GlyphId> {
        self.graph.node_weight(id).and_then(Section::glyph)
    }

    /// Record (or clear) the glyph claiming a section.
    pub(crate) fn set_glyph(
        &mut self,
        id: SectionId,
        glyph: Option<GlyphId>,
    ) -> Result<(), GlyphError> {
        let section = self
            .graph
            .node_weight_mut(id)
            .ok_or(GlyphError::UnknownSection(id.index()))?;
        section.glyph = glyph;
        Ok(())
    }
}
