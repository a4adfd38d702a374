//! Flood fill of unclaimed sections into glyph memberships.
//!
//! Growing a glyph walks both the sources and the targets of every
//! section reached. The walk uses an explicit stack, so a long chain of
//! sections cannot exhaust the call stack, and is confined to the
//! sections enumerated by the system being processed.
//!
//! Nothing here claims a section. Claiming only happens when the
//! resulting glyph is inserted by the
//! [`GlyphsBuilder`](crate::builder::GlyphsBuilder).

use std::collections::{BTreeSet, HashSet};

use tracing::warn;

use crate::section::{SectionGraph, SectionId};
use crate::system::System;

/// Collect the unclaimed sections connected to `seed`.
///
/// Only sections in `allowed` are considered. Every section reached is
/// added to `visited`, which callers share across seeds so that a
/// section ends up in at most one membership.
pub fn grow_from(
    graph: &SectionGraph,
    seed: SectionId,
    allowed: &HashSet<SectionId>,
    visited: &mut HashSet<SectionId>,
) -> BTreeSet<SectionId> {
    let mut members = BTreeSet::new();
    let mut stack = vec![seed];

    while let Some(id) = stack.pop() {
        if !allowed.contains(&id) || visited.contains(&id) {
            continue;
        }
        match graph.get(id) {
            Ok(section) if section.is_known() => continue,
            Ok(_) => {}
            Err(e) => {
                warn!(section = id.index(), "skipping section during glyph growth: {e}");
                visited.insert(id);
                continue;
            }
        }

        visited.insert(id);
        members.insert(id);
        stack.extend(graph.sources(id));
        stack.extend(graph.targets(id));
    }

    members
}

/// Split the unclaimed sections of a system into connected memberships.
///
/// Memberships come out in the order of their first section within
/// [`System::vertical_sections`].
#[must_use]
pub fn system_memberships(graph: &SectionGraph, system: &System) -> Vec<BTreeSet<SectionId>> {
    let allowed: HashSet<SectionId> = system.vertical_sections().iter().copied().collect();
    let mut visited = HashSet::new();
    let mut memberships = Vec::new();

    for &seed in system.vertical_sections() {
        if visited.contains(&seed) {
            continue;
        }
        let members = grow_from(graph, seed, &allowed, &mut visited);
        if !members.is_empty() {
            memberships.push(members);
        }
    }

    memberships
}
