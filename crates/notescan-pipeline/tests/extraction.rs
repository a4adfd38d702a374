//! Integration tests: glyph extraction, registration and removal.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{add_section, link, sheet_with_systems};
use notescan_pipeline::{
    GlyphConfig, GlyphId, GlyphsBuilder, Rectangle, Scale, Section, SectionGraph, Shape, Sheet,
    SystemId,
};

const SYSTEM: SystemId = SystemId(0);

#[test]
fn linked_chain_becomes_one_glyph() {
    let mut sheet = sheet_with_systems(1);
    let a = add_section(&mut sheet, SYSTEM, Rectangle::new(10, 10, 4, 4));
    let b = add_section(&mut sheet, SYSTEM, Rectangle::new(14, 8, 4, 6));
    let c = add_section(&mut sheet, SYSTEM, Rectangle::new(18, 10, 4, 8));
    link(&mut sheet, a, b);
    link(&mut sheet, b, c);

    let mut builder = GlyphsBuilder::new(&mut sheet, GlyphConfig::default());
    assert_eq!(builder.retrieve_glyphs().unwrap(), 1);

    let ids: Vec<GlyphId> = sheet.system(SYSTEM).unwrap().glyphs().iter().copied().collect();
    assert_eq!(ids.len(), 1);
    let glyph = sheet.glyph(ids[0]).unwrap();
    assert_eq!(glyph.contour(), Rectangle::new(10, 8, 12, 10));
    assert_eq!(glyph.weight(), 16 + 24 + 32);
    assert_eq!(glyph.interline(), common::INTERLINE);
    for section in [a, b, c] {
        assert_eq!(sheet.sections().glyph_of(section), Some(ids[0]));
    }
}

#[test]
fn link_direction_does_not_split_glyphs() {
    let mut sheet = sheet_with_systems(1);
    let a = add_section(&mut sheet, SYSTEM, Rectangle::new(10, 10, 4, 4));
    let b = add_section(&mut sheet, SYSTEM, Rectangle::new(14, 10, 4, 4));
    let c = add_section(&mut sheet, SYSTEM, Rectangle::new(18, 10, 4, 4));
    // b is reached from c only through an incoming link.
    link(&mut sheet, a, b);
    link(&mut sheet, c, b);

    let mut builder = GlyphsBuilder::new(&mut sheet, GlyphConfig::default());
    assert_eq!(builder.retrieve_glyphs().unwrap(), 1);
}

#[test]
fn second_extraction_finds_nothing() {
    let mut sheet = sheet_with_systems(2);
    add_section(&mut sheet, SYSTEM, Rectangle::new(10, 10, 4, 4));
    add_section(&mut sheet, SYSTEM, Rectangle::new(50, 10, 4, 4));
    add_section(&mut sheet, SystemId(1), Rectangle::new(10, 210, 4, 4));

    let mut builder = GlyphsBuilder::new(&mut sheet, GlyphConfig::default());
    assert_eq!(builder.retrieve_glyphs().unwrap(), 3);
    assert_eq!(builder.retrieve_glyphs().unwrap(), 0);
    assert_eq!(builder.extract_new_system_glyphs(SYSTEM).unwrap(), 0);

    assert_eq!(sheet.store().len(), 3);
    assert_eq!(sheet.system(SYSTEM).unwrap().glyphs().len(), 2);
    assert_eq!(sheet.system(SystemId(1)).unwrap().glyphs().len(), 1);
}

#[test]
fn removal_without_cut_keeps_sections_claimed() {
    let mut sheet = sheet_with_systems(1);
    let a = add_section(&mut sheet, SYSTEM, Rectangle::new(10, 10, 4, 4));

    let mut builder = GlyphsBuilder::new(&mut sheet, GlyphConfig::default());
    builder.retrieve_glyphs().unwrap();
    let id = builder.sheet().sections().glyph_of(a).unwrap();

    builder.remove(id, None, false).unwrap();
    assert_eq!(builder.sheet().sections().glyph_of(a), Some(id));
    assert!(builder.sheet().system(SYSTEM).unwrap().glyphs().is_empty());

    assert_eq!(builder.extract_new_system_glyphs(SYSTEM).unwrap(), 0);
    assert!(sheet.system(SYSTEM).unwrap().glyphs().is_empty());
}

#[test]
fn removal_with_cut_lets_the_same_glyph_come_back() {
    let mut sheet = sheet_with_systems(1);
    let a = add_section(&mut sheet, SYSTEM, Rectangle::new(10, 10, 4, 4));
    let b = add_section(&mut sheet, SYSTEM, Rectangle::new(14, 10, 4, 4));
    link(&mut sheet, a, b);

    let mut builder = GlyphsBuilder::new(&mut sheet, GlyphConfig::default());
    builder.retrieve_glyphs().unwrap();
    let id = builder.sheet().sections().glyph_of(a).unwrap();

    builder.remove(id, Some(SYSTEM), true).unwrap();
    assert!(!builder.sheet().sections().get(a).unwrap().is_known());
    assert!(!builder.sheet().sections().get(b).unwrap().is_known());

    assert_eq!(builder.extract_new_system_glyphs(SYSTEM).unwrap(), 1);
    assert_eq!(sheet.sections().glyph_of(a), Some(id));
    assert_eq!(sheet.store().len(), 1);
    assert!(sheet.system(SYSTEM).unwrap().glyphs().contains(&id));
}

#[test]
fn assigned_shape_survives_an_unrelated_edit() {
    let mut sheet = sheet_with_systems(1);
    let a = add_section(&mut sheet, SYSTEM, Rectangle::new(10, 10, 4, 4));
    let b = add_section(&mut sheet, SYSTEM, Rectangle::new(80, 10, 4, 4));

    let mut builder = GlyphsBuilder::new(&mut sheet, GlyphConfig::default());
    builder.retrieve_glyphs().unwrap();
    let first = builder.sheet().sections().glyph_of(a).unwrap();
    let second = builder.sheet().sections().glyph_of(b).unwrap();

    sheet.glyph_mut(first).unwrap().set_shape(Some(Shape::Sharp));

    // Edit elsewhere: cut the other glyph and grow it by one section.
    GlyphsBuilder::new(&mut sheet, GlyphConfig::default())
        .remove(second, None, true)
        .unwrap();
    let extra = add_section(&mut sheet, SYSTEM, Rectangle::new(84, 10, 4, 4));
    link(&mut sheet, b, extra);

    let mut builder = GlyphsBuilder::new(&mut sheet, GlyphConfig::default());
    assert_eq!(builder.extract_new_system_glyphs(SYSTEM).unwrap(), 1);

    let glyph = sheet.glyph(first).unwrap();
    assert_eq!(glyph.shape(), Some(Shape::Sharp));
    assert_eq!(sheet.sections().glyph_of(a), Some(first));
    assert!(sheet.system(SYSTEM).unwrap().glyphs().contains(&first));
    assert_ne!(sheet.sections().glyph_of(extra), Some(second));
}

#[test]
fn assigned_shape_survives_recut_and_rebuild() {
    let mut sheet = sheet_with_systems(1);
    let a = add_section(&mut sheet, SYSTEM, Rectangle::new(10, 10, 4, 4));

    let mut builder = GlyphsBuilder::new(&mut sheet, GlyphConfig::default());
    builder.retrieve_glyphs().unwrap();
    let id = builder.sheet().sections().glyph_of(a).unwrap();
    sheet.glyph_mut(id).unwrap().set_shape(Some(Shape::Dot));

    let mut builder = GlyphsBuilder::new(&mut sheet, GlyphConfig::default());
    builder.remove(id, None, true).unwrap();
    assert_eq!(builder.extract_new_system_glyphs(SYSTEM).unwrap(), 1);

    assert_eq!(sheet.sections().glyph_of(a), Some(id));
    assert_eq!(sheet.glyph(id).unwrap().shape(), Some(Shape::Dot));
}

#[test]
fn stale_glyphs_are_dropped_before_rebuilding() {
    let mut sheet = sheet_with_systems(1);
    let a = add_section(&mut sheet, SYSTEM, Rectangle::new(10, 10, 4, 4));
    let b = add_section(&mut sheet, SYSTEM, Rectangle::new(14, 10, 4, 4));
    link(&mut sheet, a, b);

    let mut builder = GlyphsBuilder::new(&mut sheet, GlyphConfig::default());
    builder.retrieve_glyphs().unwrap();
    let id = builder.sheet().sections().glyph_of(a).unwrap();

    // A glyph for `a` alone steals the section: the pair is no longer active.
    let alone = notescan_pipeline::Glyph::from_sections(sheet.sections(), [a]).unwrap();
    let mut builder = GlyphsBuilder::new(&mut sheet, GlyphConfig::default());
    let stolen = builder.insert(alone, Some(SYSTEM)).unwrap();
    assert_ne!(stolen, id);
    assert!(!builder.sheet().glyph(id).unwrap().is_active(builder.sheet().sections()));

    assert_eq!(builder.remove_inactive(SYSTEM).unwrap(), 1);
    let held: Vec<GlyphId> = sheet.system(SYSTEM).unwrap().glyphs().iter().copied().collect();
    assert_eq!(held, vec![stolen]);
    // `b` stays claimed by the dropped glyph, since it was not cut.
    assert_eq!(sheet.sections().glyph_of(b), Some(id));
}

#[test]
fn compound_detaches_its_parts() {
    let mut sheet = sheet_with_systems(1);
    let a = add_section(&mut sheet, SYSTEM, Rectangle::new(10, 10, 4, 4));
    let b = add_section(&mut sheet, SYSTEM, Rectangle::new(30, 12, 4, 4));

    let mut builder = GlyphsBuilder::new(&mut sheet, GlyphConfig::default());
    assert_eq!(builder.retrieve_glyphs().unwrap(), 2);
    let first = builder.sheet().sections().glyph_of(a).unwrap();
    let second = builder.sheet().sections().glyph_of(b).unwrap();

    let compound = builder.build_compound(&[first, second]).unwrap();
    assert_eq!(compound.contour(), Rectangle::new(10, 10, 24, 6));
    // Nothing changes until the compound is inserted.
    assert_eq!(builder.sheet().sections().glyph_of(a), Some(first));

    let id = builder.insert(compound, None).unwrap();
    assert_eq!(sheet.sections().glyph_of(a), Some(id));
    assert_eq!(sheet.sections().glyph_of(b), Some(id));
    for part in [first, second] {
        let glyph = sheet.glyph(part).unwrap();
        assert_eq!(glyph.part_of(), Some(id));
        assert_eq!(glyph.shape(), Some(Shape::NoLegalShape));
    }
    let held: Vec<GlyphId> = sheet.system(SYSTEM).unwrap().glyphs().iter().copied().collect();
    assert_eq!(held, vec![id]);
    assert_eq!(sheet.glyph(id).unwrap().parts(), &[first, second]);
}

#[test]
fn compound_of_nothing_is_rejected() {
    let mut sheet = sheet_with_systems(1);
    let builder = GlyphsBuilder::new(&mut sheet, GlyphConfig::default());
    assert_eq!(
        builder.build_compound(&[]).unwrap_err(),
        notescan_pipeline::GlyphError::EmptyGlyph
    );
}

/// Two systems, R1 over `0..100` and R2 over `100..200`.
fn banded_sheet() -> Sheet {
    let mut sheet = Sheet::new(Scale::new(20).unwrap(), SectionGraph::new());
    sheet.add_system(Rectangle::new(0, 0, 1000, 100)).unwrap();
    sheet.add_system(Rectangle::new(0, 100, 1000, 100)).unwrap();
    sheet
}

#[test]
fn removal_falls_back_to_the_closest_system() {
    let mut sheet = banded_sheet();
    let r2 = SystemId(1);
    // Top at y=99 lies in R1, but the glyph belongs to R2.
    let section = sheet
        .sections_mut()
        .add_section(Section::rectangle(Rectangle::new(40, 99, 4, 12)).unwrap());
    sheet.system_mut(r2).unwrap().add_section(section);

    let glyph = notescan_pipeline::Glyph::from_sections(sheet.sections(), [section]).unwrap();
    let mut builder = GlyphsBuilder::new(&mut sheet, GlyphConfig::default());
    let id = builder.insert(glyph, Some(r2)).unwrap();
    assert_eq!(builder.sheet().system_at_y(99).unwrap(), SystemId(0));

    builder.remove(id, None, false).unwrap();
    assert!(sheet.system(r2).unwrap().glyphs().is_empty());
}

#[test]
fn removal_of_a_missing_glyph_is_not_fatal() {
    let mut sheet = banded_sheet();
    let section = sheet
        .sections_mut()
        .add_section(Section::rectangle(Rectangle::new(40, 10, 4, 4)).unwrap());
    sheet.system_mut(SystemId(0)).unwrap().add_section(section);

    let mut builder = GlyphsBuilder::new(&mut sheet, GlyphConfig::default());
    assert_eq!(builder.retrieve_glyphs().unwrap(), 1);
    let id = builder.sheet().sections().glyph_of(section).unwrap();

    builder.remove(id, None, true).unwrap();
    // Second removal: neither R1 nor its neighbour holds the glyph.
    builder.remove(id, None, true).unwrap();
    assert!(!sheet.sections().get(section).unwrap().is_known());
}

#[test]
fn removal_of_an_unknown_glyph_is_an_error() {
    let mut sheet = banded_sheet();
    let mut builder = GlyphsBuilder::new(&mut sheet, GlyphConfig::default());
    assert!(matches!(
        builder.remove(GlyphId(7), Some(SystemId(0)), false),
        Err(notescan_pipeline::GlyphError::UnknownGlyph(GlyphId(7)))
    ));
}

#[test]
fn long_chains_do_not_exhaust_the_stack() {
    let mut sheet = sheet_with_systems(1);
    let mut previous = add_section(&mut sheet, SYSTEM, Rectangle::new(0, 10, 1, 4));
    for x in 1..20_000 {
        let next = add_section(&mut sheet, SYSTEM, Rectangle::new(x % 1000, 10, 1, 4));
        link(&mut sheet, previous, next);
        previous = next;
    }

    let mut builder = GlyphsBuilder::new(&mut sheet, GlyphConfig::default());
    assert_eq!(builder.retrieve_glyphs().unwrap(), 1);
}
