//! Shared fixtures for integration tests.
//!
//! Sheets use an interline of 20 pixels. Each system spans 200 pixels
//! and carries one five-line staff whose top line lies 60 pixels below
//! the system top, so its middle line is 100 pixels below.

#![allow(dead_code, clippy::unwrap_used)]

use notescan_pipeline::{
    Ledger, Rectangle, Scale, Section, SectionGraph, SectionId, Sheet, Staff, SystemId,
};

pub const INTERLINE: u32 = 20;
pub const SYSTEM_HEIGHT: i32 = 200;
pub const STAFF_TOP: f64 = 60.0;

/// An empty sheet with `count` stacked systems, each with its staff.
pub fn sheet_with_systems(count: usize) -> Sheet {
    let mut sheet = Sheet::new(Scale::new(INTERLINE).unwrap(), SectionGraph::new());
    for index in 0..count {
        let top = i32::try_from(index).unwrap() * SYSTEM_HEIGHT;
        let system = sheet
            .add_system(Rectangle::new(0, top, 1000, SYSTEM_HEIGHT))
            .unwrap();
        sheet
            .system_mut(system)
            .unwrap()
            .add_staff(Staff::five_lines(STAFF_TOP, f64::from(INTERLINE)).unwrap());
    }
    sheet
}

/// Add a rectangular section to the sheet and enumerate it in `system`.
pub fn add_section(sheet: &mut Sheet, system: SystemId, rect: Rectangle) -> SectionId {
    let id = sheet
        .sections_mut()
        .add_section(Section::rectangle(rect).unwrap());
    sheet.system_mut(system).unwrap().add_section(id);
    id
}

/// Link `source` to `target` in the section graph.
pub fn link(sheet: &mut Sheet, source: SectionId, target: SectionId) {
    sheet.sections_mut().link(source, target).unwrap();
}

/// Add a ledger, in sheet coordinates, to `system`.
pub fn add_ledger(sheet: &mut Sheet, system: SystemId, rect: Rectangle) {
    sheet.system_mut(system).unwrap().add_ledger(Ledger::new(rect));
}

/// A note head centred on `(x + 12, cy)`: three linked sections, eight
/// pixels wide each, the middle one taller.
pub fn add_note_head(sheet: &mut Sheet, system: SystemId, x: i32, cy: i32) -> [SectionId; 3] {
    let left = add_section(sheet, system, Rectangle::new(x, cy - 7, 8, 15));
    let middle = add_section(sheet, system, Rectangle::new(x + 8, cy - 10, 8, 21));
    let right = add_section(sheet, system, Rectangle::new(x + 16, cy - 7, 8, 15));
    link(sheet, left, middle);
    link(sheet, middle, right);
    [left, middle, right]
}

/// A stem seed: two pixels wide and three interlines tall.
pub fn add_stem(sheet: &mut Sheet, system: SystemId, x: i32, top: i32) -> SectionId {
    add_section(sheet, system, Rectangle::new(x, top, 2, 60))
}
