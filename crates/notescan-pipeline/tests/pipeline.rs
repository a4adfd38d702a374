//! Integration tests: staged execution, failure isolation and reruns.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::{add_note_head, add_stem, link, sheet_with_systems};
use notescan_pipeline::diagnostics::NoClock;
use notescan_pipeline::{
    Mandatory, Pipeline, PipelineConfig, Scope, Sheet, SheetView, Step, StepError, StepLevel,
    StepProgress, StepState, SystemId,
};

type Log = Rc<RefCell<Vec<(&'static str, Scope)>>>;

/// A step that records where it ran and fails in one chosen system.
struct Recorder {
    name: &'static str,
    level: StepLevel,
    mandatory: Mandatory,
    deps: Vec<&'static str>,
    fail_in: Option<SystemId>,
    log: Log,
}

impl Recorder {
    fn system(name: &'static str, deps: &[&'static str], log: &Log) -> Self {
        Self {
            name,
            level: StepLevel::System,
            mandatory: Mandatory::Mandatory,
            deps: deps.to_vec(),
            fail_in: None,
            log: Rc::clone(log),
        }
    }

    fn sheet(name: &'static str, deps: &[&'static str], log: &Log) -> Self {
        Self {
            level: StepLevel::Sheet,
            ..Self::system(name, deps, log)
        }
    }

    fn failing_in(mut self, system: SystemId) -> Self {
        self.fail_in = Some(system);
        self
    }

    fn optional(mut self) -> Self {
        self.mandatory = Mandatory::Optional;
        self
    }
}

impl Step for Recorder {
    fn name(&self) -> &'static str {
        self.name
    }

    fn description(&self) -> &'static str {
        "recording step"
    }

    fn level(&self) -> StepLevel {
        self.level
    }

    fn mandatory(&self) -> Mandatory {
        self.mandatory
    }

    fn dependencies(&self) -> &[&'static str] {
        &self.deps
    }

    fn do_sheet(&self, _sheet: &mut Sheet) -> Result<(), StepError> {
        self.log.borrow_mut().push((self.name, Scope::Sheet));
        Ok(())
    }

    fn do_system(&self, _sheet: &mut Sheet, system: SystemId) -> Result<(), StepError> {
        self.log.borrow_mut().push((self.name, Scope::System(system)));
        if self.fail_in == Some(system) {
            return Err(StepError::Failed {
                step: self.name.to_string(),
                reason: "scripted failure".to_string(),
            });
        }
        Ok(())
    }
}

fn ran(log: &Log, name: &str) -> Vec<Scope> {
    log.borrow()
        .iter()
        .filter(|(step, _)| *step == name)
        .map(|&(_, scope)| scope)
        .collect()
}

fn system(index: usize) -> Scope {
    Scope::System(SystemId(index))
}

#[test]
fn failure_in_one_system_only_blocks_that_system() {
    let log = Log::default();
    let pipeline = Pipeline::builder()
        .step(Recorder::system("first", &[], &log).failing_in(SystemId(1)))
        .step(Recorder::system("second", &["first"], &log))
        .build()
        .unwrap();

    let mut sheet = sheet_with_systems(3);
    let mut progress = StepProgress::new();
    let diagnostics = pipeline.run(&mut sheet, &mut progress, None, &NoClock);

    assert_eq!(ran(&log, "first"), vec![system(0), system(1), system(2)]);
    assert_eq!(ran(&log, "second"), vec![system(0), system(2)]);
    assert_eq!(progress.state("second", system(1)), &StepState::Blocked);
    assert_eq!(progress.state("second", system(2)), &StepState::Done);
    assert!(matches!(
        progress.state("first", system(1)),
        StepState::Failed(reason) if reason.contains("scripted failure")
    ));

    assert_eq!(diagnostics.summary.done, 4);
    assert_eq!(diagnostics.summary.failed, 1);
    assert_eq!(diagnostics.summary.blocked, 1);
    assert!(diagnostics.report().contains("first @ system#1"));
}

#[test]
fn optional_failure_does_not_block() {
    let log = Log::default();
    let pipeline = Pipeline::builder()
        .step(Recorder::system("first", &[], &log).failing_in(SystemId(0)).optional())
        .step(Recorder::system("second", &["first"], &log))
        .build()
        .unwrap();

    let mut sheet = sheet_with_systems(2);
    let mut progress = StepProgress::new();
    let diagnostics = pipeline.run(&mut sheet, &mut progress, None, &NoClock);

    assert_eq!(ran(&log, "second"), vec![system(0), system(1)]);
    assert_eq!(diagnostics.summary.failed, 1);
    assert_eq!(diagnostics.summary.blocked, 0);
}

#[test]
fn sheet_step_waits_for_every_system() {
    let log = Log::default();
    let pipeline = Pipeline::builder()
        .step(Recorder::system("first", &[], &log).failing_in(SystemId(1)))
        .step(Recorder::sheet("summary", &["first"], &log))
        .build()
        .unwrap();

    let mut sheet = sheet_with_systems(2);
    let mut progress = StepProgress::new();
    pipeline.run(&mut sheet, &mut progress, None, &NoClock);

    assert!(ran(&log, "summary").is_empty());
    assert_eq!(progress.state("summary", Scope::Sheet), &StepState::Blocked);
}

#[test]
fn rerun_only_retries_what_did_not_complete() {
    let log = Log::default();
    let pipeline = Pipeline::builder()
        .step(Recorder::sheet("setup", &[], &log))
        .step(Recorder::system("first", &["setup"], &log).failing_in(SystemId(1)))
        .step(Recorder::system("second", &["first"], &log))
        .build()
        .unwrap();

    let mut sheet = sheet_with_systems(2);
    let mut progress = StepProgress::new();
    pipeline.run(&mut sheet, &mut progress, None, &NoClock);
    log.borrow_mut().clear();

    let diagnostics = pipeline.run(&mut sheet, &mut progress, None, &NoClock);
    assert!(ran(&log, "setup").is_empty());
    assert_eq!(ran(&log, "first"), vec![system(1)]);
    assert!(ran(&log, "second").is_empty());
    assert_eq!(diagnostics.summary.done, 3);
    assert_eq!(diagnostics.summary.failed, 1);
    assert_eq!(diagnostics.summary.blocked, 1);
}

#[test]
fn run_to_stops_at_the_target() {
    let log = Log::default();
    let pipeline = Pipeline::builder()
        .step(Recorder::sheet("setup", &[], &log))
        .step(Recorder::system("first", &["setup"], &log))
        .step(Recorder::system("second", &["first"], &log))
        .step(Recorder::sheet("unrelated", &[], &log))
        .build()
        .unwrap();

    let mut sheet = sheet_with_systems(1);
    let mut progress = StepProgress::new();
    let diagnostics = pipeline
        .run_to("first", &mut sheet, &mut progress, None, &NoClock)
        .unwrap();

    let names: Vec<&str> = diagnostics.steps.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["setup", "first"]);
    assert!(ran(&log, "second").is_empty());
    assert!(ran(&log, "unrelated").is_empty());
    assert_eq!(progress.state("second", system(0)), &StepState::Pending);

    let err = pipeline
        .run_to("missing", &mut sheet, &mut progress, None, &NoClock)
        .unwrap_err();
    assert!(matches!(err, StepError::UnknownStep(ref name) if name == "missing"));
}

#[derive(Default)]
struct RecordingView {
    refreshed: Vec<String>,
    boards: Vec<(String, SystemId)>,
}

impl SheetView for RecordingView {
    fn refresh(&mut self, step: &str, _sheet: &Sheet) {
        self.refreshed.push(step.to_string());
    }

    fn add_check_board(&mut self, board: &str, system: SystemId) {
        self.boards.push((board.to_string(), system));
    }
}

#[test]
fn attached_view_is_refreshed_after_steps_that_ran() {
    let mut sheet = sheet_with_systems(2);
    let pipeline = Pipeline::standard(PipelineConfig::default()).unwrap();
    let mut progress = StepProgress::new();
    let mut view = RecordingView::default();

    pipeline.run(
        &mut sheet,
        &mut progress,
        Some(&mut view as &mut dyn SheetView),
        &NoClock,
    );
    assert_eq!(view.refreshed, vec!["horizontals", "stem_seeds", "glyphs"]);
    assert_eq!(view.boards, vec![("stems".to_string(), SystemId(0))]);

    pipeline.run(
        &mut sheet,
        &mut progress,
        Some(&mut view as &mut dyn SheetView),
        &NoClock,
    );
    assert_eq!(view.refreshed.len(), 3);
}

#[test]
fn standard_pipeline_rerun_is_a_no_op() {
    let mut sheet = sheet_with_systems(2);
    for (system, top) in [(SystemId(0), 0), (SystemId(1), 200)] {
        let [_, _, right] = add_note_head(&mut sheet, system, 100, top + 100);
        let stem = add_stem(&mut sheet, system, 124, top + 40);
        link(&mut sheet, right, stem);
    }

    let pipeline = Pipeline::standard(PipelineConfig::default()).unwrap();
    let mut progress = StepProgress::new();
    let first = pipeline.run(&mut sheet, &mut progress, None, &NoClock);
    assert_eq!(first.summary.glyph_count, 4);
    assert_eq!(first.summary.stem_count, 2);
    assert_eq!(first.summary.done, 5);

    let registered = sheet.store().len();
    let second = pipeline.run(&mut sheet, &mut progress, None, &NoClock);
    assert_eq!(second.summary.glyph_count, 4);
    assert_eq!(sheet.store().len(), registered);
    assert!(
        second
            .steps
            .iter()
            .flat_map(|s| s.outcomes.iter())
            .all(|(_, state)| state.is_done())
    );
}

#[test]
fn process_rejects_invalid_config() {
    let mut sheet = sheet_with_systems(1);
    let mut config = PipelineConfig::default();
    config.stems.min_length = notescan_pipeline::Fraction::new(-1.0);
    let err = notescan_pipeline::process(&mut sheet, &config, &NoClock).unwrap_err();
    assert!(matches!(
        err,
        StepError::Glyph(notescan_pipeline::GlyphError::InvalidConfig(_))
    ));
}

#[test]
fn process_rejects_oversized_tolerance() {
    let mut sheet = sheet_with_systems(2);
    let mut config = PipelineConfig::default();
    config.glyphs.stem_widen = notescan_pipeline::Fraction::new(1.0e9);
    let err = notescan_pipeline::process(&mut sheet, &config, &NoClock).unwrap_err();
    assert!(matches!(
        err,
        StepError::Glyph(notescan_pipeline::GlyphError::InvalidConfig(ref msg))
            if msg.contains("stem_widen")
    ));
}

#[test]
fn largest_tolerances_still_process_every_system() {
    let mut sheet = sheet_with_systems(2);
    for (system, top) in [(SystemId(0), 0), (SystemId(1), 200)] {
        let [_, _, right] = add_note_head(&mut sheet, system, 100, top + 100);
        let stem = add_stem(&mut sheet, system, 124, top + 40);
        link(&mut sheet, right, stem);
    }
    let mut config = PipelineConfig::default();
    config.glyphs.ledger_heighten = notescan_pipeline::GlyphConfig::MAX_TOLERANCE;
    config.glyphs.stem_widen = notescan_pipeline::GlyphConfig::MAX_TOLERANCE;
    config.glyphs.stem_heighten = notescan_pipeline::GlyphConfig::MAX_TOLERANCE;

    let diagnostics = notescan_pipeline::process(&mut sheet, &config, &NoClock).unwrap();
    assert_eq!(diagnostics.summary.failed, 0, "{}", diagnostics.report());
    assert_eq!(diagnostics.summary.done, 5);
    assert_eq!(sheet.system(SystemId(0)).unwrap().glyphs().len(), 2);
    assert_eq!(sheet.system(SystemId(1)).unwrap().glyphs().len(), 2);
}
