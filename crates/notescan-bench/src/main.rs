//! notescan-bench: CLI tool for glyph pipeline tuning and diagnostics.
//!
//! Synthesizes a sheet of engraved-looking notes (three-section note
//! heads with a stem on their right, dots, ledgers above the staff),
//! runs the glyph pipeline over it with configurable tolerances, and
//! prints per-step diagnostics. Useful for:
//!
//! - Checking how stem and ledger tolerances affect feature detection
//! - Measuring per-step durations on large sheets
//! - Looking at the glyph and stem counts a configuration produces
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin notescan-bench -- [OPTIONS]
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use notescan_pipeline::diagnostics::{Clock, RunDiagnostics};
use notescan_pipeline::{
    Fraction, GlyphConfig, GlyphError, Ledger, PipelineConfig, Rectangle, Scale, Section,
    SectionGraph, SectionId, Sheet, Staff, StemConfig, SystemId,
};
use tracing_subscriber::EnvFilter;

/// Glyph pipeline experimentation and diagnostics for notescan.
///
/// Builds a synthetic sheet, runs the glyph pipeline on it and prints
/// detailed per-step timing and count diagnostics.
#[derive(Parser)]
#[command(name = "notescan-bench", version)]
struct Cli {
    /// Number of systems on the synthetic sheet.
    #[arg(long, default_value_t = 4, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    systems: usize,

    /// Number of notes per system.
    #[arg(long, default_value_t = 24)]
    notes: usize,

    /// Interline (staff line spacing) in pixels.
    #[arg(long, default_value_t = 20, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(8..))]
    interline: u32,

    /// Box heightening for ledger checks, in interline fractions.
    #[arg(long, default_value_t = GlyphConfig::DEFAULT_LEDGER_HEIGHTEN.value())]
    ledger_heighten: f64,

    /// Box widening for stem checks, in interline fractions.
    #[arg(long, default_value_t = GlyphConfig::DEFAULT_STEM_WIDEN.value())]
    stem_widen: f64,

    /// Box heightening for stem checks, in interline fractions.
    #[arg(long, default_value_t = GlyphConfig::DEFAULT_STEM_HEIGHTEN.value())]
    stem_heighten: f64,

    /// Maximum stem seed width, in interline fractions.
    #[arg(long, default_value_t = StemConfig::DEFAULT_MAX_THICKNESS.value())]
    max_stem_thickness: f64,

    /// Minimum stem seed height, in interline fractions.
    #[arg(long, default_value_t = StemConfig::DEFAULT_MIN_LENGTH.value())]
    min_stem_length: f64,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Output diagnostics as JSON instead of human-readable report.
    #[arg(long)]
    json: bool,

    /// Log pipeline internals at debug level (overridden by `RUST_LOG`).
    #[arg(long, short)]
    verbose: bool,

    /// Full pipeline config as a JSON string.
    ///
    /// When provided, all other tolerance flags are ignored.
    /// The JSON must be a valid `PipelineConfig` serialization.
    #[arg(long)]
    config_json: Option<String>,
}

/// Build a [`PipelineConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual tolerance flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<PipelineConfig, String> {
    let config = if let Some(ref json) = cli.config_json {
        serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"))?
    } else {
        PipelineConfig {
            glyphs: GlyphConfig {
                ledger_heighten: Fraction::new(cli.ledger_heighten),
                stem_widen: Fraction::new(cli.stem_widen),
                stem_heighten: Fraction::new(cli.stem_heighten),
            },
            stems: StemConfig {
                max_thickness: Fraction::new(cli.max_stem_thickness),
                min_length: Fraction::new(cli.min_stem_length),
            },
        }
    };
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let layout = Layout {
        interline: cli.interline,
        systems: cli.systems,
        notes: cli.notes,
    };

    eprintln!(
        "Sheet: {} systems x {} notes, interline {}px",
        layout.systems, layout.notes, layout.interline,
    );
    eprintln!("Config: {config:#?}");
    eprintln!("Runs: {}", cli.runs);
    eprintln!();

    let mut all_diagnostics = Vec::with_capacity(cli.runs);

    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        let mut sheet = match layout.synthesize() {
            Ok(sheet) => sheet,
            Err(e) => {
                eprintln!("Error synthesizing sheet: {e}");
                return ExitCode::FAILURE;
            }
        };

        match notescan_pipeline::process(&mut sheet, &config, &StdClock) {
            Ok(diagnostics) => {
                tracing::info!(
                    run = run + 1,
                    glyphs = diagnostics.summary.glyph_count,
                    failed = diagnostics.summary.failed,
                    "run complete"
                );
                if cli.json {
                    match serde_json::to_string_pretty(&diagnostics) {
                        Ok(json) => println!("{json}"),
                        Err(e) => {
                            eprintln!("Error serializing diagnostics: {e}");
                            return ExitCode::FAILURE;
                        }
                    }
                } else {
                    println!("{}", diagnostics.report());
                }
                all_diagnostics.push(diagnostics);
            }
            Err(e) => {
                eprintln!("Pipeline error: {e}");
                return ExitCode::FAILURE;
            }
        }

        if cli.runs > 1 {
            eprintln!();
        }
    }

    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    ExitCode::SUCCESS
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

/// Shape of the synthetic sheet.
struct Layout {
    interline: u32,
    systems: usize,
    notes: usize,
}

impl Layout {
    /// Vertical extent of one system, in interlines.
    const SYSTEM_HEIGHT: i32 = 14;
    /// Top staff line, in interlines from the system top.
    const STAFF_TOP: i32 = 6;
    /// Horizontal distance between notes, in interlines.
    const NOTE_SPACING: i32 = 3;

    fn synthesize(&self) -> Result<Sheet, GlyphError> {
        let il = i32::try_from(self.interline)
            .map_err(|_| GlyphError::InvalidConfig("interline too large".to_string()))?;
        let notes = i32::try_from(self.notes)
            .map_err(|_| GlyphError::InvalidConfig("too many notes".to_string()))?;
        let width = (notes * Self::NOTE_SPACING + 4) * il;

        let mut sheet = Sheet::new(Scale::new(self.interline)?, SectionGraph::new());
        for index in 0..self.systems {
            let row = i32::try_from(index)
                .map_err(|_| GlyphError::InvalidConfig("too many systems".to_string()))?;
            let top = row * Self::SYSTEM_HEIGHT * il;
            let system = sheet.add_system(Rectangle::new(0, top, width, Self::SYSTEM_HEIGHT * il))?;
            sheet
                .system_mut(system)?
                .add_staff(Staff::five_lines(f64::from(Self::STAFF_TOP * il), f64::from(il))?);

            for note in 0..notes {
                let x = (2 + note * Self::NOTE_SPACING) * il;
                Self::add_note(&mut sheet, system, x, note)?;
            }
        }
        Ok(sheet)
    }

    /// Add one note: a head made of three linked sections, a stem on its
    /// right, and, depending on its rank, a dot or a ledger.
    fn add_note(sheet: &mut Sheet, system: SystemId, x: i32, rank: i32) -> Result<(), GlyphError> {
        let il = sheet.scale().interline().cast_signed();
        let top = sheet.system(system)?.top();
        let reference = top + (Self::STAFF_TOP + 2) * il;

        // Half-space steps from the middle line, -6 being the first
        // ledger line above the staff.
        let pitch = if rank % 4 == 3 { -6 } else { rank % 9 - 4 };
        let cy = reference + pitch * il / 2;

        let part = il * 2 / 5;
        let head = il;
        let side = head * 7 / 10;
        let left = add_section(sheet, system, Rectangle::new(x, cy - side / 2, part, side))?;
        let middle = add_section(sheet, system, Rectangle::new(x + part, cy - head / 2, part, head))?;
        let right = add_section(sheet, system, Rectangle::new(x + 2 * part, cy - side / 2, part, side))?;

        let stem_top = cy - il * 7 / 2;
        let stem = add_section(
            sheet,
            system,
            Rectangle::new(x + 3 * part, stem_top, 2, cy + il / 4 - stem_top),
        )?;

        let graph = sheet.sections_mut();
        graph.link(left, middle)?;
        graph.link(middle, right)?;
        graph.link(right, stem)?;

        if rank % 3 == 1 {
            let dot = il / 5;
            add_section(sheet, system, Rectangle::new(x + 3 * part + il / 2, cy - dot / 2, dot, dot))?;
        }
        if pitch == -6 {
            let line = reference - 3 * il;
            sheet
                .system_mut(system)?
                .add_ledger(Ledger::new(Rectangle::new(x - il / 4, line - 1, 3 * part + il / 2, 3)));
        }
        Ok(())
    }
}

fn add_section(
    sheet: &mut Sheet,
    system: SystemId,
    rect: Rectangle,
) -> Result<SectionId, GlyphError> {
    let id = sheet.sections_mut().add_section(Section::rectangle(rect)?);
    sheet.system_mut(system)?.add_section(id);
    Ok(id)
}

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[RunDiagnostics]) {
    debug_assert!(!all_diagnostics.is_empty(), "no diagnostics to summarize");

    println!();
    println!(
        "Summary ({} runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    if all_diagnostics.is_empty() {
        println!("Warning: no diagnostics to summarize");
        return;
    }

    let durations: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| d.total_duration.as_secs_f64() * 1000.0)
        .collect();

    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;

    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    println!();
    println!("{:<24} {:>12}", "Step", "Mean (ms)");
    println!("{}", "-".repeat(40));

    let names: Vec<&str> = all_diagnostics
        .first()
        .map(|d| d.steps.iter().map(|s| s.name.as_str()).collect())
        .unwrap_or_default();

    for name in names {
        let step_durations: Vec<f64> = all_diagnostics
            .iter()
            .filter_map(|d| d.steps.iter().find(|s| s.name == name))
            .map(|s| s.duration)
            .map(|dur| dur.as_secs_f64() * 1000.0)
            .collect();

        if step_durations.is_empty() {
            continue;
        }

        let step_mean = step_durations.iter().sum::<f64>() / step_durations.len() as f64;
        println!("{name:<24} {step_mean:>10.3}ms");
    }
}
