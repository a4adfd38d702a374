//! Staged execution of steps over a sheet.
//!
//! A [`Pipeline`] is built once from a set of [`Step`]s. Building checks
//! the dependency graph and computes the execution order:
//!
//! ```rust
//! # use notescan_pipeline::{Pipeline, PipelineConfig, StepError};
//! # use notescan_pipeline::step::{GlyphsStep, HorizontalsStep, StemSeedsStep};
//! # fn build() -> Result<Pipeline, StepError> {
//! let config = PipelineConfig::default();
//! let pipeline = Pipeline::builder()
//!     .step(GlyphsStep::new(config))
//!     .step(StemSeedsStep::new(config))
//!     .step(HorizontalsStep)
//!     .build()?;
//! assert_eq!(pipeline.order(), vec!["horizontals", "stem_seeds", "glyphs"]);
//! # Ok(pipeline)
//! # }
//! ```
//!
//! Running records the state of every step, per system for system-level
//! steps, in a [`StepProgress`]. A step already done is never run again,
//! so running the same pipeline twice with the same progress is a no-op.
//!
//! When a mandatory step fails, its dependents are withheld. For a
//! system-level step only the failing system is affected: the other
//! systems carry on. A failing optional step is reported and its
//! dependents run as if it had succeeded.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use petgraph::algo::toposort;
use petgraph::graph::DiGraph;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::diagnostics::{Clock, RunDiagnostics, RunSummary, StepDiagnostics};
use crate::sheet::Sheet;
use crate::step::{
    GlyphsStep, HorizontalsStep, Mandatory, SheetView, StemSeedsStep, Step, StepError, StepLevel,
};
use crate::system::SystemId;
use crate::types::PipelineConfig;

/// Where a step runs: on the sheet, or on one of its systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// The whole sheet.
    Sheet,
    /// One system.
    System(SystemId),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sheet => f.write_str("sheet"),
            Self::System(id) => write!(f, "system#{id}"),
        }
    }
}

/// Execution state of a step within one scope.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    /// Not run yet.
    #[default]
    Pending,
    /// Currently running.
    Running,
    /// Completed successfully; never run again.
    Done,
    /// Failed with the given reason.
    Failed(String),
    /// Withheld because a mandatory dependency did not complete.
    Blocked,
}

impl StepState {
    /// Returns `true` once the step completed.
    #[must_use]
    pub const fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

/// Per-step, per-scope states accumulated over one or more runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepProgress {
    states: BTreeMap<String, BTreeMap<Scope, StepState>>,
}

static PENDING: StepState = StepState::Pending;

impl StepProgress {
    /// Start with every step pending.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// State of `step` in `scope`.
    #[must_use]
    pub fn state(&self, step: &str, scope: Scope) -> &StepState {
        self.states
            .get(step)
            .and_then(|scopes| scopes.get(&scope))
            .unwrap_or(&PENDING)
    }

    /// Every recorded scope of `step`, with its state.
    pub fn scopes(&self, step: &str) -> impl Iterator<Item = (Scope, &StepState)> {
        self.states
            .get(step)
            .into_iter()
            .flat_map(|scopes| scopes.iter().map(|(scope, state)| (*scope, state)))
    }

    fn set(&mut self, step: &str, scope: Scope, state: StepState) {
        self.states
            .entry(step.to_string())
            .or_default()
            .insert(scope, state);
    }
}

/// Collects the steps of a pipeline.
#[derive(Default)]
pub struct PipelineBuilder {
    steps: Vec<Box<dyn Step>>,
}

impl PipelineBuilder {
    /// Add a step. Steps may be added in any order.
    #[must_use]
    pub fn step(mut self, step: impl Step + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Check the dependencies and fix the execution order.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::DuplicateStep`] if two steps share a name,
    /// [`StepError::UnknownDependency`] if a dependency is missing, and
    /// [`StepError::Cycle`] if the dependencies are circular.
    pub fn build(self) -> Result<Pipeline, StepError> {
        let mut by_name: HashMap<&'static str, usize> = HashMap::new();
        for (index, step) in self.steps.iter().enumerate() {
            if by_name.insert(step.name(), index).is_some() {
                return Err(StepError::DuplicateStep(step.name().to_string()));
            }
        }

        let mut graph: DiGraph<usize, ()> = DiGraph::new();
        let nodes: Vec<_> = (0..self.steps.len()).map(|i| graph.add_node(i)).collect();
        let mut dependencies = Vec::with_capacity(self.steps.len());

        for (index, step) in self.steps.iter().enumerate() {
            let mut deps = Vec::new();
            for &dependency in step.dependencies() {
                let &dep = by_name
                    .get(dependency)
                    .ok_or_else(|| StepError::UnknownDependency {
                        step: step.name().to_string(),
                        dependency: dependency.to_string(),
                    })?;
                graph.add_edge(nodes[dep], nodes[index], ());
                deps.push(dep);
            }
            dependencies.push(deps);
        }

        let order = toposort(&graph, None)
            .map_err(|cycle| {
                let name = graph
                    .node_weight(cycle.node_id())
                    .and_then(|&i| self.steps.get(i))
                    .map_or_else(String::new, |s| s.name().to_string());
                StepError::Cycle(name)
            })?
            .into_iter()
            .filter_map(|node| graph.node_weight(node).copied())
            .collect();

        Ok(Pipeline {
            steps: self.steps,
            dependencies,
            order,
        })
    }
}

/// An ordered, dependency-checked set of steps.
pub struct Pipeline {
    steps: Vec<Box<dyn Step>>,
    dependencies: Vec<Vec<usize>>,
    order: Vec<usize>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("order", &self.order())
            .finish()
    }
}

/// What happened to one step within one scope during a run.
struct ScopeRun {
    scope: Scope,
    state: StepState,
    ran: bool,
}

impl Pipeline {
    /// Start collecting steps.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// The built-in glyph pipeline: horizontals, stem seeds, glyphs.
    ///
    /// # Errors
    ///
    /// Never fails in practice; the error type is the one of
    /// [`PipelineBuilder::build`].
    pub fn standard(config: PipelineConfig) -> Result<Self, StepError> {
        Self::builder()
            .step(HorizontalsStep)
            .step(StemSeedsStep::new(config))
            .step(GlyphsStep::new(config))
            .build()
    }

    /// Step names in execution order.
    #[must_use]
    pub fn order(&self) -> Vec<&'static str> {
        self.order
            .iter()
            .filter_map(|&i| self.steps.get(i))
            .map(|s| s.name())
            .collect()
    }

    /// Run every step not done yet.
    pub fn run<C: Clock>(
        &self,
        sheet: &mut Sheet,
        progress: &mut StepProgress,
        view: Option<&mut dyn SheetView>,
        clock: &C,
    ) -> RunDiagnostics {
        let selected = vec![true; self.steps.len()];
        self.execute(&selected, sheet, progress, view, clock)
    }

    /// Run `target` and the steps it transitively depends on.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::UnknownStep`] if `target` is not part of the
    /// pipeline.
    pub fn run_to<C: Clock>(
        &self,
        target: &str,
        sheet: &mut Sheet,
        progress: &mut StepProgress,
        view: Option<&mut dyn SheetView>,
        clock: &C,
    ) -> Result<RunDiagnostics, StepError> {
        let target = self
            .steps
            .iter()
            .position(|s| s.name() == target)
            .ok_or_else(|| StepError::UnknownStep(target.to_string()))?;

        let mut selected = vec![false; self.steps.len()];
        let mut stack = vec![target];
        while let Some(index) = stack.pop() {
            if selected[index] {
                continue;
            }
            selected[index] = true;
            stack.extend(self.dependencies[index].iter().copied());
        }

        Ok(self.execute(&selected, sheet, progress, view, clock))
    }

    fn execute<C: Clock>(
        &self,
        selected: &[bool],
        sheet: &mut Sheet,
        progress: &mut StepProgress,
        mut view: Option<&mut dyn SheetView>,
        clock: &C,
    ) -> RunDiagnostics {
        let run_start = clock.now();
        let mut steps = Vec::new();

        for &index in self.order.iter().filter(|&&i| selected[i]) {
            let step = self.steps[index].as_ref();
            let step_start = clock.now();

            let scopes: Vec<Scope> = match step.level() {
                StepLevel::Sheet => vec![Scope::Sheet],
                StepLevel::System => sheet.system_ids().map(Scope::System).collect(),
            };
            let runs: Vec<ScopeRun> = scopes
                .into_iter()
                .map(|scope| self.run_scope(index, scope, sheet, progress))
                .collect();

            if runs.iter().any(|r| r.ran)
                && let Some(view) = view.as_deref_mut()
            {
                step.display_ui(sheet, view);
            }

            steps.push(StepDiagnostics {
                name: step.name().to_string(),
                description: step.description().to_string(),
                level: step.level(),
                duration: clock.elapsed(&step_start),
                outcomes: runs.into_iter().map(|r| (r.scope, r.state)).collect(),
            });
        }

        let summary = RunSummary::collect(sheet, &steps);
        RunDiagnostics {
            steps,
            total_duration: clock.elapsed(&run_start),
            summary,
        }
    }

    fn run_scope(
        &self,
        index: usize,
        scope: Scope,
        sheet: &mut Sheet,
        progress: &mut StepProgress,
    ) -> ScopeRun {
        let step = self.steps[index].as_ref();
        let name = step.name();

        if progress.state(name, scope).is_done() {
            return ScopeRun {
                scope,
                state: StepState::Done,
                ran: false,
            };
        }

        let systems: Vec<SystemId> = sheet.system_ids().collect();
        if let Some(&blocker) = self.dependencies[index]
            .iter()
            .find(|&&dep| self.blocks(dep, scope, &systems, progress))
        {
            info!(step = name, %scope, blocked_by = self.steps[blocker].name(), "step withheld");
            progress.set(name, scope, StepState::Blocked);
            return ScopeRun {
                scope,
                state: StepState::Blocked,
                ran: false,
            };
        }

        progress.set(name, scope, StepState::Running);
        let result = match scope {
            Scope::Sheet => step.do_sheet(sheet),
            Scope::System(system) => step.do_system(sheet, system),
        };

        let state = match result {
            Ok(()) => StepState::Done,
            Err(e) => {
                match step.mandatory() {
                    Mandatory::Mandatory => error!(step = name, %scope, "step failed: {e}"),
                    Mandatory::Optional => warn!(step = name, %scope, "optional step failed: {e}"),
                }
                StepState::Failed(e.to_string())
            }
        };
        progress.set(name, scope, state.clone());
        ScopeRun {
            scope,
            state,
            ran: true,
        }
    }

    /// Returns `true` if dependency `dep` keeps a step from running in
    /// `scope`.
    fn blocks(&self, dep: usize, scope: Scope, systems: &[SystemId], progress: &StepProgress) -> bool {
        let step = self.steps[dep].as_ref();
        let blocking = |state: &StepState| match state {
            StepState::Done => false,
            StepState::Failed(_) => step.mandatory() == Mandatory::Mandatory,
            StepState::Pending | StepState::Running | StepState::Blocked => true,
        };

        match (step.level(), scope) {
            (StepLevel::Sheet, _) => blocking(progress.state(step.name(), Scope::Sheet)),
            (StepLevel::System, Scope::System(system)) => {
                blocking(progress.state(step.name(), Scope::System(system)))
            }
            (StepLevel::System, Scope::Sheet) => systems
                .iter()
                .any(|&system| blocking(progress.state(step.name(), Scope::System(system)))),
        }
    }
}
