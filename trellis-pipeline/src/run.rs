//! Per-run bookkeeping: identifiers, side table, step trace and results.

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};

use serde::Serialize;

use crate::{
    diagnostic::PipelineDiagnostic,
    helper::{HelperDescriptor, HelperKind, HelperMode},
    host::Host,
};

static NEXT_RUN_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique, monotonically increasing identifier of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RunId(u64);

impl RunId {
    pub(crate) fn next() -> Self {
        Self(NEXT_RUN_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "run-{}", self.0)
    }
}

/// Type-indexed scratch storage owned by the driver for the length of a run.
///
/// Helpers that need to cache intermediate structures between each other
/// store them here instead of on the context. Each type gets one slot.
#[derive(Default)]
pub struct SideTable {
    slots: Mutex<HashMap<TypeId, Box<dyn Any + Send>>>,
}

impl SideTable {
    /// Run `f` against the slot for `T`, creating it with `T::default()` first.
    ///
    /// The lock is held for the duration of `f`; do not call back into the
    /// side table from inside it.
    pub fn with<T, R>(&self, f: impl FnOnce(&mut T) -> R) -> R
    where
        T: Default + Send + 'static,
    {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = slots
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(T::default()) as Box<dyn Any + Send>);
        match slot.downcast_mut::<T>() {
            Some(value) => f(value),
            // Slots are keyed by TypeId so the downcast cannot miss.
            None => f(&mut T::default()),
        }
    }

    /// Store `value`, returning the previous value of the same type.
    pub fn insert<T: Send + 'static>(&self, value: T) -> Option<T> {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(TypeId::of::<T>(), Box::new(value))
            .and_then(|old| old.downcast::<T>().ok())
            .map(|old| *old)
    }

    /// A clone of the stored value of type `T`.
    pub fn get<T: Clone + Send + 'static>(&self) -> Option<T> {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
            .cloned()
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&TypeId::of::<T>())
    }
}

impl std::fmt::Debug for SideTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let len = self
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        f.debug_struct("SideTable").field("slots", &len).finish()
    }
}

/// The run identifier and side table, handed to every helper.
#[derive(Debug, Clone, Copy)]
pub struct RunScope<'a> {
    pub id: RunId,
    pub side_table: &'a SideTable,
}

/// Lifecycle of a pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum PipelineState {
    /// No run in progress. Registration is only possible at rest, since it
    /// needs `&mut Pipeline`; registering after `Done` or `Failed` moves the
    /// pipeline back here.
    #[default]
    Idle,
    BuildingContext,
    RunningFragments,
    Finalized,
    RunningExtensions,
    RunningBuilders,
    Committing,
    Done,
    Failed,
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipelineState::Idle => "idle",
            PipelineState::BuildingContext => "building-context",
            PipelineState::RunningFragments => "running-fragments",
            PipelineState::Finalized => "finalized",
            PipelineState::RunningExtensions => "running-extensions",
            PipelineState::RunningBuilders => "running-builders",
            PipelineState::Committing => "committing",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// One entry of the execution trace, recorded when a helper starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineStep {
    /// `"{kind}:{key}#{registration index}"`.
    pub id: String,
    pub index: usize,
    pub key: String,
    pub kind: HelperKind,
    pub mode: HelperMode,
    pub priority: i32,
    pub depends_on: Vec<String>,
    pub origin: Option<String>,
}

impl PipelineStep {
    pub(crate) fn new(descriptor: &HelperDescriptor, index: usize) -> Self {
        Self {
            id: step_id(descriptor.kind, &descriptor.key, index),
            index,
            key: descriptor.key.clone(),
            kind: descriptor.kind,
            mode: descriptor.mode,
            priority: descriptor.priority,
            depends_on: descriptor.depends_on.clone(),
            origin: descriptor.origin.clone(),
        }
    }
}

pub(crate) fn step_id(kind: HelperKind, key: &str, index: usize) -> String {
    format!("{kind}:{key}#{index}")
}

/// Append-only record of executed steps.
#[derive(Debug, Default)]
pub(crate) struct StepTrace {
    steps: Mutex<Vec<PipelineStep>>,
}

impl StepTrace {
    pub(crate) fn record(&self, descriptor: &HelperDescriptor, index: usize) {
        self.steps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(PipelineStep::new(descriptor, index));
    }

    pub(crate) fn into_steps(self) -> Vec<PipelineStep> {
        self.steps
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Which helpers of one kind were registered and which actually ran.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HelperExecutionSnapshot {
    pub kind: Option<HelperKind>,
    /// Keys in registration order.
    pub registered: Vec<String>,
    /// Keys in execution order.
    pub executed: Vec<String>,
    /// Registered keys that never ran, in registration order.
    pub missing: Vec<String>,
}

impl HelperExecutionSnapshot {
    /// Build a snapshot from `(registration index, key)` pairs.
    pub(crate) fn new<'a>(
        kind: HelperKind,
        registered: impl IntoIterator<Item = (usize, &'a str)>,
        executed: &[(usize, &'a str)],
    ) -> Self {
        let registered: Vec<(usize, &str)> = registered.into_iter().collect();
        let missing = registered
            .iter()
            .filter(|(index, _)| !executed.iter().any(|(ran, _)| ran == index))
            .map(|(_, key)| key.to_string())
            .collect();
        Self {
            kind: Some(kind),
            registered: registered.iter().map(|(_, key)| key.to_string()).collect(),
            executed: executed.iter().map(|(_, key)| key.to_string()).collect(),
            missing,
        }
    }
}

/// Fragment and builder snapshots of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionMetadata {
    pub fragments: HelperExecutionSnapshot,
    pub builders: HelperExecutionSnapshot,
}

/// Everything a run produced, handed to [`Host::run_result`].
pub struct RunState<H: Host> {
    pub run_id: RunId,
    pub options: H::RunOptions,
    pub build_options: H::BuildOptions,
    pub context: H::Context,
    pub artifact: H::Artifact,
    pub diagnostics: Vec<PipelineDiagnostic>,
    pub steps: Vec<PipelineStep>,
    pub helpers: ExecutionMetadata,
}

/// A ready-made run result for hosts without a custom shape.
#[derive(Debug)]
pub struct PipelineRun<A> {
    pub run_id: RunId,
    pub artifact: A,
    pub diagnostics: Vec<PipelineDiagnostic>,
    pub steps: Vec<PipelineStep>,
    pub helpers: ExecutionMetadata,
}

impl<A> PipelineRun<A> {
    pub fn from_state<H: Host<Artifact = A>>(state: RunState<H>) -> Self {
        Self {
            run_id: state.run_id,
            artifact: state.artifact,
            diagnostics: state.diagnostics,
            steps: state.steps,
            helpers: state.helpers,
        }
    }

    /// Keys of the executed steps, in order.
    pub fn step_keys(&self) -> Vec<&str> {
        self.steps.iter().map(|step| step.key.as_str()).collect()
    }
}
