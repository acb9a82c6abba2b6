//! Helper orchestration pipeline for Trellis.
//!
//! A [`Pipeline`] collects three kinds of helpers and runs them in two phases:
//!
//! 1. **Fragments** build a typed draft in dependency order, after which the
//!    host finalizes the draft into an artifact.
//! 2. **Builders** act on the artifact through a chain of responsibility with a
//!    single-shot [`Next`] continuation.
//!
//! **Extensions** wrap the artifact phase with commit/rollback hooks so that
//! side effects are all-or-nothing across a run.
//!
//! Everything host-specific (options, context, draft, artifact, result shape)
//! is supplied through the [`Host`] trait.
//!
//! # Example
//!
//! ```ignore
//! let mut pipeline = Pipeline::new(MyHost);
//! pipeline.ir().register(FragmentHelper::from_fn("ir.meta", |mut args| {
//!     args.output.assign(MyPartial::name("demo"));
//!     Ok(())
//! }))?;
//! let result = pipeline.run(options).await?;
//! ```

// miette's derive macro generates code that triggers false positive warnings
#![allow(unused_assignments)]

mod chain;
mod diagnostic;
mod driver;
mod error;
mod extension;
mod fragment;
mod graph;
mod helper;
mod host;
mod registry;
mod reporter;
mod run;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use chain::{BuilderApply, BuilderArgs, Next};
pub use diagnostic::{PipelineDiagnostic, Severity};
pub use driver::{ExtensionSurface, HelperSurface, Pipeline};
pub use error::PipelineError;
pub use extension::{
    Extension, ExtensionHook, ExtensionRegistrar, HookArgs, HookOutcome, Registration,
    RollbackFailure, Transition,
};
pub use fragment::{FragmentApply, FragmentArgs, FragmentOutput};
pub use helper::{
    BuilderHelper, ExtensionHelper, FragmentHelper, Helper, HelperDescriptor, HelperKind,
    HelperMode,
};
pub use host::{Draft, FinalizeArgs, Host, PipelineContext, RunInput};
pub use reporter::{ReportRecord, ReportSink, Reporter};
pub use run::{
    ExecutionMetadata, HelperExecutionSnapshot, PipelineRun, PipelineState, PipelineStep, RunId,
    RunScope, RunState, SideTable,
};
