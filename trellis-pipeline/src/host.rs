//! The host trait that configures a pipeline instance.

use crate::{
    diagnostic::{PipelineDiagnostic, Severity},
    extension::RollbackFailure,
    reporter::Reporter,
    run::{HelperExecutionSnapshot, RunState},
};

/// The per-run context every helper shares by reference.
///
/// State that helpers stash on the context must use interior mutability; the
/// context itself is never replaced during a run.
pub trait PipelineContext: Send + Sync {
    fn reporter(&self) -> &Reporter;
}

/// The accumulator fragments write into.
pub trait Draft: Send {
    /// A struct of optional fields mirroring the draft.
    type Partial;

    /// Overwrite every field present in `partial`, leaving the rest untouched.
    fn assign(&mut self, partial: Self::Partial);
}

/// Run options and the build options derived from them.
pub struct RunInput<'a, H: Host> {
    pub options: &'a H::RunOptions,
    pub build_options: &'a H::BuildOptions,
}

impl<H: Host> Clone for RunInput<'_, H> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<H: Host> Copy for RunInput<'_, H> {}

/// Everything the finalizer may look at besides the draft.
pub struct FinalizeArgs<'a, H: Host> {
    pub input: RunInput<'a, H>,
    pub context: &'a H::Context,
    pub fragments: &'a HelperExecutionSnapshot,
    pub diagnostics: &'a [PipelineDiagnostic],
}

/// Supplies the types and construction-time functions of a pipeline.
///
/// A host is fixed for the lifetime of a [`Pipeline`](crate::Pipeline); each
/// run builds fresh build options, context and draft from it.
pub trait Host: Send + Sync + Sized + 'static {
    type RunOptions: Send + Sync;
    type BuildOptions: Send + Sync;
    type Context: PipelineContext;
    type Draft: Draft;
    type Artifact: Send + Sync;
    type RunResult;

    /// Derive build options from the run options.
    fn build_options(&self, options: &Self::RunOptions) -> eyre::Result<Self::BuildOptions>;

    /// Build the context shared by every helper of one run.
    fn create_context(
        &self,
        options: &Self::RunOptions,
        build_options: &Self::BuildOptions,
    ) -> eyre::Result<Self::Context>;

    fn create_draft(&self, input: RunInput<'_, Self>, context: &Self::Context) -> Self::Draft;

    /// Convert the completed draft into the artifact.
    fn finalize(
        &self,
        draft: Self::Draft,
        args: FinalizeArgs<'_, Self>,
    ) -> eyre::Result<Self::Artifact>;

    /// Shape the value returned from [`Pipeline::run`](crate::Pipeline::run).
    fn run_result(&self, state: RunState<Self>) -> Self::RunResult;

    /// Called for every diagnostic as it is emitted.
    fn on_diagnostic(&self, context: &Self::Context, diagnostic: &PipelineDiagnostic) {
        let reporter = context.reporter();
        match diagnostic.severity() {
            Severity::Error => reporter.error(diagnostic),
            Severity::Warning => reporter.warn(diagnostic),
            Severity::Info => reporter.debug(diagnostic),
        }
    }

    /// Called when an extension rollback fails. Never interrupts the rollback.
    fn on_rollback_error(&self, context: &Self::Context, failure: &RollbackFailure) {
        context
            .reporter()
            .warn_with("Pipeline extension rollback failed.", failure);
    }
}
