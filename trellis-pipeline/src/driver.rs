//! The pipeline driver.

use eyre::Result;
use tracing::Instrument;

use crate::{
    chain::{self, Chain},
    diagnostic::PipelineDiagnostic,
    error::PipelineError,
    extension::{
        Extension, ExtensionRegistrar, HookEntry, HookLedger, PendingHook, Registration, run_hooks,
    },
    fragment::{RunEnv, run_fragments},
    graph,
    helper::{
        BuilderHelper, Described, ExtensionHelper, FragmentHelper, Helper, HelperDescriptor,
        HelperKind,
    },
    host::{FinalizeArgs, Host, PipelineContext, RunInput},
    registry::{Admission, Registry},
    run::{ExecutionMetadata, PipelineState, RunId, RunScope, RunState, SideTable, StepTrace},
};

/// A helper orchestration pipeline.
///
/// Helpers are registered through the [`ir`](Self::ir),
/// [`builders`](Self::builders) and [`extensions`](Self::extensions) surfaces
/// (or [`use_helper`](Self::use_helper)) and replayed on every
/// [`run`](Self::run). Registration needs `&mut self`, so it cannot overlap a
/// run.
///
/// # Example
///
/// ```ignore
/// let mut pipeline = Pipeline::new(CodegenHost::default());
/// pipeline.ir().register(meta_fragment())?.register(collection_fragment())?;
/// pipeline.builders().register(php_controllers())?;
/// pipeline.extensions().register(WorkspaceExtension)?;
///
/// let result = pipeline.run(options).await?;
/// ```
pub struct Pipeline<H: Host> {
    host: H,
    fragments: Registry<FragmentHelper<H>>,
    builders: Registry<BuilderHelper<H>>,
    hooks: Vec<HookEntry<H>>,
    pending: Vec<PendingHook<H>>,
    extension_count: usize,
    diagnostics: Vec<PipelineDiagnostic>,
    state: PipelineState,
}

impl<H: Host> Pipeline<H> {
    pub fn new(host: H) -> Self {
        Self {
            host,
            fragments: Registry::new(HelperKind::Fragment),
            builders: Registry::new(HelperKind::Builder),
            hooks: Vec::new(),
            pending: Vec::new(),
            extension_count: 0,
            diagnostics: Vec::new(),
            state: PipelineState::Idle,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// `Idle` before the first run, then the outcome of the last run until
    /// another helper is registered.
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Diagnostics recorded while registering helpers.
    pub fn diagnostics(&self) -> &[PipelineDiagnostic] {
        &self.diagnostics
    }

    /// The fragment surface.
    pub fn ir(&mut self) -> HelperSurface<'_, H> {
        HelperSurface {
            pipeline: self,
            kind: HelperKind::Fragment,
        }
    }

    /// The builder surface.
    pub fn builders(&mut self) -> HelperSurface<'_, H> {
        HelperSurface {
            pipeline: self,
            kind: HelperKind::Builder,
        }
    }

    /// The extension surface.
    pub fn extensions(&mut self) -> ExtensionSurface<'_, H> {
        ExtensionSurface { pipeline: self }
    }

    /// Register any helper on the surface matching its kind.
    pub fn use_helper(&mut self, helper: impl Into<Helper<H>>) -> Result<()> {
        match helper.into() {
            Helper::Extension(extension) => self.register_extension(extension),
            helper => {
                let kind = helper.kind();
                self.register_on(kind, helper)?;
                Ok(())
            }
        }
    }

    /// Fragments in the order the next run will execute them.
    pub fn fragment_plan(&self) -> Result<Vec<&HelperDescriptor>, PipelineError> {
        let resolution = graph::resolve(HelperKind::Fragment, self.fragments.entries())?;
        Ok(resolution
            .order
            .into_iter()
            .map(|entry| entry.descriptor())
            .collect())
    }

    /// Builders in chain order.
    pub fn builder_plan(&self) -> Vec<&HelperDescriptor> {
        chain::order(self.builders.entries())
            .into_iter()
            .map(|entry| entry.descriptor())
            .collect()
    }

    /// Keys of registered extension hooks, including unresolved ones, in
    /// registration order.
    pub fn extension_keys(&self) -> Vec<&str> {
        let mut keys: Vec<(usize, &str)> = self
            .hooks
            .iter()
            .map(|hook| (hook.ordinal, hook.descriptor.key.as_str()))
            .chain(
                self.pending
                    .iter()
                    .map(|hook| (hook.ordinal, hook.descriptor.key.as_str())),
            )
            .collect();
        keys.sort_by_key(|(ordinal, _)| *ordinal);
        keys.into_iter().map(|(_, key)| key).collect()
    }

    /// Execute one full cycle against fresh build options, context and draft.
    ///
    /// Helper errors are returned exactly as the helper produced them, after
    /// every executed extension hook has been rolled back. A dependency cycle
    /// fails the run before any fragment executes; the returned report wraps
    /// [`PipelineError::DependencyCycle`].
    pub async fn run(&mut self, options: H::RunOptions) -> Result<H::RunResult> {
        self.resolve_pending().await?;

        let run_id = RunId::next();
        let span = tracing::info_span!("pipeline_run", run_id = %run_id);
        let execution = Execution {
            host: &self.host,
            fragments: &self.fragments,
            builders: &self.builders,
            hooks: &self.hooks,
            registered: &self.diagnostics,
            run_id,
        };
        let result = execution.run(options).instrument(span).await;

        self.state = match result {
            Ok(_) => PipelineState::Done,
            Err(_) => PipelineState::Failed,
        };
        result
    }

    fn register_on(&mut self, surface: HelperKind, helper: Helper<H>) -> Result<(), PipelineError> {
        self.settle();
        if helper.kind() != surface {
            return Err(PipelineError::SurfaceMismatch {
                key: helper.descriptor().key.clone(),
                expected: surface,
                found: helper.kind(),
            });
        }
        match helper {
            Helper::Fragment(fragment) => {
                admit(&mut self.fragments, &mut self.diagnostics, fragment)
            }
            Helper::Builder(builder) => admit(&mut self.builders, &mut self.diagnostics, builder),
            Helper::Extension(extension) => Err(PipelineError::SurfaceMismatch {
                key: extension.descriptor.key,
                expected: surface,
                found: HelperKind::Extension,
            }),
        }
    }

    /// A finished run leaves `Done` or `Failed` behind; registering between
    /// runs starts the next cycle from `Idle`.
    fn settle(&mut self) {
        if matches!(self.state, PipelineState::Done | PipelineState::Failed) {
            self.state = PipelineState::Idle;
        }
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            fragments: self.fragments.len(),
            builders: self.builders.len(),
            hooks: self.hooks.len(),
            pending: self.pending.len(),
            extension_count: self.extension_count,
            diagnostics: self.diagnostics.len(),
        }
    }

    /// Forget everything registered since `checkpoint`.
    fn restore(&mut self, checkpoint: Checkpoint) {
        self.fragments.truncate(checkpoint.fragments);
        self.builders.truncate(checkpoint.builders);
        self.hooks.truncate(checkpoint.hooks);
        self.pending.truncate(checkpoint.pending);
        self.extension_count = checkpoint.extension_count;
        self.diagnostics.truncate(checkpoint.diagnostics);
    }

    fn register_extension(&mut self, helper: ExtensionHelper<H>) -> Result<()> {
        self.settle();
        let checkpoint = self.checkpoint();
        self.extension_count += 1;
        let ordinal = self.extension_count;
        let ExtensionHelper {
            mut descriptor,
            extension,
        } = helper;
        if descriptor.key.is_empty() {
            descriptor.key = format!("pipeline.extension#{ordinal}");
        }

        let mut registrar = ExtensionRegistrar {
            pipeline: self,
            key: descriptor.key.clone(),
        };
        let registration = match extension.register(&mut registrar) {
            Ok(registration) => registration,
            Err(error) => {
                // Helpers the extension contributed before failing go with it.
                self.restore(checkpoint);
                return Err(error);
            }
        };
        tracing::debug!(extension = %descriptor.key, "registered extension");

        match registration {
            Registration::None => {}
            Registration::Hook(hook) => self.hooks.push(HookEntry {
                ordinal,
                descriptor,
                hook,
            }),
            Registration::Pending(future) => self.pending.push(PendingHook {
                ordinal,
                descriptor,
                future,
            }),
        }
        // Extensions registered from inside `register` land first; keep
        // hooks in the order `register` was called.
        self.hooks.sort_by_key(|hook| hook.ordinal);
        self.pending.sort_by_key(|hook| hook.ordinal);
        Ok(())
    }

    /// Await pending extension registrations in registration order.
    async fn resolve_pending(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let mut pending = std::mem::take(&mut self.pending).into_iter();
        while let Some(PendingHook {
            ordinal,
            descriptor,
            future,
        }) = pending.next()
        {
            let key = descriptor.key.clone();
            let resolved = match future.await {
                Ok(resolved) => resolved,
                Err(error) => {
                    self.pending.extend(pending);
                    return Err(error.wrap_err(PipelineError::RegistrationFailed { key }));
                }
            };
            if let Some(hook) = resolved {
                self.hooks.push(HookEntry {
                    ordinal,
                    descriptor,
                    hook,
                });
            }
        }
        self.hooks.sort_by_key(|hook| hook.ordinal);
        Ok(())
    }
}

fn admit<T: Described>(
    registry: &mut Registry<T>,
    diagnostics: &mut Vec<PipelineDiagnostic>,
    helper: T,
) -> Result<(), PipelineError> {
    match registry.admit(helper.descriptor()) {
        Admission::Accepted => {}
        Admission::AcceptedWithWarning(diagnostic) => diagnostics.push(diagnostic),
        Admission::Rejected(error, diagnostic) => {
            diagnostics.push(diagnostic);
            return Err(error);
        }
    }
    let key = helper.descriptor().key.clone();
    let index = registry.push(helper);
    tracing::debug!(kind = %registry.kind(), key = %key, index, "registered helper");
    Ok(())
}

/// Registry sizes taken before an extension registers.
struct Checkpoint {
    fragments: usize,
    builders: usize,
    hooks: usize,
    pending: usize,
    extension_count: usize,
    diagnostics: usize,
}

/// Registration handle for fragments or builders.
pub struct HelperSurface<'p, H: Host> {
    pipeline: &'p mut Pipeline<H>,
    kind: HelperKind,
}

impl<H: Host> HelperSurface<'_, H> {
    pub fn kind(&self) -> HelperKind {
        self.kind
    }

    /// Register a helper of this surface's kind.
    ///
    /// Fails on a kind mismatch or when a second override claims a key.
    pub fn register(&mut self, helper: impl Into<Helper<H>>) -> Result<&mut Self, PipelineError> {
        self.pipeline.register_on(self.kind, helper.into())?;
        Ok(self)
    }
}

/// Registration handle for extensions.
pub struct ExtensionSurface<'p, H: Host> {
    pipeline: &'p mut Pipeline<H>,
}

impl<H: Host> ExtensionSurface<'_, H> {
    /// Register an extension, invoking its `register` immediately.
    pub fn register(&mut self, extension: impl Extension<H> + 'static) -> Result<&mut Self> {
        self.pipeline
            .register_extension(ExtensionHelper::new(extension))?;
        Ok(self)
    }

    /// Register a prepared helper; anything but an extension is rejected.
    pub fn register_helper(&mut self, helper: impl Into<Helper<H>>) -> Result<&mut Self> {
        match helper.into() {
            Helper::Extension(extension) => self.pipeline.register_extension(extension)?,
            helper => {
                return Err(PipelineError::SurfaceMismatch {
                    key: helper.descriptor().key.clone(),
                    expected: HelperKind::Extension,
                    found: helper.kind(),
                }
                .into());
            }
        }
        Ok(self)
    }
}

/// Borrowed view of a pipeline for the length of one run.
struct Execution<'p, H: Host> {
    host: &'p H,
    fragments: &'p Registry<FragmentHelper<H>>,
    builders: &'p Registry<BuilderHelper<H>>,
    hooks: &'p [HookEntry<H>],
    registered: &'p [PipelineDiagnostic],
    run_id: RunId,
}

struct StateTracker {
    state: PipelineState,
}

impl StateTracker {
    fn advance(&mut self, next: PipelineState) {
        tracing::debug!(from = %self.state, to = %next, "pipeline state");
        self.state = next;
    }
}

impl<H: Host> Execution<'_, H> {
    async fn run(self, options: H::RunOptions) -> Result<H::RunResult> {
        let mut tracker = StateTracker {
            state: PipelineState::Idle,
        };
        match self.execute(options, &mut tracker).await {
            Ok(result) => {
                tracker.advance(PipelineState::Done);
                Ok(result)
            }
            Err(error) => {
                tracing::debug!(state = %tracker.state, error = %error, "pipeline run failed");
                tracker.advance(PipelineState::Failed);
                Err(error)
            }
        }
    }

    async fn execute(
        &self,
        options: H::RunOptions,
        tracker: &mut StateTracker,
    ) -> Result<H::RunResult> {
        let host = self.host;

        tracker.advance(PipelineState::BuildingContext);
        let build_options = host.build_options(&options)?;
        let context = host.create_context(&options, &build_options)?;
        let side_table = SideTable::default();
        let trace = StepTrace::default();
        let mut diagnostics = Vec::new();
        for diagnostic in self.registered {
            emit(host, &context, &mut diagnostics, diagnostic.clone());
        }

        let input = RunInput {
            options: &options,
            build_options: &build_options,
        };
        let env = RunEnv {
            context: &context,
            input,
            run: RunScope {
                id: self.run_id,
                side_table: &side_table,
            },
            reporter: context.reporter().clone(),
            trace: &trace,
        };

        tracker.advance(PipelineState::RunningFragments);
        let resolution = graph::resolve(HelperKind::Fragment, self.fragments.entries())?;
        for diagnostic in resolution.missing {
            emit(host, &context, &mut diagnostics, diagnostic);
        }
        let mut draft = host.create_draft(input, &context);
        let fragments = run_fragments(
            &env,
            self.fragments.entries(),
            &resolution.order,
            &mut draft,
        )
        .await?;

        let artifact = host.finalize(
            draft,
            FinalizeArgs {
                input,
                context: &context,
                fragments: &fragments,
                diagnostics: &diagnostics,
            },
        )?;
        tracker.advance(PipelineState::Finalized);

        tracker.advance(PipelineState::RunningExtensions);
        let mut ledger = HookLedger::new(
            self.hooks
                .iter()
                .map(|hook| hook.descriptor.key.clone())
                .collect(),
        );
        let mut artifact = match run_hooks(&env, self.hooks, artifact, &mut ledger).await {
            Ok(artifact) => artifact,
            Err(error) => {
                ledger.rollback(host, &context).await;
                return Err(error);
            }
        };

        tracker.advance(PipelineState::RunningBuilders);
        let chain = Chain::new(chain::order(self.builders.entries()), &env);
        if let Err(error) = chain.run(&mut artifact).await {
            ledger.rollback(host, &context).await;
            return Err(error);
        }
        let (builders, skipped) = chain.snapshot(self.builders.entries());
        for link in skipped {
            let diagnostic = PipelineDiagnostic::unused_helper(HelperKind::Builder, link.key());
            emit(host, &context, &mut diagnostics, diagnostic);
        }

        tracker.advance(PipelineState::Committing);
        if let Err(error) = ledger.commit().await {
            ledger.rollback(host, &context).await;
            return Err(error);
        }

        drop(chain);
        drop(env);
        Ok(host.run_result(RunState {
            run_id: self.run_id,
            options,
            build_options,
            context,
            artifact,
            diagnostics,
            steps: trace.into_steps(),
            helpers: ExecutionMetadata { fragments, builders },
        }))
    }
}

fn emit<H: Host>(
    host: &H,
    context: &H::Context,
    diagnostics: &mut Vec<PipelineDiagnostic>,
    diagnostic: PipelineDiagnostic,
) {
    host.on_diagnostic(context, &diagnostic);
    diagnostics.push(diagnostic);
}
