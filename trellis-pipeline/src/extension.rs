//! Extensions and the commit/rollback coordinator.
//!
//! An extension registers once and may hand back a hook. Hooks run after the
//! artifact is finalized and before the builder chain; each may replace the
//! artifact and return a commit and a rollback transition. Commits run in
//! registration order once the chain succeeds. When anything after a hook
//! fails, rollbacks run in reverse registration order and the original error
//! is returned.

use std::future::Future;

use async_trait::async_trait;
use eyre::Result;
use futures::future::BoxFuture;

use crate::{
    driver::{ExtensionSurface, HelperSurface, Pipeline},
    fragment::RunEnv,
    helper::{HelperDescriptor, HelperKind},
    host::{Host, RunInput},
    reporter::Reporter,
    run::RunScope,
};

/// A one-shot commit or rollback action.
pub type Transition = Box<dyn FnOnce() -> BoxFuture<'static, Result<()>> + Send>;

fn transition<F, Fut>(f: F) -> Transition
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Box::new(move || Box::pin(f()))
}

/// What a hook hands back to the coordinator.
pub struct HookOutcome<H: Host> {
    /// Replaces the artifact for later hooks and the builder chain.
    pub artifact: Option<H::Artifact>,
    pub commit: Option<Transition>,
    pub rollback: Option<Transition>,
}

impl<H: Host> HookOutcome<H> {
    pub fn new() -> Self {
        Self {
            artifact: None,
            commit: None,
            rollback: None,
        }
    }

    pub fn with_artifact(mut self, artifact: H::Artifact) -> Self {
        self.artifact = Some(artifact);
        self
    }

    pub fn on_commit<F, Fut>(mut self, f: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.commit = Some(transition(f));
        self
    }

    pub fn on_rollback<F, Fut>(mut self, f: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.rollback = Some(transition(f));
        self
    }
}

impl<H: Host> Default for HookOutcome<H> {
    fn default() -> Self {
        Self::new()
    }
}

/// Arguments passed to every extension hook.
pub struct HookArgs<'a, H: Host> {
    pub context: &'a H::Context,
    pub input: RunInput<'a, H>,
    pub artifact: &'a H::Artifact,
    pub reporter: Reporter,
    pub run: RunScope<'a>,
}

/// Per-run behavior of an extension.
#[async_trait]
pub trait ExtensionHook<H: Host>: Send + Sync {
    async fn run(&self, args: HookArgs<'_, H>) -> Result<Option<HookOutcome<H>>>;
}

struct FnHook<F> {
    f: F,
}

#[async_trait]
impl<H, F> ExtensionHook<H> for FnHook<F>
where
    H: Host,
    F: for<'a> Fn(HookArgs<'a, H>) -> Result<Option<HookOutcome<H>>> + Send + Sync,
{
    async fn run(&self, args: HookArgs<'_, H>) -> Result<Option<HookOutcome<H>>> {
        (self.f)(args)
    }
}

/// The result of [`Extension::register`].
pub enum Registration<H: Host> {
    /// The extension only contributed helpers.
    None,
    Hook(Box<dyn ExtensionHook<H>>),
    /// A hook that becomes available once the future resolves. Resolved
    /// before the next run starts.
    Pending(BoxFuture<'static, Result<Option<Box<dyn ExtensionHook<H>>>>>),
}

impl<H: Host> Registration<H> {
    pub fn hook(hook: impl ExtensionHook<H> + 'static) -> Self {
        Registration::Hook(Box::new(hook))
    }

    /// Adapt a synchronous closure into a hook.
    pub fn hook_fn<F>(f: F) -> Self
    where
        F: for<'a> Fn(HookArgs<'a, H>) -> Result<Option<HookOutcome<H>>> + Send + Sync + 'static,
    {
        Registration::Hook(Box::new(FnHook { f }))
    }

    pub fn pending<Fut>(future: Fut) -> Self
    where
        Fut: Future<Output = Result<Option<Box<dyn ExtensionHook<H>>>>> + Send + 'static,
    {
        Registration::Pending(Box::pin(future))
    }
}

/// A helper that wraps the artifact phase.
pub trait Extension<H: Host>: Send + Sync {
    /// Key used in logs and rollback reports. Unnamed extensions get
    /// `pipeline.extension#<n>`.
    fn key(&self) -> Option<&str> {
        None
    }

    /// Called once when the extension is registered.
    fn register(&self, registrar: &mut ExtensionRegistrar<'_, H>) -> Result<Registration<H>>;
}

/// What an extension sees of the pipeline while registering.
pub struct ExtensionRegistrar<'p, H: Host> {
    pub(crate) pipeline: &'p mut Pipeline<H>,
    pub(crate) key: String,
}

impl<H: Host> ExtensionRegistrar<'_, H> {
    /// The resolved key of the extension being registered.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn host(&self) -> &H {
        self.pipeline.host()
    }

    pub fn ir(&mut self) -> HelperSurface<'_, H> {
        self.pipeline.ir()
    }

    pub fn builders(&mut self) -> HelperSurface<'_, H> {
        self.pipeline.builders()
    }

    pub fn extensions(&mut self) -> ExtensionSurface<'_, H> {
        self.pipeline.extensions()
    }
}

/// A failed rollback, handed to [`Host::on_rollback_error`].
pub struct RollbackFailure {
    /// The extension whose rollback failed.
    pub extension: String,
    pub error: eyre::Report,
    /// Keys of every extension hook registered on the pipeline.
    pub extensions: Vec<String>,
}

impl std::fmt::Debug for RollbackFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RollbackFailure")
            .field("extension", &self.extension)
            .field("error", &format_args!("{:#}", self.error))
            .field("extensions", &self.extensions)
            .finish()
    }
}

pub(crate) struct HookEntry<H: Host> {
    pub(crate) ordinal: usize,
    pub(crate) descriptor: HelperDescriptor,
    pub(crate) hook: Box<dyn ExtensionHook<H>>,
}

pub(crate) struct PendingHook<H: Host> {
    pub(crate) ordinal: usize,
    pub(crate) descriptor: HelperDescriptor,
    pub(crate) future: BoxFuture<'static, Result<Option<Box<dyn ExtensionHook<H>>>>>,
}

struct LedgerEntry {
    key: String,
    commit: Option<Transition>,
    rollback: Option<Transition>,
}

/// Transitions of the hooks that executed during one run.
pub(crate) struct HookLedger {
    keys: Vec<String>,
    entries: Vec<LedgerEntry>,
}

impl HookLedger {
    pub(crate) fn new(keys: Vec<String>) -> Self {
        Self {
            keys,
            entries: Vec::new(),
        }
    }

    /// Run every pending commit in registration order.
    pub(crate) async fn commit(&mut self) -> Result<()> {
        for entry in &mut self.entries {
            if let Some(commit) = entry.commit.take() {
                tracing::debug!(extension = %entry.key, "committing extension");
                commit().await?;
            }
        }
        Ok(())
    }

    /// Run every pending rollback in reverse registration order.
    ///
    /// Failures go to [`Host::on_rollback_error`] and never stop the
    /// remaining rollbacks.
    pub(crate) async fn rollback<H: Host>(&mut self, host: &H, context: &H::Context) {
        for entry in self.entries.iter_mut().rev() {
            let Some(rollback) = entry.rollback.take() else {
                continue;
            };
            tracing::debug!(extension = %entry.key, "rolling back extension");
            if let Err(error) = rollback().await {
                let failure = RollbackFailure {
                    extension: entry.key.clone(),
                    error,
                    extensions: self.keys.clone(),
                };
                host.on_rollback_error(context, &failure);
            }
        }
    }
}

/// Run every hook in order, threading the artifact through.
pub(crate) async fn run_hooks<H: Host>(
    env: &RunEnv<'_, H>,
    hooks: &[HookEntry<H>],
    mut artifact: H::Artifact,
    ledger: &mut HookLedger,
) -> Result<H::Artifact> {
    for entry in hooks {
        let key = entry.descriptor.key.as_str();
        env.trace.record(&entry.descriptor, entry.ordinal);
        tracing::debug!(helper = %key, "running extension hook");

        let args = HookArgs {
            context: env.context,
            input: env.input,
            artifact: &artifact,
            reporter: env.helper_reporter(HelperKind::Extension, key),
            run: env.run,
        };
        let Some(outcome) = entry.hook.run(args).await? else {
            continue;
        };
        if let Some(replacement) = outcome.artifact {
            artifact = replacement;
        }
        ledger.entries.push(LedgerEntry {
            key: key.to_string(),
            commit: outcome.commit,
            rollback: outcome.rollback,
        });
    }
    Ok(artifact)
}
