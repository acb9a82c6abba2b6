//! Builder helpers composed as a chain of responsibility.
//!
//! The chain is an ordered vector of builders. Each builder receives a
//! [`Next`] continuation bound to the position after it; the first call to
//! [`Next::run`] executes the rest of the chain and every later call returns
//! immediately. A builder that never calls `next` ends the chain.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use eyre::Result;
use futures::future::BoxFuture;

use crate::{
    fragment::RunEnv,
    helper::{BuilderHelper, HelperKind},
    host::{Host, RunInput},
    registry::Registered,
    reporter::Reporter,
    run::{HelperExecutionSnapshot, RunScope},
};

/// Arguments passed to every builder.
pub struct BuilderArgs<'a, H: Host> {
    pub context: &'a H::Context,
    pub input: RunInput<'a, H>,
    pub artifact: &'a mut H::Artifact,
    pub reporter: Reporter,
    pub run: RunScope<'a>,
}

/// The behavior of a builder helper.
#[async_trait]
pub trait BuilderApply<H: Host>: Send + Sync {
    /// Act on the artifact. Call `next.run(args.artifact)` to continue the
    /// chain; returning without calling it ends the chain here.
    async fn apply(&self, args: BuilderArgs<'_, H>, next: &mut Next<'_, H>) -> Result<()>;
}

/// Continuation that advances the chain exactly once past one builder.
pub struct Next<'c, H: Host> {
    chain: &'c Chain<'c, H>,
    position: usize,
    consumed: bool,
}

impl<H: Host> Next<'_, H> {
    /// Run the remainder of the chain.
    ///
    /// Only the first call has an effect; later calls resolve immediately
    /// with `Ok(())` without touching downstream builders.
    pub async fn run(&mut self, artifact: &mut H::Artifact) -> Result<()> {
        if self.consumed {
            return Ok(());
        }
        self.consumed = true;
        self.chain.run_from(self.position, artifact).await
    }

    /// Whether the continuation has already been used.
    pub fn is_consumed(&self) -> bool {
        self.consumed
    }
}

pub(crate) struct FnBuilder<F> {
    f: F,
}

impl<F> FnBuilder<F> {
    pub(crate) fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<H, F> BuilderApply<H> for FnBuilder<F>
where
    H: Host,
    F: for<'a, 'b> Fn(&'b mut BuilderArgs<'a, H>) -> Result<()> + Send + Sync,
{
    async fn apply(&self, mut args: BuilderArgs<'_, H>, next: &mut Next<'_, H>) -> Result<()> {
        (self.f)(&mut args)?;
        next.run(args.artifact).await
    }
}

/// Order builders by `(priority desc, key asc, registration index asc)`.
pub(crate) fn order<H: Host>(
    entries: &[Registered<BuilderHelper<H>>],
) -> Vec<&Registered<BuilderHelper<H>>> {
    let mut ordered: Vec<_> = entries.iter().collect();
    ordered.sort_by(|a, b| {
        let (left, right) = (a.descriptor(), b.descriptor());
        right
            .priority
            .cmp(&left.priority)
            .then_with(|| left.key.cmp(&right.key))
            .then_with(|| a.index.cmp(&b.index))
    });
    ordered
}

pub(crate) struct Chain<'c, H: Host> {
    links: Vec<&'c Registered<BuilderHelper<H>>>,
    env: &'c RunEnv<'c, H>,
    executed: Mutex<Vec<usize>>,
}

impl<'c, H: Host> Chain<'c, H> {
    pub(crate) fn new(links: Vec<&'c Registered<BuilderHelper<H>>>, env: &'c RunEnv<'c, H>) -> Self {
        Self {
            links,
            env,
            executed: Mutex::new(Vec::new()),
        }
    }

    /// Invoke the chain from its first builder.
    pub(crate) async fn run(&self, artifact: &mut H::Artifact) -> Result<()> {
        self.run_from(0, artifact).await
    }

    fn run_from<'s>(
        &'s self,
        position: usize,
        artifact: &'s mut H::Artifact,
    ) -> BoxFuture<'s, Result<()>> {
        Box::pin(async move {
            let Some(link) = self.links.get(position) else {
                return Ok(());
            };
            self.env.trace.record(link.descriptor(), link.index);
            self.executed
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(position);
            tracing::debug!(helper = %link.key(), "running builder");

            let mut next = Next {
                chain: self,
                position: position + 1,
                consumed: false,
            };
            let args = BuilderArgs {
                context: self.env.context,
                input: self.env.input,
                artifact,
                reporter: self.env.helper_reporter(HelperKind::Builder, link.key()),
                run: self.env.run,
            };
            link.helper.apply.apply(args, &mut next).await?;

            if !next.consumed && position + 1 < self.links.len() {
                tracing::debug!(helper = %link.key(), "builder ended the chain");
            }
            Ok(())
        })
    }

    /// Snapshot of which builders ran, plus the ones the chain skipped.
    pub(crate) fn snapshot(
        &self,
        registered: &[Registered<BuilderHelper<H>>],
    ) -> (HelperExecutionSnapshot, Vec<&'c Registered<BuilderHelper<H>>>) {
        let executed = self
            .executed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let ran: Vec<(usize, &str)> = executed
            .iter()
            .map(|&position| (self.links[position].index, self.links[position].key()))
            .collect();
        let skipped = self
            .links
            .iter()
            .enumerate()
            .filter(|(position, _)| !executed.contains(position))
            .map(|(_, link)| *link)
            .collect();
        let snapshot = HelperExecutionSnapshot::new(
            HelperKind::Builder,
            registered.iter().map(|entry| (entry.index, entry.key())),
            &ran,
        );
        (snapshot, skipped)
    }
}
