//! Fragment helpers and the sequential fragment runner.

use async_trait::async_trait;
use eyre::Result;

use crate::{
    helper::{FragmentHelper, HelperKind},
    host::{Draft, Host, RunInput},
    registry::Registered,
    reporter::Reporter,
    run::{HelperExecutionSnapshot, RunScope, StepTrace},
};

/// Write access to the draft for one fragment.
pub struct FragmentOutput<'a, D: Draft> {
    draft: &'a mut D,
}

impl<'a, D: Draft> FragmentOutput<'a, D> {
    pub(crate) fn new(draft: &'a mut D) -> Self {
        Self { draft }
    }

    /// Merge `partial` into the draft; present fields overwrite.
    pub fn assign(&mut self, partial: D::Partial) {
        self.draft.assign(partial);
    }

    pub fn draft(&self) -> &D {
        &*self.draft
    }

    pub fn draft_mut(&mut self) -> &mut D {
        &mut *self.draft
    }
}

/// Arguments passed to every fragment.
pub struct FragmentArgs<'a, H: Host> {
    pub context: &'a H::Context,
    pub input: RunInput<'a, H>,
    pub output: FragmentOutput<'a, H::Draft>,
    pub reporter: Reporter,
    pub run: RunScope<'a>,
}

/// The behavior of a fragment helper.
#[async_trait]
pub trait FragmentApply<H: Host>: Send + Sync {
    async fn apply(&self, args: FragmentArgs<'_, H>) -> Result<()>;
}

pub(crate) struct FnFragment<F> {
    f: F,
}

impl<F> FnFragment<F> {
    pub(crate) fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<H, F> FragmentApply<H> for FnFragment<F>
where
    H: Host,
    F: for<'a> Fn(FragmentArgs<'a, H>) -> Result<()> + Send + Sync,
{
    async fn apply(&self, args: FragmentArgs<'_, H>) -> Result<()> {
        (self.f)(args)
    }
}

/// Shared references every phase of a run hands to its helpers.
pub(crate) struct RunEnv<'a, H: Host> {
    pub(crate) context: &'a H::Context,
    pub(crate) input: RunInput<'a, H>,
    pub(crate) run: RunScope<'a>,
    pub(crate) reporter: Reporter,
    pub(crate) trace: &'a StepTrace,
}

impl<H: Host> RunEnv<'_, H> {
    /// Reporter for a single helper: `<run reporter>.<kind>.<key>`.
    pub(crate) fn helper_reporter(&self, kind: HelperKind, key: &str) -> Reporter {
        self.reporter.child(&kind.to_string()).child(key)
    }
}

/// Run `order` against `draft`, one fragment at a time.
pub(crate) async fn run_fragments<H: Host>(
    env: &RunEnv<'_, H>,
    registered: &[Registered<FragmentHelper<H>>],
    order: &[&Registered<FragmentHelper<H>>],
    draft: &mut H::Draft,
) -> Result<HelperExecutionSnapshot> {
    let mut executed: Vec<(usize, &str)> = Vec::with_capacity(order.len());

    for entry in order {
        env.trace.record(entry.descriptor(), entry.index);
        tracing::debug!(helper = %entry.key(), "running fragment");

        let args = FragmentArgs {
            context: env.context,
            input: env.input,
            output: FragmentOutput::new(draft),
            reporter: env.helper_reporter(HelperKind::Fragment, entry.key()),
            run: env.run,
        };
        entry.helper.apply.apply(args).await?;
        executed.push((entry.index, entry.key()));
    }

    Ok(HelperExecutionSnapshot::new(
        HelperKind::Fragment,
        registered.iter().map(|entry| (entry.index, entry.key())),
        &executed,
    ))
}
