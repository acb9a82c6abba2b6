//! Wraps the builder chain in a workspace transaction.

use std::sync::{Arc, PoisonError};

use async_trait::async_trait;
use eyre::Result;
use trellis_pipeline::{
    Extension, ExtensionHook, ExtensionRegistrar, HookArgs, HookOutcome, Registration,
};

use crate::{CodegenHost, Phase};

pub const KEY: &str = "extension.workspace";

const TRANSACTION: &str = "trellis.generate";

/// Opens a transaction before builders stage files, flushes it on commit and
/// discards it on rollback. A check run always discards.
#[derive(Debug, Default)]
pub struct WorkspaceExtension;

impl Extension<CodegenHost> for WorkspaceExtension {
    fn key(&self) -> Option<&str> {
        Some(KEY)
    }

    fn register(
        &self,
        _: &mut ExtensionRegistrar<'_, CodegenHost>,
    ) -> Result<Registration<CodegenHost>> {
        Ok(Registration::hook(WorkspaceHook))
    }
}

struct WorkspaceHook;

#[async_trait]
impl ExtensionHook<CodegenHost> for WorkspaceHook {
    async fn run(
        &self,
        args: HookArgs<'_, CodegenHost>,
    ) -> Result<Option<HookOutcome<CodegenHost>>> {
        let context = args.context;
        context.workspace.begin(TRANSACTION);

        let workspace = Arc::clone(&context.workspace);
        let files = Arc::clone(&context.files);
        let phase = context.phase;
        let reporter = args.reporter.child("workspace");
        let commit = move || async move {
            if phase == Phase::Check {
                return workspace.rollback(TRANSACTION);
            }
            let manifest = workspace.commit(TRANSACTION)?;
            reporter.info(format_args!(
                "{} files written, {} skipped",
                manifest.written.len(),
                manifest.skipped.len()
            ));
            *files.lock().unwrap_or_else(PoisonError::into_inner) = manifest;
            eyre::Ok(())
        };

        let workspace = Arc::clone(&context.workspace);
        let rollback = move || async move { workspace.rollback(TRANSACTION) };

        Ok(Some(
            HookOutcome::new().on_commit(commit).on_rollback(rollback),
        ))
    }
}
