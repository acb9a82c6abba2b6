//! The extension that runs queued side effects.

use std::sync::{Arc, PoisonError};

use eyre::Result;
use trellis_pipeline::{Extension, ExtensionRegistrar, HookOutcome, Registration};

use crate::ResourceHost;

pub const KEY: &str = "resource.side-effects";

/// Commits run the effects builders queued, in order. Rollbacks run the
/// queued rollbacks in reverse.
#[derive(Debug, Default)]
pub struct SideEffectsExtension;

impl Extension<ResourceHost> for SideEffectsExtension {
    fn key(&self) -> Option<&str> {
        Some(KEY)
    }

    fn register(
        &self,
        _: &mut ExtensionRegistrar<'_, ResourceHost>,
    ) -> Result<Registration<ResourceHost>> {
        Ok(Registration::<ResourceHost>::hook_fn(|args| {
            let commits = Arc::clone(&args.context.effects);
            let rollbacks = Arc::clone(&args.context.effects);
            Ok(Some(
                HookOutcome::<ResourceHost>::new()
                    .on_commit(move || async move {
                        commits
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .commit()
                    })
                    .on_rollback(move || async move {
                        rollbacks
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .rollback()
                    }),
            ))
        }))
    }
}
