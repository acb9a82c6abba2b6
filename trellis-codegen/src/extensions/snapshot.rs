//! Debug snapshot of the final IR.

use std::{path::PathBuf, sync::PoisonError};

use eyre::{Result, WrapErr};
use trellis_core::File;
use trellis_pipeline::{Extension, ExtensionRegistrar, HookOutcome, Registration};

use crate::{CodegenHost, Phase};

pub const KEY: &str = "extension.snapshot";

/// Writes the IR as JSON to the layout's snapshot path when a run asks for
/// it with [`GenerateOptions::snapshot`](crate::GenerateOptions::snapshot).
///
/// The snapshot bypasses the workspace transaction: it is written after the
/// generated files commit and is never written for dry or check runs.
#[derive(Debug, Default)]
pub struct SnapshotExtension;

impl Extension<CodegenHost> for SnapshotExtension {
    fn key(&self) -> Option<&str> {
        Some(KEY)
    }

    fn register(
        &self,
        _: &mut ExtensionRegistrar<'_, CodegenHost>,
    ) -> Result<Registration<CodegenHost>> {
        Ok(Registration::<CodegenHost>::hook_fn(|args| {
            let options = &args.input.options.options;
            if !options.snapshot {
                return Ok(None);
            }

            let json = serde_json::to_string_pretty(args.artifact)
                .wrap_err("failed to serialize IR snapshot")?;
            let file = File::new(&args.input.build_options.snapshot_path, json + "\n");
            let root: PathBuf = args.context.root().to_path_buf();
            let skip = options.dry_run || options.phase == Phase::Check;
            let files = args.context.files.clone();
            let reporter = args.reporter.child("snapshot");

            Ok(Some(HookOutcome::<CodegenHost>::new().on_commit(move || async move {
                if skip {
                    reporter.debug(format_args!("skipping {}", file.path().display()));
                    return Ok(());
                }
                file.write(&root)?;
                reporter.info(format_args!("wrote {}", file.path().display()));
                files
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .written
                    .push(file.path().to_path_buf());
                eyre::Ok(())
            })))
        }))
    }
}
