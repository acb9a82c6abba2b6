//! A JSON manifest of everything the run emitted.

use std::path::PathBuf;

use async_trait::async_trait;
use eyre::{Result, WrapErr};
use serde::Serialize;
use trellis_core::File;
use trellis_pipeline::{BuilderApply, BuilderArgs, BuilderHelper, Next};

use super::EmittedFiles;
use crate::CodegenHost;

pub const KEY: &str = "builder.manifest";

pub fn helper() -> BuilderHelper<CodegenHost> {
    BuilderHelper::new(KEY, ManifestBuilder).priority(10)
}

#[derive(Debug, Serialize)]
struct GenerationManifest<'a> {
    namespace: &'a str,
    version: u32,
    files: Vec<PathBuf>,
}

struct ManifestBuilder;

#[async_trait]
impl BuilderApply<CodegenHost> for ManifestBuilder {
    async fn apply(
        &self,
        args: BuilderArgs<'_, CodegenHost>,
        next: &mut Next<'_, CodegenHost>,
    ) -> Result<()> {
        let files = args
            .run
            .side_table
            .get::<EmittedFiles>()
            .unwrap_or_default()
            .into_paths();
        let manifest = GenerationManifest {
            namespace: &args.artifact.meta.namespace,
            version: args.artifact.meta.version,
            files,
        };
        let json = serde_json::to_string_pretty(&manifest)
            .wrap_err("failed to serialize generation manifest")?;

        args.context
            .stage(File::new(&args.input.build_options.manifest_path, json + "\n"))?;
        next.run(args.artifact).await
    }
}
