//! Assembling and running the code-generation pipeline.

use eyre::Result;
use trellis_config::Config;
use trellis_pipeline::Pipeline;

use crate::{
    CodegenHost, CodegenRun, GenerateOptions, GenerationReport, builders,
    extensions::{SnapshotExtension, WorkspaceExtension},
    fragments,
};

/// A pipeline with every built-in fragment, builder and extension registered.
pub fn pipeline(host: CodegenHost) -> Result<Pipeline<CodegenHost>> {
    let mut pipeline = Pipeline::new(host);

    for fragment in fragments::all() {
        pipeline.ir().register(fragment)?;
    }
    for builder in builders::all() {
        pipeline.builders().register(builder)?;
    }
    pipeline
        .extensions()
        .register(WorkspaceExtension)?
        .register(SnapshotExtension)?;

    Ok(pipeline)
}

/// Generate PHP and TypeScript sources for `config`.
///
/// # Example
///
/// ```ignore
/// let config = trellis_config::Config::from_file("trellis.toml")?;
/// let report = trellis_codegen::generate(config, GenerateOptions::new(".")).await?;
/// println!("{} files written", report.files.written.len());
/// ```
pub async fn generate(config: Config, options: GenerateOptions) -> Result<GenerationReport> {
    generate_with(CodegenHost::new(), config, options).await
}

/// [`generate`] with a caller-supplied host.
pub async fn generate_with(
    host: CodegenHost,
    config: Config,
    options: GenerateOptions,
) -> Result<GenerationReport> {
    tracing::debug!(root = %options.root.display(), phase = ?options.phase, "generating");
    let mut pipeline = pipeline(host)?;
    pipeline.run(CodegenRun::new(config, options)).await
}
