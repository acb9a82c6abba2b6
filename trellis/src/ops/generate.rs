//! Generate operation.

use eyre::{Context, Result};
use trellis_codegen::GenerateOptions;
use trellis_config::Config;

use crate::reports::GenerateReport;

pub async fn generate(config: Config, options: GenerateOptions) -> Result<GenerateReport> {
    let output = options.root.clone();
    let dry_run = options.dry_run;
    tracing::info!(output = %output.display(), dry_run, "generating");
    let report = trellis_codegen::generate(config, options)
        .await
        .wrap_err("Generation failed")?;
    Ok(GenerateReport::new(report, output, dry_run))
}
