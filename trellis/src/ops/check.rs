//! Check operation - builds the IR without writing.

use std::path::Path;

use eyre::{Context, Result};
use trellis_codegen::GenerateOptions;
use trellis_config::Config;
use trellis_pipeline::Severity;

use crate::reports::CheckReport;

/// Run the pipeline in the check phase and sort its diagnostics.
pub async fn check(config: Config, config_path: &Path) -> Result<CheckReport> {
    let root = config_path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let options = GenerateOptions::new(root)
        .source_path(config_path)
        .check();

    let report = trellis_codegen::generate(config, options)
        .await
        .wrap_err("Validation failed")?;

    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let mut infos = Vec::new();

    for diagnostic in &report.diagnostics {
        let message = diagnostic.message().to_string();
        match diagnostic.severity() {
            Severity::Error => errors.push(message),
            Severity::Warning => warnings.push(message),
            Severity::Info => infos.push(message),
        }
    }
    warnings.extend(report.warnings.iter().map(|warning| {
        if warning.subjects.is_empty() {
            warning.message.clone()
        } else {
            format!("{} ({})", warning.message, warning.subjects.join(", "))
        }
    }));

    Ok(CheckReport {
        config_path: config_path.to_path_buf(),
        resources: report.ir.resources.len(),
        errors,
        warnings,
        infos,
    })
}
