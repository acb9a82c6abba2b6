//! Generate command report.

use std::path::PathBuf;

use trellis_codegen::GenerationReport;
use trellis_ir::IrWarning;

use super::output::{Output, Report};

fn plural(count: usize) -> &'static str {
    if count == 1 { "" } else { "s" }
}

pub(crate) fn warning_line(warning: &IrWarning) -> String {
    if warning.subjects.is_empty() {
        format!("warning[{}]: {}", warning.code, warning.message)
    } else {
        format!(
            "warning[{}]: {} ({})",
            warning.code,
            warning.message,
            warning.subjects.join(", ")
        )
    }
}

#[derive(Debug)]
pub struct GenerateReport {
    pub namespace: String,
    pub version: u32,
    pub output: PathBuf,
    pub dry_run: bool,
    pub written: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub warnings: Vec<IrWarning>,
}

impl GenerateReport {
    pub fn new(report: GenerationReport, output: PathBuf, dry_run: bool) -> Self {
        Self {
            namespace: report.ir.meta.namespace,
            version: report.ir.meta.version,
            output,
            dry_run,
            written: report.files.written,
            skipped: report.files.skipped,
            warnings: report.warnings,
        }
    }
}

impl Report for GenerateReport {
    fn render(&self, out: &mut dyn Output) {
        out.title(&format!("{} v{}", self.namespace, self.version));
        out.newline();

        if !self.written.is_empty() {
            out.section(if self.dry_run { "Would write" } else { "Written" });
            for path in &self.written {
                out.added_item(&path.display().to_string());
            }
            out.newline();
        }

        if !self.skipped.is_empty() {
            out.section("Skipped (already exist)");
            for path in &self.skipped {
                out.list_item(&path.display().to_string());
            }
            out.newline();
        }

        for warning in &self.warnings {
            out.warning(&warning_line(warning));
        }

        let count = self.written.len();
        if self.dry_run {
            out.preformatted(&format!(
                "{count} file{} would be written to {}",
                plural(count),
                self.output.display()
            ));
        } else {
            out.preformatted(&format!(
                "✓ {count} file{} written to {}",
                plural(count),
                self.output.display()
            ));
        }
    }
}
