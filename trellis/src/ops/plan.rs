//! Plan operation - resolves helper order without running anything.

use std::path::Path;

use eyre::Result;
use trellis_codegen::CodegenHost;

use crate::reports::{PlanReport, PlannedHelper};

pub fn plan(config_path: &Path) -> Result<PlanReport> {
    let pipeline = trellis_codegen::pipeline(CodegenHost::new())?;

    let fragments = pipeline
        .fragment_plan()?
        .into_iter()
        .map(PlannedHelper::from)
        .collect();
    let builders = pipeline
        .builder_plan()
        .into_iter()
        .map(PlannedHelper::from)
        .collect();
    let extensions = pipeline
        .extension_keys()
        .into_iter()
        .map(String::from)
        .collect();

    Ok(PlanReport {
        config_path: config_path.to_path_buf(),
        fragments,
        builders,
        extensions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::{BufferOutput, Report};

    #[test]
    fn test_plan_render() {
        let report = plan(Path::new("trellis.toml")).unwrap();
        let mut out = BufferOutput::default();
        report.render(&mut out);

        insta::assert_snapshot!(out.0, @r"
        Plan for trellis.toml
        =====================

        Fragments:
          1. ir.meta (override)
          2. ir.collection after ir.meta
          3. ir.capability-map after ir.collection
          4. ir.validation after ir.capability-map

        Builders:
          1. builder.php.controllers (priority 30)
          2. builder.ts.clients (priority 20)
          3. builder.manifest (priority 10)

        Extensions:
          1. extension.workspace
          2. extension.snapshot
        ");
    }
}
