//! Plan command report.

use std::path::PathBuf;

use trellis_pipeline::{HelperDescriptor, HelperMode};

use super::output::{Output, Report};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedHelper {
    pub key: String,
    pub mode: HelperMode,
    pub priority: i32,
    pub depends_on: Vec<String>,
}

impl From<&HelperDescriptor> for PlannedHelper {
    fn from(descriptor: &HelperDescriptor) -> Self {
        Self {
            key: descriptor.key.clone(),
            mode: descriptor.mode,
            priority: descriptor.priority,
            depends_on: descriptor.depends_on.clone(),
        }
    }
}

#[derive(Debug)]
pub struct PlanReport {
    pub config_path: PathBuf,
    pub fragments: Vec<PlannedHelper>,
    pub builders: Vec<PlannedHelper>,
    pub extensions: Vec<String>,
}

impl Report for PlanReport {
    fn render(&self, out: &mut dyn Output) {
        out.title(&format!("Plan for {}", self.config_path.display()));
        out.newline();

        out.section("Fragments");
        for (i, fragment) in self.fragments.iter().enumerate() {
            let mut line = fragment.key.clone();
            if fragment.mode == HelperMode::Override {
                line.push_str(" (override)");
            }
            if !fragment.depends_on.is_empty() {
                line.push_str(&format!(" after {}", fragment.depends_on.join(", ")));
            }
            out.numbered_item(i + 1, &line);
        }
        out.newline();

        out.section("Builders");
        for (i, builder) in self.builders.iter().enumerate() {
            out.numbered_item(
                i + 1,
                &format!("{} (priority {})", builder.key, builder.priority),
            );
        }
        out.newline();

        out.section("Extensions");
        for (i, extension) in self.extensions.iter().enumerate() {
            out.numbered_item(i + 1, extension);
        }
    }
}
