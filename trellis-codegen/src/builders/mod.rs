//! Builders that turn the IR into staged files.
//!
//! Ordered by priority: PHP controllers (30), TypeScript clients (20), then
//! the generation manifest (10).

pub mod manifest;
pub mod php;
pub mod ts;

use std::path::{Path, PathBuf};

use trellis_pipeline::BuilderHelper;

use crate::CodegenHost;

pub(crate) const GENERATED_HEADER: &str = "// Generated by trellis. Do not edit.";

/// Paths staged by builders so far in the current run.
#[derive(Debug, Clone, Default)]
pub(crate) struct EmittedFiles(Vec<PathBuf>);

impl EmittedFiles {
    pub(crate) fn push(&mut self, path: &Path) {
        self.0.push(path.to_path_buf());
    }

    pub(crate) fn into_paths(self) -> Vec<PathBuf> {
        self.0
    }
}

pub fn all() -> Vec<BuilderHelper<CodegenHost>> {
    vec![php::helper(), ts::helper(), manifest::helper()]
}
