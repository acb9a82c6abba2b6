//! The host that configures the code-generation pipeline.

use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};

use serde::Serialize;
use trellis_config::Config;
use trellis_core::{File, FileManifest, Workspace};
use trellis_ir::{IrDraft, IrWarning, ProjectIr};
use trellis_pipeline::{
    FinalizeArgs, Host, PipelineContext, PipelineDiagnostic, ReportSink, Reporter, RunInput,
    RunState,
};

/// What a run is for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Stage generated files and flush them on commit.
    #[default]
    Generate,
    /// Build the IR and report diagnostics without writing anything.
    Check,
}

/// Options for a single generation run.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Directory generated paths are relative to.
    pub root: PathBuf,
    /// Path of the configuration file, recorded in the IR.
    pub source_path: PathBuf,
    pub phase: Phase,
    /// Report what would be written without touching the disk.
    pub dry_run: bool,
    /// Write the final IR to `.trellis/debug/ir.json` on commit.
    pub snapshot: bool,
}

impl GenerateOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            source_path: root.join(trellis_config::CONFIG_FILE),
            root,
            phase: Phase::Generate,
            dry_run: false,
            snapshot: false,
        }
    }

    pub fn check(mut self) -> Self {
        self.phase = Phase::Check;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn snapshot(mut self, snapshot: bool) -> Self {
        self.snapshot = snapshot;
        self
    }

    pub fn source_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_path = path.into();
        self
    }
}

/// Run options of the code-generation pipeline.
#[derive(Debug, Clone)]
pub struct CodegenRun {
    pub config: Arc<Config>,
    pub options: GenerateOptions,
}

impl CodegenRun {
    pub fn new(config: Config, options: GenerateOptions) -> Self {
        Self {
            config: Arc::new(config),
            options,
        }
    }
}

/// Output locations derived from the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    pub php_namespace: String,
    pub php_dir: PathBuf,
    pub ts_dir: PathBuf,
    pub manifest_path: PathBuf,
    pub snapshot_path: PathBuf,
}

impl OutputLayout {
    pub fn from_config(config: &Config) -> Self {
        Self {
            php_namespace: config.php_namespace(),
            php_dir: config.php.output_dir.clone(),
            ts_dir: PathBuf::from(".generated/ts"),
            manifest_path: PathBuf::from(".trellis/manifest.json"),
            snapshot_path: PathBuf::from(".trellis/debug/ir.json"),
        }
    }
}

/// Shared by every helper of one run.
pub struct CodegenContext {
    reporter: Reporter,
    pub workspace: Arc<Workspace>,
    pub config: Arc<Config>,
    pub phase: Phase,
    /// Filled by the workspace extension when its transaction commits.
    pub(crate) files: Arc<Mutex<FileManifest>>,
}

impl CodegenContext {
    /// Stage a generated file in the open workspace transaction.
    pub fn stage(&self, file: File) -> eyre::Result<()> {
        self.workspace.write(file)
    }

    pub fn root(&self) -> &Path {
        self.workspace.root()
    }

    fn take_files(&self) -> FileManifest {
        std::mem::take(&mut *self.files.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl PipelineContext for CodegenContext {
    fn reporter(&self) -> &Reporter {
        &self.reporter
    }
}

/// Summary of one generation run.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub phase: Phase,
    pub ir: ProjectIr,
    /// Files touched on disk (or that would be, for a dry run).
    pub files: FileManifest,
    pub diagnostics: Vec<PipelineDiagnostic>,
    pub warnings: Vec<IrWarning>,
    pub steps: Vec<String>,
}

impl GenerationReport {
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|diagnostic| diagnostic.severity().is_error())
    }
}

/// Configures the pipeline for code generation.
#[derive(Default)]
pub struct CodegenHost {
    sink: Option<Arc<dyn ReportSink>>,
}

impl CodegenHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mirror reporter output into `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sink = Some(sink);
        self
    }
}

impl Host for CodegenHost {
    type RunOptions = CodegenRun;
    type BuildOptions = OutputLayout;
    type Context = CodegenContext;
    type Draft = IrDraft;
    type Artifact = ProjectIr;
    type RunResult = GenerationReport;

    fn build_options(&self, run: &CodegenRun) -> eyre::Result<OutputLayout> {
        Ok(OutputLayout::from_config(&run.config))
    }

    fn create_context(&self, run: &CodegenRun, _: &OutputLayout) -> eyre::Result<CodegenContext> {
        let options = &run.options;
        let workspace = if options.dry_run || options.phase == Phase::Check {
            Workspace::dry_run(&options.root)
        } else {
            Workspace::new(&options.root)
        };
        let mut reporter = Reporter::new("trellis.codegen");
        if let Some(sink) = &self.sink {
            reporter = reporter.with_sink(sink.clone());
        }
        Ok(CodegenContext {
            reporter,
            workspace: Arc::new(workspace),
            config: run.config.clone(),
            phase: options.phase,
            files: Arc::default(),
        })
    }

    fn create_draft(&self, _: RunInput<'_, Self>, _: &CodegenContext) -> IrDraft {
        IrDraft::default()
    }

    fn finalize(&self, draft: IrDraft, _: FinalizeArgs<'_, Self>) -> eyre::Result<ProjectIr> {
        draft.finish()
    }

    fn run_result(&self, state: RunState<Self>) -> GenerationReport {
        let steps = state.steps.iter().map(|step| step.key.clone()).collect();
        GenerationReport {
            phase: state.options.options.phase,
            files: state.context.take_files(),
            warnings: state.artifact.capability_map.warnings.clone(),
            ir: state.artifact,
            diagnostics: state.diagnostics,
            steps,
        }
    }
}
