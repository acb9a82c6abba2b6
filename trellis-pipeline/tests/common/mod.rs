//! A small host used by the pipeline integration tests.

#![allow(dead_code)]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use trellis_pipeline::{
    BuilderHelper, Draft, Extension, ExtensionRegistrar, FinalizeArgs, FragmentHelper, Host,
    HookOutcome, PipelineContext, PipelineRun, Registration, Reporter, RunInput, RunState,
    testing::MemorySink,
};

pub type Log = Arc<Mutex<Vec<String>>>;

pub fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

#[derive(Default)]
pub struct TestHost {
    pub sink: Arc<MemorySink>,
    pub contexts: Arc<AtomicUsize>,
}

pub struct TestOptions {
    pub namespace: String,
    pub log: Log,
}

impl TestOptions {
    pub fn new(log: &Log) -> Self {
        Self {
            namespace: "initial".into(),
            log: log.clone(),
        }
    }
}

pub struct TestContext {
    pub reporter: Reporter,
    pub log: Log,
    pub serial: usize,
}

impl TestContext {
    pub fn record(&self, entry: impl Into<String>) {
        self.log.lock().unwrap().push(entry.into());
    }
}

impl PipelineContext for TestContext {
    fn reporter(&self) -> &Reporter {
        &self.reporter
    }
}

#[derive(Default)]
pub struct TestDraft {
    pub namespace: Option<String>,
    pub version: Option<u32>,
}

#[derive(Default)]
pub struct TestPartial {
    pub namespace: Option<String>,
    pub version: Option<u32>,
}

impl Draft for TestDraft {
    type Partial = TestPartial;

    fn assign(&mut self, partial: TestPartial) {
        if let Some(namespace) = partial.namespace {
            self.namespace = Some(namespace);
        }
        if let Some(version) = partial.version {
            self.version = Some(version);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestArtifact {
    pub namespace: String,
    pub version: u32,
    pub built: Vec<String>,
    pub seen_by_builders: Vec<String>,
}

impl Host for TestHost {
    type RunOptions = TestOptions;
    type BuildOptions = String;
    type Context = TestContext;
    type Draft = TestDraft;
    type Artifact = TestArtifact;
    type RunResult = PipelineRun<TestArtifact>;

    fn build_options(&self, options: &TestOptions) -> eyre::Result<String> {
        Ok(options.namespace.clone())
    }

    fn create_context(&self, options: &TestOptions, _: &String) -> eyre::Result<TestContext> {
        let serial = self.contexts.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(TestContext {
            reporter: Reporter::new("test").with_sink(self.sink.clone()),
            log: options.log.clone(),
            serial,
        })
    }

    fn create_draft(&self, input: RunInput<'_, Self>, _: &TestContext) -> TestDraft {
        TestDraft {
            namespace: Some(input.build_options.clone()),
            version: None,
        }
    }

    fn finalize(&self, draft: TestDraft, _: FinalizeArgs<'_, Self>) -> eyre::Result<TestArtifact> {
        Ok(TestArtifact {
            namespace: draft.namespace.unwrap_or_default(),
            version: draft.version.unwrap_or(1),
            built: Vec::new(),
            seen_by_builders: Vec::new(),
        })
    }

    fn run_result(&self, state: RunState<Self>) -> PipelineRun<TestArtifact> {
        PipelineRun::from_state(state)
    }
}

/// A fragment that records its key.
pub fn fragment(key: &str) -> FragmentHelper<TestHost> {
    let entry = key.to_string();
    FragmentHelper::<TestHost>::from_fn(key, move |args| {
        args.context.record(entry.clone());
        Ok(())
    })
}

/// A builder that records `label` and appends it to the artifact.
pub fn builder(key: &str, label: &str) -> BuilderHelper<TestHost> {
    let label = label.to_string();
    BuilderHelper::<TestHost>::from_fn(key, move |args| {
        args.context.record(label.clone());
        args.artifact.built.push(label.clone());
        let namespace = args.artifact.namespace.clone();
        args.artifact.seen_by_builders.push(namespace);
        Ok(())
    })
}

/// An extension recording its hook, commit and rollback into the run log.
pub struct Recording {
    pub key: &'static str,
    pub fail_hook: bool,
    pub fail_rollback: bool,
    pub fail_commit: bool,
    pub rename_to: Option<&'static str>,
}

impl Recording {
    pub fn new(key: &'static str) -> Self {
        Self {
            key,
            fail_hook: false,
            fail_rollback: false,
            fail_commit: false,
            rename_to: None,
        }
    }
}

impl Extension<TestHost> for Recording {
    fn key(&self) -> Option<&str> {
        Some(self.key)
    }

    fn register(
        &self,
        _: &mut ExtensionRegistrar<'_, TestHost>,
    ) -> eyre::Result<Registration<TestHost>> {
        let key = self.key;
        let (fail_hook, fail_rollback, fail_commit) =
            (self.fail_hook, self.fail_rollback, self.fail_commit);
        let rename_to = self.rename_to;

        Ok(Registration::<TestHost>::hook_fn(move |args| {
            args.context.record(format!("hook:{key}"));
            if fail_hook {
                eyre::bail!("hook {key} failed");
            }

            let commit_log = args.context.log.clone();
            let rollback_log = args.context.log.clone();
            let mut outcome = HookOutcome::<TestHost>::new()
                .on_commit(move || async move {
                    commit_log.lock().unwrap().push(format!("commit:{key}"));
                    if fail_commit {
                        eyre::bail!("commit {key} failed");
                    }
                    Ok::<(), eyre::Report>(())
                })
                .on_rollback(move || async move {
                    rollback_log.lock().unwrap().push(format!("rollback:{key}"));
                    if fail_rollback {
                        eyre::bail!("rollback {key} failed");
                    }
                    Ok::<(), eyre::Report>(())
                });

            if let Some(namespace) = rename_to {
                let mut artifact = args.artifact.clone();
                artifact.namespace = namespace.to_string();
                outcome = outcome.with_artifact(artifact);
            }
            Ok(Some(outcome))
        }))
    }
}
