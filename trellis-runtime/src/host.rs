//! The host that configures resource pipelines.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use eyre::{Result, eyre};
use trellis_pipeline::{
    Draft, FinalizeArgs, Host, PipelineContext, PipelineDiagnostic, ReportSink, Reporter,
    RunId, RunInput, RunState,
};

use crate::{
    CacheKeys, CacheRegistry, EventBus, Notifier, ResourceConfig, ResourceObject, RouteTable,
};

/// State shared by a runtime and every run of its pipeline.
#[derive(Clone)]
pub struct RuntimeShared {
    /// Namespace used when a definition does not name one.
    pub namespace: String,
    pub cache: Arc<CacheRegistry>,
    pub events: EventBus,
    pub notifier: Arc<dyn Notifier>,
    /// Defined resources keyed by store key.
    pub definitions: Arc<Mutex<BTreeMap<String, ResourceObject>>>,
}

impl RuntimeShared {
    pub(crate) fn definitions(&self) -> MutexGuard<'_, BTreeMap<String, ResourceObject>> {
        self.definitions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

type Effect = Box<dyn FnOnce() -> Result<()> + Send>;

/// Side effects queued by builders, run by the side-effects extension.
#[derive(Default)]
pub struct SideEffects {
    commits: Vec<Effect>,
    rollbacks: Vec<Effect>,
}

impl SideEffects {
    pub fn on_commit(&mut self, effect: impl FnOnce() -> Result<()> + Send + 'static) {
        self.commits.push(Box::new(effect));
    }

    pub fn on_rollback(&mut self, effect: impl FnOnce() -> Result<()> + Send + 'static) {
        self.rollbacks.push(Box::new(effect));
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty() && self.rollbacks.is_empty()
    }

    /// Run queued commits in order, stopping at the first failure.
    pub(crate) fn commit(&mut self) -> Result<()> {
        for effect in std::mem::take(&mut self.commits) {
            effect()?;
        }
        Ok(())
    }

    /// Run queued rollbacks in reverse order. Every rollback runs; the first
    /// failure is returned.
    pub(crate) fn rollback(&mut self) -> Result<()> {
        let mut first = None;
        for effect in std::mem::take(&mut self.rollbacks).into_iter().rev() {
            if let Err(error) = effect() {
                first.get_or_insert(error);
            }
        }
        first.map_or(Ok(()), Err)
    }
}

/// Shared by every helper of one definition.
pub struct ResourceContext {
    reporter: Reporter,
    pub shared: RuntimeShared,
    pub(crate) effects: Arc<Mutex<SideEffects>>,
}

impl ResourceContext {
    /// Queue side effects for the side-effects extension.
    pub fn effects(&self) -> MutexGuard<'_, SideEffects> {
        self.effects.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PipelineContext for ResourceContext {
    fn reporter(&self) -> &Reporter {
        &self.reporter
    }
}

/// Resource under construction.
#[derive(Debug, Clone, Default)]
pub struct ResourceDraft {
    pub namespace: Option<String>,
    pub name: Option<String>,
    pub store_key: Option<String>,
    pub routes: Option<RouteTable>,
    pub cache_keys: Option<CacheKeys>,
}

#[derive(Debug, Clone, Default)]
pub struct ResourcePartial {
    pub namespace: Option<String>,
    pub name: Option<String>,
    pub store_key: Option<String>,
    pub routes: Option<RouteTable>,
    pub cache_keys: Option<CacheKeys>,
}

impl Draft for ResourceDraft {
    type Partial = ResourcePartial;

    fn assign(&mut self, partial: ResourcePartial) {
        if partial.namespace.is_some() {
            self.namespace = partial.namespace;
        }
        if partial.name.is_some() {
            self.name = partial.name;
        }
        if partial.store_key.is_some() {
            self.store_key = partial.store_key;
        }
        if partial.routes.is_some() {
            self.routes = partial.routes;
        }
        if partial.cache_keys.is_some() {
            self.cache_keys = partial.cache_keys;
        }
    }
}

/// The finalized definition handed to builders.
#[derive(Debug, Clone)]
pub struct ResourceArtifact {
    pub namespace: String,
    pub name: String,
    pub store_key: String,
    pub routes: RouteTable,
    pub cache_keys: CacheKeys,
    /// Set by `resource.object.build`.
    pub resource: Option<ResourceObject>,
}

fn required<T>(value: Option<T>, field: &str, fragment: &str) -> Result<T> {
    value.ok_or_else(|| eyre!("resource draft is missing `{field}`; did `{fragment}` run?"))
}

impl ResourceDraft {
    pub fn finish(self) -> Result<ResourceArtifact> {
        let namespace_fragment = crate::fragments::namespace::KEY;
        Ok(ResourceArtifact {
            namespace: required(self.namespace, "namespace", namespace_fragment)?,
            name: required(self.name, "name", namespace_fragment)?,
            store_key: required(self.store_key, "store_key", namespace_fragment)?,
            routes: required(self.routes, "routes", crate::fragments::routes::KEY)?,
            cache_keys: required(self.cache_keys, "cache_keys", crate::fragments::cache_keys::KEY)?,
            resource: None,
        })
    }
}

/// Outcome of one definition run.
#[derive(Debug)]
pub struct Definition {
    pub run_id: RunId,
    pub artifact: ResourceArtifact,
    pub diagnostics: Vec<PipelineDiagnostic>,
    pub steps: Vec<String>,
}

/// Configures the pipeline for resource definitions.
pub struct ResourceHost {
    shared: RuntimeShared,
    sink: Option<Arc<dyn ReportSink>>,
}

impl ResourceHost {
    pub fn new(shared: RuntimeShared, sink: Option<Arc<dyn ReportSink>>) -> Self {
        Self { shared, sink }
    }
}

impl Host for ResourceHost {
    type RunOptions = ResourceConfig;
    type BuildOptions = ();
    type Context = ResourceContext;
    type Draft = ResourceDraft;
    type Artifact = ResourceArtifact;
    type RunResult = Definition;

    fn build_options(&self, _: &ResourceConfig) -> Result<()> {
        Ok(())
    }

    fn create_context(&self, _: &ResourceConfig, _: &()) -> Result<ResourceContext> {
        let mut reporter = Reporter::new("trellis.runtime");
        if let Some(sink) = &self.sink {
            reporter = reporter.with_sink(sink.clone());
        }
        Ok(ResourceContext {
            reporter,
            shared: self.shared.clone(),
            effects: Arc::default(),
        })
    }

    fn create_draft(&self, _: RunInput<'_, Self>, _: &ResourceContext) -> ResourceDraft {
        ResourceDraft::default()
    }

    fn finalize(&self, draft: ResourceDraft, _: FinalizeArgs<'_, Self>) -> Result<ResourceArtifact> {
        draft.finish()
    }

    fn run_result(&self, state: RunState<Self>) -> Definition {
        Definition {
            run_id: state.run_id,
            artifact: state.artifact,
            diagnostics: state.diagnostics,
            steps: state.steps.into_iter().map(|step| step.key).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn test_rollbacks_run_in_reverse_and_all_run() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut effects = SideEffects::default();
        for label in ["first", "second", "third"] {
            let order = order.clone();
            effects.on_rollback(move || {
                order.lock().unwrap().push(label);
                if label == "second" {
                    eyre::bail!("second failed");
                }
                Ok(())
            });
        }

        let err = effects.rollback().unwrap_err();

        assert_eq!(err.to_string(), "second failed");
        assert_eq!(*order.lock().unwrap(), vec!["third", "second", "first"]);
        assert!(effects.is_empty());
    }

    #[test]
    fn test_commit_stops_at_first_failure() {
        let ran = Arc::new(AtomicUsize::new(0));
        let mut effects = SideEffects::default();
        effects.on_commit(|| eyre::bail!("refused"));
        let counter = ran.clone();
        effects.on_commit(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        assert!(effects.commit().is_err());
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_finish_names_missing_fragment() {
        let draft = ResourceDraft {
            namespace: Some("acme".into()),
            name: Some("post".into()),
            store_key: Some("acme/post".into()),
            ..ResourceDraft::default()
        };

        let err = draft.finish().unwrap_err();
        assert_eq!(
            err.to_string(),
            "resource draft is missing `routes`; did `resource.routes` run?"
        );
    }
}
