//! The runtime callers define resources through.

use std::{collections::BTreeMap, sync::Arc};

use eyre::{Result, eyre};
use tokio::sync::{Mutex, broadcast};
use trellis_pipeline::{Extension, Helper, Pipeline, ReportSink};

use crate::{
    BroadcastNotifier, CacheRegistry, Definition, EventBus, Notifier, ResourceConfig,
    ResourceEvent, ResourceHost, ResourceObject, RuntimeShared, builders, fragments,
    side_effects::SideEffectsExtension,
};

/// Defines resources and keeps track of what has been defined.
///
/// Every [`define`](Self::define) is one run of a resource pipeline. Helpers
/// and extensions added with [`use_helper`](Self::use_helper) and
/// [`use_extension`](Self::use_extension) take part in every later run.
pub struct ResourceRuntime {
    shared: RuntimeShared,
    pipeline: Mutex<Pipeline<ResourceHost>>,
}

impl ResourceRuntime {
    /// A runtime with the default notifier.
    pub fn new(namespace: impl Into<String>) -> Result<Self> {
        Self::builder(namespace).build()
    }

    pub fn builder(namespace: impl Into<String>) -> RuntimeBuilder {
        RuntimeBuilder {
            namespace: namespace.into(),
            notifier: None,
            sink: None,
            capacity: None,
        }
    }

    /// Define a resource. On failure nothing is registered.
    pub async fn define(&self, config: ResourceConfig) -> Result<ResourceObject> {
        let definition = self.define_with_report(config).await?;
        definition
            .artifact
            .resource
            .ok_or_else(|| eyre!("no builder produced a resource object"))
    }

    /// [`define`](Self::define), returning the full run outcome.
    pub async fn define_with_report(&self, config: ResourceConfig) -> Result<Definition> {
        let name = config.name.clone();
        let definition = self.pipeline.lock().await.run(config).await?;
        tracing::debug!(resource = %name, run_id = %definition.run_id, "resource defined");
        Ok(definition)
    }

    pub async fn use_helper(&self, helper: impl Into<Helper<ResourceHost>>) -> Result<()> {
        self.pipeline.lock().await.use_helper(helper)
    }

    pub async fn use_extension(&self, extension: impl Extension<ResourceHost> + 'static) -> Result<()> {
        self.pipeline.lock().await.extensions().register(extension)?;
        Ok(())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ResourceEvent> {
        self.shared.events.subscribe()
    }

    pub fn cache(&self) -> &CacheRegistry {
        &self.shared.cache
    }

    pub fn namespace(&self) -> &str {
        &self.shared.namespace
    }

    pub fn resource(&self, store_key: &str) -> Option<ResourceObject> {
        self.shared.definitions().get(store_key).cloned()
    }

    /// Defined resources, ordered by store key.
    pub fn resources(&self) -> Vec<ResourceObject> {
        self.shared.definitions().values().cloned().collect()
    }

    /// Forget a defined resource. Returns whether it was defined.
    pub fn remove(&self, store_key: &str) -> bool {
        let Some(resource) = self.shared.definitions().remove(store_key) else {
            return false;
        };
        self.shared.cache.unregister(store_key);
        self.shared.events.emit(ResourceEvent::Removed {
            namespace: resource.namespace,
            store_key: resource.store_key,
        });
        true
    }
}

/// Configures a [`ResourceRuntime`].
pub struct RuntimeBuilder {
    namespace: String,
    notifier: Option<Arc<dyn Notifier>>,
    sink: Option<Arc<dyn ReportSink>>,
    capacity: Option<usize>,
}

impl RuntimeBuilder {
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Mirror reporter output into `sink`.
    pub fn sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Capacity of the event bus.
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn build(self) -> Result<ResourceRuntime> {
        let shared = RuntimeShared {
            namespace: self.namespace,
            cache: Arc::new(CacheRegistry::new()),
            events: self.capacity.map(EventBus::new).unwrap_or_default(),
            notifier: self
                .notifier
                .unwrap_or_else(|| Arc::new(BroadcastNotifier::default())),
            definitions: Arc::new(std::sync::Mutex::new(BTreeMap::new())),
        };

        let mut pipeline = Pipeline::new(ResourceHost::new(shared.clone(), self.sink));
        for fragment in fragments::all() {
            pipeline.ir().register(fragment)?;
        }
        for builder in builders::all() {
            pipeline.builders().register(builder)?;
        }
        pipeline.extensions().register(SideEffectsExtension)?;

        Ok(ResourceRuntime {
            shared,
            pipeline: Mutex::new(pipeline),
        })
    }
}
