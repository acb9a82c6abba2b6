use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use eyre::{Result, bail, eyre};
use trellis_pipeline::{BuilderHelper, Reporter};

use crate::{
    Notification, NotificationStatus, ResourceEvent, ResourceHost, ResourceObject, RuntimeShared,
};

pub const KEY: &str = "resource.registry.record";

/// Queues the effects of defining the built resource. Nothing is registered
/// until the side-effects extension commits.
pub fn helper() -> BuilderHelper<ResourceHost> {
    BuilderHelper::<ResourceHost>::from_fn(KEY, |args| {
        let resource = args.artifact.resource.clone().ok_or_else(|| {
            eyre!("recording a resource requires a built resource; did `resource.object.build` run?")
        })?;
        let shared = &args.context.shared;
        if shared.cache.contains(&resource.store_key) {
            bail!(
                "resource '{}' is already defined (store key `{}`)",
                resource.name,
                resource.store_key
            );
        }

        let record = Arc::new(Record {
            shared: shared.clone(),
            reporter: args.reporter.child("broadcast"),
            resource,
            registered: AtomicBool::new(false),
            recorded: AtomicBool::new(false),
            notified: AtomicBool::new(false),
        });
        let mut effects = args.context.effects();
        let commit = Arc::clone(&record);
        effects.on_commit(move || commit.commit());
        effects.on_rollback(move || {
            record.rollback();
            Ok(())
        });
        Ok(())
    })
    .priority(10)
}

/// One definition's effects and how far they got.
struct Record {
    shared: RuntimeShared,
    reporter: Reporter,
    resource: ResourceObject,
    registered: AtomicBool,
    recorded: AtomicBool,
    notified: AtomicBool,
}

impl Record {
    fn commit(&self) -> Result<()> {
        let resource = &self.resource;
        self.shared.cache.register(&resource.store_key)?;
        self.registered.store(true, Ordering::SeqCst);

        self.shared
            .definitions()
            .insert(resource.store_key.clone(), resource.clone());
        self.recorded.store(true, Ordering::SeqCst);
        self.shared.events.emit(ResourceEvent::Defined {
            namespace: resource.namespace.clone(),
            resource: resource.clone(),
        });

        self.notify(NotificationStatus::Committed);
        self.notified.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn rollback(&self) {
        let resource = &self.resource;
        if self.registered.swap(false, Ordering::SeqCst) {
            self.shared.cache.unregister(&resource.store_key);
        }
        if self.recorded.swap(false, Ordering::SeqCst) {
            self.shared.definitions().remove(&resource.store_key);
            self.shared.events.emit(ResourceEvent::Removed {
                namespace: resource.namespace.clone(),
                store_key: resource.store_key.clone(),
            });
        }
        if self.notified.swap(false, Ordering::SeqCst) {
            self.notify(NotificationStatus::RolledBack);
        }
    }

    fn notify(&self, status: NotificationStatus) {
        let notification = Notification {
            namespace: self.resource.namespace.clone(),
            resource_name: self.resource.name.clone(),
            store_key: self.resource.store_key.clone(),
            status,
        };
        if let Err(error) = self.shared.notifier.notify(&notification) {
            self.reporter.warn(format_args!(
                "failed to publish {status} notification for {}: {error:#}",
                notification.store_key
            ));
        }
    }
}
