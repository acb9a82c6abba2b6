//! In-process resource events and cross-process notifications.

use std::fmt;

use eyre::Result;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::ResourceObject;

/// Name of the channel the default notifier publishes on.
pub const RESOURCES_CHANNEL: &str = "trellis.resources";

const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceEvent {
    Defined {
        namespace: String,
        resource: ResourceObject,
    },
    Removed {
        namespace: String,
        store_key: String,
    },
}

/// Fan-out of [`ResourceEvent`]s to every subscriber of one runtime.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ResourceEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ResourceEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of subscribers that received the event.
    pub fn emit(&self, event: ResourceEvent) -> usize {
        // No subscribers is not an error.
        self.sender.send(event).unwrap_or(0)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationStatus {
    Committed,
    RolledBack,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Committed => "committed",
            NotificationStatus::RolledBack => "rolled-back",
        }
    }
}

impl fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message published when a definition commits or rolls back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub namespace: String,
    pub resource_name: String,
    pub store_key: String,
    pub status: NotificationStatus,
}

/// Tells other processes about definitions.
///
/// A failing notifier never fails a definition; the error is reported as a
/// warning.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification) -> Result<()>;
}

/// The default notifier: a broadcast channel inside the current process.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<Notification>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Notifier for BroadcastNotifier {
    fn notify(&self, notification: &Notification) -> Result<()> {
        tracing::trace!(
            channel = RESOURCES_CHANNEL,
            store_key = %notification.store_key,
            status = %notification.status,
            "notify"
        );
        let _ = self.sender.send(notification.clone());
        Ok(())
    }
}
