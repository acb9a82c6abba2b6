//! Runtime resource definitions for Trellis.
//!
//! [`ResourceRuntime::define`] runs a resource pipeline built on
//! [`trellis_pipeline`]:
//!
//! | Helper | Kind |
//! |---|---|
//! | `resource.namespace.resolve` | fragment (override) |
//! | `resource.routes` | fragment |
//! | `resource.cache-keys` | fragment |
//! | `resource.object.build` | builder |
//! | `resource.registry.record` | builder |
//! | `resource.side-effects` | extension |
//!
//! Registering the store key, recording the definition, emitting
//! [`ResourceEvent::Defined`] and notifying other processes only happen when
//! the run commits.

pub mod builders;
mod cache;
mod events;
pub mod fragments;
mod host;
mod resource;
mod runtime;
pub mod side_effects;

pub use cache::CacheRegistry;
pub use events::{
    BroadcastNotifier, EventBus, Notification, NotificationStatus, Notifier, RESOURCES_CHANNEL,
    ResourceEvent,
};
pub use host::{
    Definition, ResourceArtifact, ResourceContext, ResourceDraft, ResourceHost, ResourcePartial,
    RuntimeShared, SideEffects,
};
pub use resource::{CacheKeys, ResourceConfig, ResourceObject, Route, RouteTable};
pub use runtime::{ResourceRuntime, RuntimeBuilder};
pub use trellis_ir::Method;
