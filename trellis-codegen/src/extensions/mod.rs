//! Extensions that give a generation run its side effects.
//!
//! Registration order matters: the workspace commits before the snapshot is
//! written, and rollbacks run in reverse.

pub mod snapshot;
pub mod workspace;

pub use snapshot::SnapshotExtension;
pub use workspace::WorkspaceExtension;
