//! Intermediate representation types for the Trellis toolchain.
//!
//! The IR is the single source of truth between configuration parsing and the
//! generators. It is assembled by pipeline fragments in an [`IrDraft`] and
//! finalized into a [`ProjectIr`].
//!
//! The IR types are designed to be:
//! - Language-agnostic (no PHP/TypeScript-specific rendering concerns)
//! - Serializable, so a run can be snapshotted for debugging

mod draft;
mod project;

pub use draft::{IrDraft, IrPartial};
pub use project::{
    CapabilityDefinition, CapabilityFallback, CapabilityMap, CapabilityScope, FALLBACK_CAPABILITY,
    IrMeta, IrPhp, IrResource, IrSchema, IrWarning, Method, ProjectIr,
};
