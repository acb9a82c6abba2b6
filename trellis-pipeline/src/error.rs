//! Registration and ordering errors.

use miette::Diagnostic;
use thiserror::Error;

use crate::helper::HelperKind;

/// A contract violation detected by the pipeline itself.
///
/// Helper failures are never wrapped in this type; they propagate out of
/// [`Pipeline::run`](crate::Pipeline::run) exactly as the helper returned them.
#[derive(Debug, Error, Diagnostic)]
pub enum PipelineError {
    #[error("attempted to register helper \"{key}\" as {expected} but received kind \"{found}\"")]
    #[diagnostic(
        code(pipeline::surface_mismatch),
        help("register {found} helpers through their own surface or use `Pipeline::use_helper`")
    )]
    SurfaceMismatch {
        key: String,
        expected: HelperKind,
        found: HelperKind,
    },

    #[error("multiple overrides registered for helper \"{key}\"")]
    #[diagnostic(
        code(pipeline::override_conflict),
        help("\"{existing}\" already overrides this {kind}; drop one of the overrides from \"{incoming}\"")
    )]
    OverrideConflict {
        key: String,
        kind: HelperKind,
        existing: String,
        incoming: String,
    },

    #[error("detected a cycle while ordering {kind} helpers: {}", .keys.join(", "))]
    #[diagnostic(
        code(pipeline::dependency_cycle),
        help("remove one of the `depends_on` edges between these helpers")
    )]
    DependencyCycle { kind: HelperKind, keys: Vec<String> },

    #[error("extension \"{key}\" failed to register")]
    #[diagnostic(code(pipeline::registration_failed))]
    RegistrationFailed { key: String },
}
