//! Diagnostics produced while registering and running helpers.
//!
//! Diagnostics are informational: they travel alongside a successful run
//! result and never replace an error in contract-violation cases.

use serde::Serialize;

use crate::helper::{HelperKind, HelperMode};

/// Severity level for a diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// A condition that made (or would make) the run invalid.
    Error,
    /// A suspicious registration or configuration that still runs.
    Warning,
    /// Informational message about the run.
    Info,
}

impl Severity {
    /// Returns true if this is an error severity.
    pub fn is_error(&self) -> bool {
        matches!(self, Severity::Error)
    }

    /// Returns true if this is a warning severity.
    pub fn is_warning(&self) -> bool {
        matches!(self, Severity::Warning)
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// A structured record describing an anomaly in the helper graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PipelineDiagnostic {
    /// Two helpers claim the same key and at least one of them overrides.
    Conflict {
        severity: Severity,
        key: String,
        kind: HelperKind,
        mode: HelperMode,
        /// Origins of the existing and the incoming helper, in that order.
        helpers: [String; 2],
        message: String,
    },
    /// A fragment depends on a key that no registered fragment provides.
    MissingDependency {
        key: String,
        kind: HelperKind,
        dependency: String,
        message: String,
    },
    /// A registered helper never executed during the run.
    UnusedHelper {
        key: String,
        kind: HelperKind,
        message: String,
    },
}

impl PipelineDiagnostic {
    /// Fatal collision between two override helpers.
    pub fn override_conflict(
        kind: HelperKind,
        key: impl Into<String>,
        existing: impl Into<String>,
        incoming: impl Into<String>,
    ) -> Self {
        let key = key.into();
        Self::Conflict {
            severity: Severity::Error,
            message: format!("Multiple overrides registered for helper \"{key}\"."),
            key,
            kind,
            mode: HelperMode::Override,
            helpers: [existing.into(), incoming.into()],
        }
    }

    /// Override and extend helpers mixed under one key.
    pub fn mixed_modes(
        kind: HelperKind,
        key: impl Into<String>,
        existing: impl Into<String>,
        incoming: impl Into<String>,
    ) -> Self {
        let key = key.into();
        Self::Conflict {
            severity: Severity::Warning,
            message: format!(
                "Helper \"{key}\" is registered in both extend and override mode; \
                 the override does not replace the extend helpers."
            ),
            key,
            kind,
            mode: HelperMode::Override,
            helpers: [existing.into(), incoming.into()],
        }
    }

    pub fn missing_dependency(
        kind: HelperKind,
        key: impl Into<String>,
        dependency: impl Into<String>,
    ) -> Self {
        let key = key.into();
        let dependency = dependency.into();
        Self::MissingDependency {
            message: format!("Helper \"{key}\" depends on unknown helper \"{dependency}\"."),
            key,
            kind,
            dependency,
        }
    }

    pub fn unused_helper(kind: HelperKind, key: impl Into<String>) -> Self {
        let key = key.into();
        Self::UnusedHelper {
            message: format!("{kind} \"{key}\" was registered but never executed."),
            key,
            kind,
        }
    }

    /// The severity of this diagnostic.
    pub fn severity(&self) -> Severity {
        match self {
            Self::Conflict { severity, .. } => *severity,
            Self::MissingDependency { .. } => Severity::Warning,
            Self::UnusedHelper { .. } => Severity::Info,
        }
    }

    /// The key of the helper the diagnostic is about.
    pub fn key(&self) -> &str {
        match self {
            Self::Conflict { key, .. }
            | Self::MissingDependency { key, .. }
            | Self::UnusedHelper { key, .. } => key,
        }
    }

    pub fn kind(&self) -> HelperKind {
        match self {
            Self::Conflict { kind, .. }
            | Self::MissingDependency { kind, .. }
            | Self::UnusedHelper { kind, .. } => *kind,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Conflict { message, .. }
            | Self::MissingDependency { message, .. }
            | Self::UnusedHelper { message, .. } => message,
        }
    }
}

impl std::fmt::Display for PipelineDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.severity(), self.message())
    }
}
