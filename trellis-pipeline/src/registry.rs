//! Per-surface helper storage and the override conflict guard.

use crate::{
    diagnostic::PipelineDiagnostic,
    error::PipelineError,
    helper::{Described, HelperDescriptor, HelperKind, HelperMode},
};

/// A helper together with its registration index on its surface.
pub(crate) struct Registered<T> {
    pub(crate) helper: T,
    pub(crate) index: usize,
}

impl<T: Described> Registered<T> {
    pub(crate) fn descriptor(&self) -> &HelperDescriptor {
        self.helper.descriptor()
    }

    pub(crate) fn key(&self) -> &str {
        &self.helper.descriptor().key
    }
}

/// Result of checking a descriptor against already registered helpers.
#[derive(Debug)]
pub(crate) enum Admission {
    Accepted,
    /// Accepted, but override and extend helpers now share a key.
    AcceptedWithWarning(PipelineDiagnostic),
    Rejected(PipelineError, PipelineDiagnostic),
}

pub(crate) struct Registry<T> {
    kind: HelperKind,
    entries: Vec<Registered<T>>,
}

impl<T: Described> Registry<T> {
    pub(crate) fn new(kind: HelperKind) -> Self {
        Self {
            kind,
            entries: Vec::new(),
        }
    }

    pub(crate) fn kind(&self) -> HelperKind {
        self.kind
    }

    /// Entries in registration order.
    pub(crate) fn entries(&self) -> &[Registered<T>] {
        &self.entries
    }

    pub(crate) fn admit(&self, incoming: &HelperDescriptor) -> Admission {
        let mut same_key = self
            .entries
            .iter()
            .map(Registered::descriptor)
            .filter(|existing| existing.key == incoming.key);

        match incoming.mode {
            HelperMode::Override => {
                let same_key: Vec<&HelperDescriptor> = same_key.collect();
                if let Some(existing) = same_key
                    .iter()
                    .find(|existing| existing.mode == HelperMode::Override)
                {
                    let error = PipelineError::OverrideConflict {
                        key: incoming.key.clone(),
                        kind: self.kind,
                        existing: existing.origin_or_key().to_string(),
                        incoming: incoming.origin_or_key().to_string(),
                    };
                    let diagnostic = PipelineDiagnostic::override_conflict(
                        self.kind,
                        &incoming.key,
                        existing.origin_or_key(),
                        incoming.origin_or_key(),
                    );
                    return Admission::Rejected(error, diagnostic);
                }
                match same_key.first() {
                    Some(existing) => Admission::AcceptedWithWarning(
                        PipelineDiagnostic::mixed_modes(
                            self.kind,
                            &incoming.key,
                            existing.origin_or_key(),
                            incoming.origin_or_key(),
                        ),
                    ),
                    None => Admission::Accepted,
                }
            }
            HelperMode::Extend => {
                match same_key.find(|existing| existing.mode == HelperMode::Override) {
                    Some(existing) => Admission::AcceptedWithWarning(
                        PipelineDiagnostic::mixed_modes(
                            self.kind,
                            &incoming.key,
                            existing.origin_or_key(),
                            incoming.origin_or_key(),
                        ),
                    ),
                    None => Admission::Accepted,
                }
            }
        }
    }

    /// Append a helper, returning its registration index.
    pub(crate) fn push(&mut self, helper: T) -> usize {
        let index = self.entries.len();
        self.entries.push(Registered { helper, index });
        index
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Drop every helper registered after the first `len`.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.entries.truncate(len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Stub(HelperDescriptor);

    impl Described for Stub {
        fn descriptor(&self) -> &HelperDescriptor {
            &self.0
        }
    }

    fn stub(key: &str, mode: HelperMode, origin: &str) -> HelperDescriptor {
        let mut descriptor = HelperDescriptor::new(key, HelperKind::Fragment);
        descriptor.mode = mode;
        descriptor.origin = Some(origin.into());
        descriptor
    }

    #[test]
    fn test_extend_duplicates_are_accepted() {
        let mut registry = Registry::new(HelperKind::Fragment);
        let first = stub("ir.collection", HelperMode::Extend, "a");
        let second = stub("ir.collection", HelperMode::Extend, "b");
        assert!(matches!(registry.admit(&first), Admission::Accepted));
        registry.push(Stub(first));
        assert!(matches!(registry.admit(&second), Admission::Accepted));
        assert_eq!(registry.push(Stub(second)), 1);
    }

    #[test]
    fn test_second_override_is_rejected_with_both_origins() {
        let mut registry = Registry::new(HelperKind::Fragment);
        registry.push(Stub(stub("ir.meta", HelperMode::Override, "core")));

        let admission = registry.admit(&stub("ir.meta", HelperMode::Override, "plugin"));
        let Admission::Rejected(error, diagnostic) = admission else {
            panic!("expected rejection");
        };
        assert!(matches!(
            error,
            PipelineError::OverrideConflict { ref existing, ref incoming, .. }
                if existing == "core" && incoming == "plugin"
        ));
        assert!(diagnostic.severity().is_error());
    }

    #[test]
    fn test_mixed_modes_warn() {
        let mut registry = Registry::new(HelperKind::Fragment);
        registry.push(Stub(stub("ir.meta", HelperMode::Extend, "core")));

        let admission = registry.admit(&stub("ir.meta", HelperMode::Override, "plugin"));
        assert!(matches!(admission, Admission::AcceptedWithWarning(d) if d.severity().is_warning()));
    }
}
