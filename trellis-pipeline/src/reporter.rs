//! Hierarchical reporter handed to every helper.

use std::{fmt, sync::Arc};

use tracing::Level;

/// A message captured by a [`ReportSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRecord {
    pub level: Level,
    pub namespace: String,
    pub message: String,
    /// Debug rendering of the structured context, if any.
    pub context: Option<String>,
}

/// Receives every message a reporter emits, in addition to `tracing`.
pub trait ReportSink: Send + Sync {
    fn record(&self, record: ReportRecord);
}

/// A cheap, clonable logging handle with a dotted namespace.
///
/// Every message becomes a `tracing` event carrying a `namespace` field. An
/// optional sink mirrors the messages so hosts can collect them.
#[derive(Clone)]
pub struct Reporter {
    namespace: Arc<str>,
    sink: Option<Arc<dyn ReportSink>>,
}

impl Reporter {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: Arc::from(namespace.into()),
            sink: None,
        }
    }

    /// Mirror messages from this reporter and all of its children into `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// A reporter namespaced under this one (`parent.name`).
    pub fn child(&self, name: &str) -> Self {
        let namespace = if self.namespace.is_empty() {
            name.to_string()
        } else {
            format!("{}.{name}", self.namespace)
        };
        Self {
            namespace: Arc::from(namespace),
            sink: self.sink.clone(),
        }
    }

    pub fn debug(&self, message: impl fmt::Display) {
        let message = message.to_string();
        tracing::debug!(namespace = %self.namespace, "{message}");
        self.forward(Level::DEBUG, message, None);
    }

    pub fn info(&self, message: impl fmt::Display) {
        let message = message.to_string();
        tracing::info!(namespace = %self.namespace, "{message}");
        self.forward(Level::INFO, message, None);
    }

    pub fn warn(&self, message: impl fmt::Display) {
        let message = message.to_string();
        tracing::warn!(namespace = %self.namespace, "{message}");
        self.forward(Level::WARN, message, None);
    }

    pub fn error(&self, message: impl fmt::Display) {
        let message = message.to_string();
        tracing::error!(namespace = %self.namespace, "{message}");
        self.forward(Level::ERROR, message, None);
    }

    /// Warn with structured context attached.
    pub fn warn_with(&self, message: impl fmt::Display, context: &dyn fmt::Debug) {
        let message = message.to_string();
        let context = format!("{context:?}");
        tracing::warn!(namespace = %self.namespace, context = %context, "{message}");
        self.forward(Level::WARN, message, Some(context));
    }

    fn forward(&self, level: Level, message: String, context: Option<String>) {
        if let Some(sink) = &self.sink {
            sink.record(ReportRecord {
                level,
                namespace: self.namespace.to_string(),
                message,
                context,
            });
        }
    }
}

impl fmt::Debug for Reporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reporter")
            .field("namespace", &self.namespace)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::testing::MemorySink;

    #[test]
    fn test_child_namespaces_are_dotted() {
        let reporter = Reporter::new("trellis").child("pipeline").child("fragment");
        assert_eq!(reporter.namespace(), "trellis.pipeline.fragment");
    }

    #[test]
    fn test_child_of_empty_namespace() {
        assert_eq!(Reporter::new("").child("cli").namespace(), "cli");
    }

    #[test]
    fn test_sink_is_shared_with_children() {
        let sink = Arc::new(MemorySink::default());
        let reporter = Reporter::new("trellis").with_sink(sink.clone());
        reporter.child("builder").warn("slow builder");
        reporter.warn_with("rollback failed", &["a", "b"]);

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].namespace, "trellis.builder");
        assert_eq!(records[0].level, Level::WARN);
        assert_eq!(records[1].context.as_deref(), Some("[\"a\", \"b\"]"));
    }
}
