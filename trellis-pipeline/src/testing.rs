//! Test utilities for hosts built on the pipeline.
//!
//! This module is only available when the `testing` feature is enabled
//! or during tests.

use std::sync::{Mutex, PoisonError};

use crate::reporter::{ReportRecord, ReportSink};

/// A [`ReportSink`] that keeps every record in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<ReportRecord>>,
}

impl MemorySink {
    /// A copy of everything recorded so far.
    pub fn records(&self) -> Vec<ReportRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Messages recorded so far, without level or namespace.
    pub fn messages(&self) -> Vec<String> {
        self.records().into_iter().map(|r| r.message).collect()
    }
}

impl ReportSink for MemorySink {
    fn record(&self, record: ReportRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }
}
