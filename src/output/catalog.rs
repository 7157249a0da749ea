//! What the writer reports about every file it closes.

use crate::error::OutputError;
use crate::policy::ClosureRequestMode;
use crate::range_set::RangeSet;
use crate::registry::CatalogMetadata;
use crate::types::{CategoryArray, Record, RecordCategory, RecordKey, RunNumber, SubRunNumber};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

/// Running statistics of one output file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FileStats {
    pub first_event: Option<RecordKey>,
    pub last_event: Option<RecordKey>,
    pub records: CategoryArray<u64>,
    pub runs: BTreeSet<RunNumber>,
    pub subruns: BTreeSet<(RunNumber, SubRunNumber)>,
    pub input_files: Vec<String>,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    /// Column values serialized one by one.
    pub columns_serialized: u64,
    /// Event rows copied verbatim from an input file.
    pub rows_copied: u64,
    /// Rotations that interrupted a segment being bulk-copied.
    pub rotation_conflicts: u32,
}

impl FileStats {
    pub fn new(opened_at: DateTime<Utc>) -> Self {
        Self {
            first_event: None,
            last_event: None,
            records: CategoryArray::default(),
            runs: BTreeSet::new(),
            subruns: BTreeSet::new(),
            input_files: Vec::new(),
            opened_at,
            closed_at: None,
            columns_serialized: 0,
            rows_copied: 0,
            rotation_conflicts: 0,
        }
    }

    pub fn observe(&mut self, record: &Record) {
        self.records[record.category] += 1;
        if record.category == RecordCategory::Results {
            return;
        }
        self.runs.insert(record.key.run);
        if let Some(subrun) = record.key.subrun {
            self.subruns.insert((record.key.run, subrun));
        }
        if record.category == RecordCategory::Event {
            self.first_event.get_or_insert(record.key);
            self.last_event = Some(record.key);
        }
    }

    pub fn note_input_file(&mut self, name: &str) {
        if !self.input_files.iter().any(|n| n == name) {
            self.input_files.push(name.to_string());
        }
    }

    pub fn events(&self) -> u64 {
        self.records[RecordCategory::Event]
    }

    /// The flat key/value view handed to the catalog.
    pub fn to_metadata(&self) -> Vec<(String, String)> {
        let mut out = vec![
            ("event_count".to_string(), self.events().to_string()),
            ("subrun_records".to_string(), self.records[RecordCategory::SubRun].to_string()),
            ("run_records".to_string(), self.records[RecordCategory::Run].to_string()),
            ("start_time".to_string(), self.opened_at.to_rfc3339()),
        ];
        if let Some(closed) = self.closed_at {
            out.push(("end_time".to_string(), closed.to_rfc3339()));
        }
        if let (Some(first), Some(last)) = (self.first_event, self.last_event) {
            out.push(("first_event".to_string(), first.to_string()));
            out.push(("last_event".to_string(), last.to_string()));
        }
        let runs: Vec<String> = self.runs.iter().map(|r| r.to_string()).collect();
        out.push(("runs".to_string(), runs.join(",")));
        if !self.input_files.is_empty() {
            out.push(("parents".to_string(), self.input_files.join(",")));
        }
        out
    }
}

/// Everything the catalog learns about a finalized file.
#[derive(Debug, Clone)]
pub struct ClosedFileReport {
    pub path: PathBuf,
    pub sequence: u32,
    pub reason: ClosureRequestMode,
    pub metadata: CatalogMetadata,
    pub event_count: u64,
    pub size_bytes: u64,
    /// Union of the ranges of all SubRun and Run records in the file.
    pub ranges: RangeSet,
    pub stats: FileStats,
}

/// Receives a report for every file the stream closes.
pub trait CatalogSink: Send {
    fn file_closed(&mut self, report: &ClosedFileReport) -> Result<(), OutputError>;
}

/// Keeps every report in memory. Clones share the same list.
#[derive(Debug, Clone, Default)]
pub struct CollectingCatalog {
    reports: Arc<Mutex<Vec<ClosedFileReport>>>,
}

impl CollectingCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<ClosedFileReport> {
        self.reports.lock().clone()
    }
}

impl CatalogSink for CollectingCatalog {
    fn file_closed(&mut self, report: &ClosedFileReport) -> Result<(), OutputError> {
        self.reports.lock().push(report.clone());
        Ok(())
    }
}
