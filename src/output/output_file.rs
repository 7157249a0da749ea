//! One physical output file while it is being written.

use crate::error::OutputError;
use crate::file_index::{EntryNumber, FileIndex};
use crate::output::catalog::FileStats;
use crate::policy::FileCounters;
use crate::range_set::RangeSet;
use crate::registry::{
    EventHistory, ProcessHistory, RangeSetRecord, RangeSetRegistry, SegmentCoverage,
};
use crate::store::{RegistryKind, TableId, TableStore};
use crate::types::{CategoryArray, RecordCategory, RecordKey};
use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;

pub struct OutputFile {
    sequence: u32,
    path: PathBuf,
    store: Box<dyn TableStore>,
    index: FileIndex,
    range_sets: RangeSetRegistry,
    event_history: EventHistory,
    /// Aggregate ranges written since the current input segment began.
    open_segment: CategoryArray<RangeSet>,
    opened: Instant,
    input_files_closed: u32,
    pub(crate) stats: FileStats,
}

impl OutputFile {
    pub fn new(sequence: u32, store: Box<dyn TableStore>) -> Self {
        Self {
            sequence,
            path: store.path().to_path_buf(),
            store,
            index: FileIndex::new(),
            range_sets: RangeSetRegistry::default(),
            event_history: EventHistory::default(),
            open_segment: CategoryArray::default(),
            opened: Instant::now(),
            input_files_closed: 0,
            stats: FileStats::new(Utc::now()),
        }
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn counters(&self) -> FileCounters {
        FileCounters {
            events: self.stats.records[RecordCategory::Event],
            size_bytes: self.store.bytes_written(),
            age: self.opened.elapsed(),
            input_files_closed: self.input_files_closed,
        }
    }

    pub fn index(&self) -> &FileIndex {
        &self.index
    }

    pub fn range_sets(&self) -> &RangeSetRegistry {
        &self.range_sets
    }

    pub fn event_history(&self) -> &EventHistory {
        &self.event_history
    }

    pub fn store(&self) -> &dyn TableStore {
        self.store.as_ref()
    }

    pub(crate) fn store_mut(&mut self) -> &mut dyn TableStore {
        self.store.as_mut()
    }

    pub fn write_registry<T: Serialize>(
        &mut self,
        kind: RegistryKind,
        value: &T,
    ) -> Result<(), OutputError> {
        let payload = serde_json::to_vec(value)?;
        self.store.write_registry(kind, &payload)
    }

    pub(crate) fn add_index_entry(
        &mut self,
        category: RecordCategory,
        key: RecordKey,
        entry: EntryNumber,
    ) -> Result<(), OutputError> {
        // The store numbers frames itself; the index must agree with it.
        let stored = self.store.entries(TableId::Records(category));
        if entry + 1 != stored {
            return Err(OutputError::IndexConsistencyFailure(format!(
                "{} table holds {} rows but the new row claims entry {}",
                category, stored, entry
            )));
        }
        self.index.add(category, key, entry)
    }

    /// Registers the range set of an aggregate record written at `entry`.
    pub(crate) fn register_range_set(
        &mut self,
        category: RecordCategory,
        entry: EntryNumber,
        ranges: RangeSet,
    ) {
        let id = self.range_sets.records.len() as u32;
        self.open_segment[category].merge(&ranges);
        self.range_sets.records.push(RangeSetRecord { id, category, entry, ranges });
    }

    /// Ties the last event written to the history it was processed under.
    pub(crate) fn record_event_history(&mut self, history: &ProcessHistory) {
        let stored = self.store.entries(TableId::Records(RecordCategory::Event));
        if let Some(entry) = stored.checked_sub(1) {
            self.event_history.record(entry, history);
        }
    }

    /// Seals what the just-closed input segment contributed to each aggregate.
    pub(crate) fn seal_segment(&mut self, input_file: u32) {
        for (category, ranges) in self.open_segment.iter_mut() {
            if !ranges.is_empty() {
                self.range_sets.segments.push(SegmentCoverage {
                    input_file,
                    category,
                    ranges: std::mem::take(ranges),
                });
            }
        }
    }

    pub(crate) fn input_file_closed(&mut self, input_file: u32) {
        self.seal_segment(input_file);
        self.input_files_closed += 1;
    }

    /// Union of every aggregate range written into the file.
    pub fn covered_ranges(&self) -> RangeSet {
        let mut all = self.range_sets.coverage(RecordCategory::SubRun);
        all.merge(&self.range_sets.coverage(RecordCategory::Run));
        all
    }

    /// Finishes the store and returns the final file size.
    pub(crate) fn finish(self) -> Result<(FileStats, u64), OutputError> {
        let OutputFile { store, stats, .. } = self;
        let size = store.finish()?;
        Ok((stats, size))
    }
}

impl std::fmt::Debug for OutputFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputFile")
            .field("sequence", &self.sequence)
            .field("path", &self.path)
            .field("index_entries", &self.index.len())
            .field("bytes_written", &self.store.bytes_written())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStoreFactory, StoreFactory};

    fn open() -> OutputFile {
        let store = MemoryStoreFactory::new().create(Path::new("f.evs"), 1024).unwrap();
        OutputFile::new(1, store)
    }

    #[test]
    fn test_segments_seal_per_input_file() {
        let mut file = open();
        file.register_range_set(RecordCategory::SubRun, 0, RangeSet::for_subrun(1, 1));
        file.register_range_set(RecordCategory::SubRun, 1, RangeSet::for_subrun(1, 2));
        file.input_file_closed(0);
        file.register_range_set(RecordCategory::SubRun, 2, RangeSet::for_subrun(1, 3));
        file.input_file_closed(1);

        let segments = &file.range_sets().segments;
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].ranges.ranges().len(), 1);
        assert!(segments[0].ranges.contains(1, 2));
        assert!(!segments[0].ranges.contains(1, 3));
        assert_eq!(file.counters().input_files_closed, 2);
        assert!(file.covered_ranges().contains(1, 3));
    }

    #[test]
    fn test_index_entry_must_match_store() {
        let mut file = open();
        let err = file
            .add_index_entry(RecordCategory::Event, RecordKey::event(1, 1, 1), 0)
            .unwrap_err();
        assert!(matches!(err, OutputError::IndexConsistencyFailure(_)));
    }

    #[test]
    fn test_event_history_follows_the_event_table() {
        let mut file = open();
        let history = ProcessHistory::default();
        file.record_event_history(&history);
        assert!(file.event_history().events.is_empty());

        let table = TableId::Records(RecordCategory::Event);
        file.store_mut().append_row(table, b"row").unwrap();
        file.store_mut().append_row(table, b"row").unwrap();
        file.record_event_history(&history);

        let events = &file.event_history().events;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].entry, 1);
        assert_eq!(file.event_history().history_of(1), Some(&history));
    }
}
