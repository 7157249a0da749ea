//! Payloads of the registry tables written into every file.

use crate::file_index::EntryNumber;
use crate::provenance::ParentageId;
use crate::range_set::RangeSet;
use crate::store::format::FileFormatVersion;
use crate::types::{CategoryArray, ColumnDescriptor, ColumnId, RecordCategory};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Contents of the format-version registry.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FormatRecord {
    pub format: FileFormatVersion,
    pub writer_version: String,
    pub split_level: u32,
}

/// Column descriptors persisted per category.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaRegistry {
    pub columns: CategoryArray<Vec<ColumnDescriptor>>,
}

/// One processing step that contributed to the data in a file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProcessConfiguration {
    pub process_name: String,
    pub release_version: String,
    /// Key into the [`ParameterSetRegistry`].
    pub parameter_set_id: String,
}

/// Processing steps in chronological order.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessHistory {
    pub processes: Vec<ProcessConfiguration>,
}

impl ProcessHistory {
    /// Identifies the history by its process names, oldest first, e.g. `gen/sim/reco`.
    pub fn id(&self) -> String {
        self.processes
            .iter()
            .map(|p| p.process_name.as_str())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Appends the steps of `other` not already present (matched by process name).
    pub fn merge(&mut self, other: &ProcessHistory) {
        for process in &other.processes {
            if !self.processes.iter().any(|p| p.process_name == process.process_name) {
                self.processes.push(process.clone());
            }
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ParameterSetRegistry {
    pub sets: BTreeMap<String, serde_json::Value>,
}

impl ParameterSetRegistry {
    pub fn merge(&mut self, other: &ParameterSetRegistry) {
        for (id, pset) in &other.sets {
            self.sets.entry(id.clone()).or_insert_with(|| pset.clone());
        }
    }
}

/// The range set claimed by one written aggregate record.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RangeSetRecord {
    pub id: u32,
    pub category: RecordCategory,
    /// Position of the record in its category's table.
    pub entry: EntryNumber,
    pub ranges: RangeSet,
}

/// Everything an input segment contributed to one aggregate category,
/// sealed when that input file closed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SegmentCoverage {
    pub input_file: u32,
    pub category: RecordCategory,
    pub ranges: RangeSet,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeSetRegistry {
    pub records: Vec<RangeSetRecord>,
    pub segments: Vec<SegmentCoverage>,
}

impl RangeSetRegistry {
    /// Union of all ranges of `category` written into the file.
    pub fn coverage(&self, category: RecordCategory) -> RangeSet {
        let mut out = RangeSet::new();
        for record in self.records.iter().filter(|r| r.category == category) {
            out.merge(&record.ranges);
        }
        out
    }
}

/// Distinct sets of parent columns, referenced by provenance entries.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ParentageRegistry {
    parents: Vec<Vec<ColumnId>>,
}

impl ParentageRegistry {
    /// The id of `parents`, registering the set on first use.
    pub fn intern(&mut self, parents: &[ColumnId]) -> ParentageId {
        if let Some(pos) = self.parents.iter().position(|p| p.as_slice() == parents) {
            return pos as ParentageId;
        }
        self.parents.push(parents.to_vec());
        (self.parents.len() - 1) as ParentageId
    }

    pub fn get(&self, id: ParentageId) -> Option<&[ColumnId]> {
        self.parents.get(id as usize).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProductDependency {
    pub column: ColumnId,
    pub depends_on: Vec<ColumnId>,
}

/// The declared inputs of every persisted column that has any.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductDependencies {
    pub dependencies: Vec<ProductDependency>,
}

impl ProductDependencies {
    pub fn of(&self, column: ColumnId) -> &[ColumnId] {
        self.dependencies
            .iter()
            .find(|d| d.column == column)
            .map_or(&[][..], |d| d.depends_on.as_slice())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EventHistoryEntry {
    /// Position of the event in the Event table.
    pub entry: EntryNumber,
    pub history_id: String,
}

/// The processing history each event of a file went through.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct EventHistory {
    pub histories: BTreeMap<String, ProcessHistory>,
    pub events: Vec<EventHistoryEntry>,
}

impl EventHistory {
    pub fn record(&mut self, entry: EntryNumber, history: &ProcessHistory) {
        let history_id = history.id();
        if !self.histories.contains_key(&history_id) {
            self.histories.insert(history_id.clone(), history.clone());
        }
        self.events.push(EventHistoryEntry { entry, history_id });
    }

    /// The history of the event stored at `entry`.
    pub fn history_of(&self, entry: EntryNumber) -> Option<&ProcessHistory> {
        self.events
            .iter()
            .find(|e| e.entry == entry)
            .and_then(|e| self.histories.get(&e.history_id))
    }
}

/// Flat descriptive key/value pairs for the file catalog.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogMetadata {
    pub entries: Vec<(String, String)>,
}

impl CatalogMetadata {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }
}
