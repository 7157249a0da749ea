//! Per-record provenance: how each selected column's value was obtained.

use crate::error::OutputError;
use crate::types::{CategoryArray, ColumnId, RecordCategory, ValueOrigin};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductStatus {
    /// Produced fresh by the current process.
    Produced,
    /// Retrieved from a prior file and written unchanged.
    CarriedOver,
    /// No value was supplied; a placeholder was written. Recorded so that
    /// readers can tell an intentional absence from corruption.
    Dropped,
}

impl From<ValueOrigin> for ProductStatus {
    fn from(origin: ValueOrigin) -> Self {
        match origin {
            ValueOrigin::Produced => ProductStatus::Produced,
            ValueOrigin::CarriedOver => ProductStatus::CarriedOver,
        }
    }
}

/// Index into the file's parentage registry.
pub type ParentageId = u32;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProvenanceEntry {
    pub column: ColumnId,
    pub status: ProductStatus,
    /// The parent columns this value was derived from, for produced values
    /// of columns that declare any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parentage: Option<ParentageId>,
}

/// How much provenance is persisted next to the data.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DropMetaData {
    /// Persist every entry.
    #[default]
    DropNone,
    /// Omit entries for values carried over from prior files.
    DropPrior,
    /// Persist no provenance table at all.
    DropAll,
}

impl DropMetaData {
    pub fn persists(self, entry: &ProvenanceEntry) -> bool {
        match self {
            DropMetaData::DropNone => true,
            DropMetaData::DropPrior => entry.status != ProductStatus::CarriedOver,
            DropMetaData::DropAll => false,
        }
    }

    pub fn writes_table(self) -> bool {
        self != DropMetaData::DropAll
    }
}

/// Buffers the provenance of the record currently being written.
///
/// Exactly one entry per selected, non-transient column must be recorded
/// before [`ProvenanceTracker::flush`]; any other count means the writer
/// lost track of a column.
#[derive(Debug)]
pub struct ProvenanceTracker {
    expected: CategoryArray<usize>,
    buffers: CategoryArray<Vec<ProvenanceEntry>>,
}

impl ProvenanceTracker {
    /// `expected` holds the number of selected non-transient columns per category.
    pub fn new(expected: CategoryArray<usize>) -> Self {
        Self {
            buffers: CategoryArray::from_fn(|c| Vec::with_capacity(expected[c])),
            expected,
        }
    }

    pub fn record_provenance(
        &mut self,
        category: RecordCategory,
        column: ColumnId,
        status: ProductStatus,
    ) {
        self.record_derived(category, column, status, None);
    }

    /// Like [`record_provenance`](Self::record_provenance), also naming the
    /// parentage of the value.
    pub fn record_derived(
        &mut self,
        category: RecordCategory,
        column: ColumnId,
        status: ProductStatus,
        parentage: Option<ParentageId>,
    ) {
        self.buffers[category].push(ProvenanceEntry { column, status, parentage });
    }

    /// Returns and clears the buffer for `category`.
    pub fn flush(&mut self, category: RecordCategory) -> Result<Vec<ProvenanceEntry>, OutputError> {
        let entries = std::mem::take(&mut self.buffers[category]);
        if entries.len() != self.expected[category] {
            return Err(OutputError::IndexConsistencyFailure(format!(
                "{} provenance has {} entries, expected {}",
                category,
                entries.len(),
                self.expected[category]
            )));
        }
        Ok(entries)
    }

    /// Forgets everything recorded for a record whose write was aborted.
    pub fn discard(&mut self, category: RecordCategory) {
        self.buffers[category].clear();
    }

    pub fn pending(&self, category: RecordCategory) -> usize {
        self.buffers[category].len()
    }
}
