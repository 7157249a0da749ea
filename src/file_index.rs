//! Where every record of a file landed, in write order.

use crate::error::OutputError;
use crate::types::{CategoryArray, RecordCategory, RecordKey};
use serde::{Deserialize, Serialize};

/// Position of a record inside its category's table.
pub type EntryNumber = u64;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileIndexEntry {
    pub category: RecordCategory,
    pub key: RecordKey,
    pub entry: EntryNumber,
}

/// The per-file record index.
///
/// Entries are kept in write order. Within one category the `entry`
/// positions must be strictly increasing; anything else means the tables
/// and the index disagree.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct FileIndex {
    entries: Vec<FileIndexEntry>,
    #[serde(skip)]
    last_entry: CategoryArray<Option<EntryNumber>>,
}

impl FileIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &mut self,
        category: RecordCategory,
        key: RecordKey,
        entry: EntryNumber,
    ) -> Result<(), OutputError> {
        if let Some(last) = self.last_entry[category] {
            if entry <= last {
                return Err(OutputError::IndexConsistencyFailure(format!(
                    "{} entry {} for {} does not follow entry {}",
                    category, entry, key, last
                )));
            }
        }
        self.last_entry[category] = Some(entry);
        self.entries.push(FileIndexEntry { category, key, entry });
        Ok(())
    }

    pub fn entries(&self) -> &[FileIndexEntry] {
        &self.entries
    }

    pub fn entries_for(&self, category: RecordCategory) -> impl Iterator<Item = &FileIndexEntry> {
        self.entries.iter().filter(move |e| e.category == category)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Builds the sorted secondary lookup table for this index.
    pub fn lookup_table(&self) -> LookupTable {
        let mut rows: Vec<LookupRow> = self
            .entries
            .iter()
            .map(|e| LookupRow { key: e.key, category: e.category, entry: e.entry })
            .collect();
        rows.sort_by_key(|r| (r.key, r.category));
        LookupTable { rows }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupRow {
    pub key: RecordKey,
    pub category: RecordCategory,
    pub entry: EntryNumber,
}

/// Records sorted by run/subrun/event for random access after closing.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupTable {
    rows: Vec<LookupRow>,
}

impl LookupTable {
    pub fn find(&self, category: RecordCategory, key: &RecordKey) -> Option<EntryNumber> {
        self.rows
            .binary_search_by(|r| (r.key, r.category).cmp(&(*key, category)))
            .ok()
            .map(|i| self.rows[i].entry)
    }

    pub fn rows(&self) -> &[LookupRow] {
        &self.rows
    }
}
