//! Appends one record to its category's table.
//!
//! Each call refreshes the column selection for the record, records its
//! provenance, then either copies the record's already-serialized row
//! verbatim (bulk segment copy) or serializes every selected column. Only
//! after the row is in the store are the index, provenance table, range
//! sets and counters updated, so an aborted record leaves no trace.

use crate::error::OutputError;
use crate::file_index::EntryNumber;
use crate::output::output_file::OutputFile;
use crate::provenance::{DropMetaData, ProductStatus, ProvenanceEntry, ProvenanceTracker};
use crate::registry::ParentageRegistry;
use crate::selection::{ColumnSelector, MissingValueStrategy, RefreshedRow};
use crate::store::row_frame::{encode_value, RowFrame};
use crate::store::TableId;
use crate::types::{CategoryArray, Record, RecordCategory};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriterState {
    #[default]
    Idle,
    Writing,
}

/// How a record's row reached the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMethod {
    Serialized,
    Copied,
}

#[derive(Debug, Clone, Copy)]
struct ActiveSegment {
    input_file: u32,
    fast_clone: bool,
}

enum PreparedRow<'a> {
    Copied(&'a [u8]),
    Serialized { frame: Vec<u8>, columns: u64 },
}

pub struct RecordWriter {
    selector: ColumnSelector,
    provenance: ProvenanceTracker,
    parentage: ParentageRegistry,
    fallback: Box<dyn MissingValueStrategy>,
    drop_metadata: DropMetaData,
    compression_level: i32,
    segment: Option<ActiveSegment>,
    state: CategoryArray<WriterState>,
}

impl RecordWriter {
    pub fn new(
        selector: ColumnSelector,
        fallback: Box<dyn MissingValueStrategy>,
        drop_metadata: DropMetaData,
        compression_level: i32,
    ) -> Self {
        Self {
            provenance: ProvenanceTracker::new(selector.provenance_widths()),
            parentage: ParentageRegistry::default(),
            selector,
            fallback,
            drop_metadata,
            compression_level,
            segment: None,
            state: CategoryArray::default(),
        }
    }

    pub fn set_fallback(&mut self, fallback: Box<dyn MissingValueStrategy>) {
        self.fallback = fallback;
    }

    pub fn selector(&self) -> &ColumnSelector {
        &self.selector
    }

    /// Every parent set referenced by provenance written so far.
    pub fn parentage(&self) -> &ParentageRegistry {
        &self.parentage
    }

    pub fn state(&self, category: RecordCategory) -> WriterState {
        self.state[category]
    }

    /// Starts a new input segment with its bulk-copy eligibility.
    pub fn begin_segment(&mut self, input_file: u32, fast_clone: bool) {
        self.segment = Some(ActiveSegment { input_file, fast_clone });
    }

    pub fn end_segment(&mut self) {
        self.segment = None;
    }

    pub fn fast_clone_active(&self) -> bool {
        self.segment.is_some_and(|s| s.fast_clone)
    }

    /// Falls back to per-column serialization for the rest of the segment.
    /// Returns whether bulk copy had been active.
    pub fn disable_fast_clone(&mut self) -> bool {
        match self.segment.as_mut() {
            Some(segment) if segment.fast_clone => {
                segment.fast_clone = false;
                true
            }
            _ => false,
        }
    }

    pub fn write_record(
        &mut self,
        file: &mut OutputFile,
        record: &Record,
    ) -> Result<WriteMethod, OutputError> {
        let category = record.category;
        if self.state[category] == WriterState::Writing {
            return Err(OutputError::InternalError(format!(
                "{} write started while another one is in progress",
                category
            )));
        }
        self.state[category] = WriterState::Writing;
        let result = self.write_inner(file, record);
        self.state[category] = WriterState::Idle;
        result
    }

    fn write_inner(
        &mut self,
        file: &mut OutputFile,
        record: &Record,
    ) -> Result<WriteMethod, OutputError> {
        let category = record.category;
        let row = self.selector.refresh(record, self.fallback.as_ref())?;
        for column in row.provenance_columns() {
            let parents = &column.descriptor.depends_on;
            let parentage = (column.status == ProductStatus::Produced && !parents.is_empty())
                .then(|| self.parentage.intern(parents));
            self.provenance
                .record_derived(category, column.descriptor.id, column.status, parentage);
        }

        let prepared = match self.copy_source(record) {
            Some(bytes) => PreparedRow::Copied(bytes),
            None => match serialize_row(&row, self.compression_level) {
                Ok(frame) => PreparedRow::Serialized {
                    frame,
                    columns: row.columns.len() as u64,
                },
                Err(e) => {
                    self.provenance.discard(category);
                    return Err(e);
                }
            },
        };

        let entry = append_row(file, category, &prepared).map_err(|e| {
            self.provenance.discard(category);
            e
        })?;
        file.add_index_entry(category, record.key, entry)?;

        let entries = self.provenance.flush(category)?;
        self.persist_provenance(file, category, entry, &entries)?;

        if category.is_aggregate() {
            if let Some(ranges) = record.effective_range_set() {
                file.register_range_set(category, entry, ranges);
            }
        }
        file.stats.observe(record);
        Ok(match prepared {
            PreparedRow::Copied(_) => {
                file.stats.rows_copied += 1;
                WriteMethod::Copied
            }
            PreparedRow::Serialized { columns, .. } => {
                file.stats.columns_serialized += columns;
                WriteMethod::Serialized
            }
        })
    }

    /// The serialized row to copy verbatim, if bulk copy applies to `record`.
    fn copy_source<'a>(&self, record: &'a Record) -> Option<&'a [u8]> {
        let segment = self.segment.filter(|s| s.fast_clone)?;
        if record.category != RecordCategory::Event {
            return None;
        }
        record
            .source
            .as_ref()
            .filter(|source| source.input_file == segment.input_file)
            .map(|source| &source.bytes[..])
    }

    fn persist_provenance(
        &self,
        file: &mut OutputFile,
        category: RecordCategory,
        entry: EntryNumber,
        entries: &[ProvenanceEntry],
    ) -> Result<(), OutputError> {
        if !self.drop_metadata.writes_table() {
            return Ok(());
        }
        let kept: Vec<&ProvenanceEntry> =
            entries.iter().filter(|e| self.drop_metadata.persists(e)).collect();
        let payload = serde_json::to_vec(&kept)?;
        let provenance_entry = file
            .store_mut()
            .append_row(TableId::Provenance(category), &payload)?;
        if provenance_entry != entry {
            return Err(OutputError::IndexConsistencyFailure(format!(
                "{} provenance landed at {} but its record at {}",
                category, provenance_entry, entry
            )));
        }
        Ok(())
    }
}

fn serialize_row(row: &RefreshedRow<'_>, compression_level: i32) -> Result<Vec<u8>, OutputError> {
    let columns = row
        .columns
        .iter()
        .map(|c| Ok((c.descriptor.id, encode_value(c.value)?)))
        .collect::<Result<Vec<_>, OutputError>>()?;
    RowFrame { columns }.to_bytes(compression_level)
}

fn append_row(
    file: &mut OutputFile,
    category: RecordCategory,
    prepared: &PreparedRow<'_>,
) -> Result<EntryNumber, OutputError> {
    let table = TableId::Records(category);
    match prepared {
        PreparedRow::Copied(bytes) => file.store_mut().copy_segment(table, bytes),
        PreparedRow::Serialized { frame, .. } => file.store_mut().append_row(table, frame),
    }
}
