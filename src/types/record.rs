//! The records handed to the writer by the production pipeline.

use crate::range_set::RangeSet;
use crate::types::{ColumnId, RecordCategory};
use arrow::array::ArrayRef;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

pub type RunNumber = u32;
pub type SubRunNumber = u32;
pub type EventNumber = u64;

/// Identifies a record: a run, optionally a subrun and optionally an event.
///
/// The derived ordering (run, then subrun, then event, with `None` first)
/// is the ordering used by the file index and the lookup table.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordKey {
    pub run: RunNumber,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subrun: Option<SubRunNumber>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<EventNumber>,
}

impl RecordKey {
    pub fn run(run: RunNumber) -> Self {
        Self { run, subrun: None, event: None }
    }

    pub fn subrun(run: RunNumber, subrun: SubRunNumber) -> Self {
        Self { run, subrun: Some(subrun), event: None }
    }

    pub fn event(run: RunNumber, subrun: SubRunNumber, event: EventNumber) -> Self {
        Self { run, subrun: Some(subrun), event: Some(event) }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.run)?;
        if let Some(subrun) = self.subrun {
            write!(f, ":s{}", subrun)?;
        }
        if let Some(event) = self.event {
            write!(f, ":e{}", event)?;
        }
        Ok(())
    }
}

/// How a column value present on a record came to be there.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueOrigin {
    /// Produced by the current process for this record.
    Produced,
    /// Read from a prior file and carried over unchanged.
    CarriedOver,
}

/// A column value supplied by the pipeline.
#[derive(Debug, Clone)]
pub struct RecordProduct {
    pub value: ArrayRef,
    pub origin: ValueOrigin,
}

/// Already-serialized bytes of an event row, as read from an input file.
///
/// Only a record that still equals its on-disk form carries one; a record
/// modified after reading must drop it.
#[derive(Debug, Clone)]
pub struct SourceSegment {
    /// Sequence number of the input file this row was read from.
    pub input_file: u32,
    /// The row frame exactly as stored in the input file.
    pub bytes: Arc<[u8]>,
}

/// One record of a given category, ready to be written.
#[derive(Debug, Clone)]
pub struct Record {
    pub category: RecordCategory,
    pub key: RecordKey,
    pub products: BTreeMap<ColumnId, RecordProduct>,
    /// For SubRun and Run records: the run/subrun intervals this aggregate covers.
    pub range_set: Option<RangeSet>,
    pub source: Option<SourceSegment>,
}

impl Record {
    pub fn new(category: RecordCategory, key: RecordKey) -> Self {
        Self {
            category,
            key,
            products: BTreeMap::new(),
            range_set: None,
            source: None,
        }
    }

    pub fn event(run: RunNumber, subrun: SubRunNumber, event: EventNumber) -> Self {
        Self::new(RecordCategory::Event, RecordKey::event(run, subrun, event))
    }

    pub fn subrun(run: RunNumber, subrun: SubRunNumber) -> Self {
        Self::new(RecordCategory::SubRun, RecordKey::subrun(run, subrun))
    }

    pub fn run(run: RunNumber) -> Self {
        Self::new(RecordCategory::Run, RecordKey::run(run))
    }

    /// A file-level summary record. It belongs to no run, so its key is run 0.
    pub fn results() -> Self {
        Self::new(RecordCategory::Results, RecordKey::run(0))
    }

    /// Adds a freshly produced value.
    pub fn with_product(mut self, column: ColumnId, value: ArrayRef) -> Self {
        self.products.insert(column, RecordProduct { value, origin: ValueOrigin::Produced });
        self
    }

    /// Adds a value carried over unchanged from a prior file.
    pub fn with_carried_product(mut self, column: ColumnId, value: ArrayRef) -> Self {
        self.products.insert(column, RecordProduct { value, origin: ValueOrigin::CarriedOver });
        self
    }

    pub fn with_range_set(mut self, range_set: RangeSet) -> Self {
        self.range_set = Some(range_set);
        self
    }

    pub fn with_source(mut self, source: SourceSegment) -> Self {
        self.source = Some(source);
        self
    }

    /// The range set this aggregate claims. Without an explicit one a SubRun
    /// record covers its own subrun and a Run record its whole run.
    pub fn effective_range_set(&self) -> Option<RangeSet> {
        match (&self.range_set, self.category, self.key.subrun) {
            (Some(rs), _, _) => Some(rs.clone()),
            (None, RecordCategory::SubRun, Some(subrun)) => {
                Some(RangeSet::for_subrun(self.key.run, subrun))
            }
            (None, RecordCategory::Run, _) => Some(RangeSet::for_run(self.key.run)),
            _ => None,
        }
    }
}
