//! What to write when a selected column has no value on a record.

use crate::types::{ColumnDescriptor, ColumnId};
use arrow::array::{new_null_array, ArrayRef};
use hashbrown::HashMap;

/// Supplies a stand-in for a missing column value, or refuses to.
///
/// Returning `None` makes the record write fail with
/// `OutputError::MissingMandatoryColumn`.
pub trait MissingValueStrategy: Send + Sync {
    fn substitute(&self, column: &ColumnDescriptor) -> Option<&ArrayRef>;
}

/// Typed single-row null placeholders, one per selectable column.
///
/// Built once up front so that filling a gap never re-invokes production.
/// Mandatory columns are never substituted.
#[derive(Debug, Default)]
pub struct DummyValueCache {
    values: HashMap<ColumnId, ArrayRef>,
}

impl DummyValueCache {
    pub fn for_columns<'a>(columns: impl IntoIterator<Item = &'a ColumnDescriptor>) -> Self {
        let values = columns
            .into_iter()
            .map(|c| (c.id, new_null_array(&c.data_type, 1)))
            .collect();
        Self { values }
    }

    pub fn get(&self, column: ColumnId) -> Option<&ArrayRef> {
        self.values.get(&column)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl MissingValueStrategy for DummyValueCache {
    fn substitute(&self, column: &ColumnDescriptor) -> Option<&ArrayRef> {
        if column.mandatory {
            None
        } else {
            self.values.get(&column.id)
        }
    }
}

/// Treats every selected column as mandatory.
#[derive(Debug, Default, Clone, Copy)]
pub struct StrictMode;

impl MissingValueStrategy for StrictMode {
    fn substitute(&self, _column: &ColumnDescriptor) -> Option<&ArrayRef> {
        None
    }
}
