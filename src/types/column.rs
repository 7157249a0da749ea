//! Immutable descriptions of persisted columns.

use crate::types::RecordCategory;
use arrow_schema::DataType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a column, unique across all categories of a stream.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct ColumnId(pub u32);

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Immutable description of one persisted column.
///
/// Created once at stream configuration time from the upstream schema and
/// read-only thereafter. The `name` is what selection rules match against,
/// conventionally `type_label_instance_process`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub id: ColumnId,
    pub category: RecordCategory,
    pub name: String,
    /// The Arrow type of a value in this column. Dummy values are typed nulls.
    pub data_type: DataType,
    /// Name of the process that produces this column.
    pub process_name: String,
    /// Transient (metadata-only) columns are serialized but carry no provenance.
    #[serde(default)]
    pub transient: bool,
    /// Mandatory columns may never be substituted with a dummy value.
    #[serde(default)]
    pub mandatory: bool,
    /// Columns whose values the producing process reads to make this one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<ColumnId>,
}

impl ColumnDescriptor {
    pub fn new(
        id: u32,
        category: RecordCategory,
        name: impl Into<String>,
        data_type: DataType,
    ) -> Self {
        Self {
            id: ColumnId(id),
            category,
            name: name.into(),
            data_type,
            process_name: String::new(),
            transient: false,
            mandatory: false,
            depends_on: Vec::new(),
        }
    }

    pub fn produced_by(mut self, process_name: impl Into<String>) -> Self {
        self.process_name = process_name.into();
        self
    }

    pub fn transient(mut self) -> Self {
        self.transient = true;
        self
    }

    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    pub fn derived_from(mut self, parents: impl IntoIterator<Item = ColumnId>) -> Self {
        self.depends_on = parents.into_iter().collect();
        self.depends_on.sort();
        self.depends_on.dedup();
        self
    }
}
