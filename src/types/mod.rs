//! This module defines the core, strongly-typed data representations shared
//! by every layer of the writer: record categories, column descriptors and the
//! records handed over by the production pipeline.

pub mod category;
pub mod column;
pub mod record;

// Re-export the main types for easier access.
pub use category::{CategoryArray, RecordCategory};
pub use column::{ColumnDescriptor, ColumnId};
pub use record::{
    EventNumber, Record, RecordKey, RecordProduct, RunNumber, SourceSegment, SubRunNumber,
    ValueOrigin,
};
