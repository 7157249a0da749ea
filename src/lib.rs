//! This file is the root of the `evstore` Rust crate.
//!
//! Its responsibilities are strictly limited to:
//! 1.  Declaring all the top-level modules of the library (`output`, `store`, etc.)
//!     so the Rust compiler knows they exist.
//! 2.  Re-exporting the types a caller needs to configure and drive an
//!     output stream.

//==================================================================================
// 0. Constants
//==================================================================================
/// The crate version, automatically set from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
//==================================================================================
// 1. Module Declarations
//==================================================================================
#[macro_use]
pub mod observability; // Make macros available throughout the crate

pub mod config;
pub mod error;
pub mod file_index;
pub mod inspect;
pub mod kernels;
pub mod output;
pub mod policy;
pub mod provenance;
pub mod range_set;
pub mod registry;
pub mod selection;
pub mod store;
pub mod types;

//==================================================================================
// 2. Public API
//==================================================================================
pub use config::OutputSettings;
pub use error::OutputError;
pub use output::{
    CatalogSink, ClosedFileReport, FileStatus, InputFileInfo, OutputStream, StreamContext,
    WriteMethod,
};
pub use policy::{ClosingCriteria, ClosingPolicyEvaluator, FastCloneDecisionEngine};
pub use provenance::{DropMetaData, ProductStatus, ProvenanceEntry};
pub use range_set::{RangeSet, SubRunRange};
pub use store::{FileReader, FsStoreFactory, MemoryStoreFactory, StoreFactory, TableStore};
pub use types::{ColumnDescriptor, ColumnId, Record, RecordCategory, RecordKey};
