// In: src/store/format.rs

//! Defines all on-disk structures and constants for the evstore file format.
//! This is the single source of truth for the file-level container: a fixed
//! header, a body of frames, a JSON footer with the frame manifest and a
//! trailing little-endian footer length.

use crate::file_index::EntryNumber;
use crate::types::RecordCategory;
use serde::{Deserialize, Serialize};
use std::fmt;

//==================================================================================
// I. File-Level Constants
//==================================================================================

/// The magic number to identify the start of an evstore file.
pub const FILE_MAGIC: &[u8; 4] = b"EVSF";
/// The current version of the evstore file format.
pub const FILE_FORMAT_VERSION: u16 = 1;
/// Names the family of layouts a version number belongs to.
pub const FILE_FORMAT_ERA: &str = "EVSTORE_2026a";
/// Size of the fixed header: magic(4) + version(2).
pub const FILE_HEADER_SIZE: u64 = 6;

//==================================================================================
// II. Tables and Frames
//==================================================================================

/// The registries written into every file.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum RegistryKind {
    FormatVersion,
    Schema,
    ProcessHistory,
    ParameterSets,
    RangeSets,
    FileIndex,
    LookupIndex,
    CatalogMetadata,
    Parentage,
    ProductDependencies,
    EventHistory,
}

/// The logical table a frame belongs to.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableId {
    Records(RecordCategory),
    Provenance(RecordCategory),
    Registry(RegistryKind),
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableId::Records(c) => write!(f, "{}s", c),
            TableId::Provenance(c) => write!(f, "{}Provenance", c),
            TableId::Registry(k) => write!(f, "{:?}Registry", k),
        }
    }
}

/// How the bytes of a frame were produced.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Serialized column by column by this writer.
    Serialized,
    /// Copied verbatim from an input file.
    Copied,
}

/// Location of one frame in the file body.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FrameManifestEntry {
    pub table: TableId,
    /// Position of the frame within its table.
    pub entry: EntryNumber,
    pub offset_in_file: u64,
    pub size: u64,
    pub kind: FrameKind,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FileFormatVersion {
    pub value: u16,
    pub era: String,
}

impl Default for FileFormatVersion {
    fn default() -> Self {
        Self { value: FILE_FORMAT_VERSION, era: FILE_FORMAT_ERA.to_string() }
    }
}

/// The file footer.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FileFooter {
    pub format: FileFormatVersion,
    pub writer_version: String,
    pub frames: Vec<FrameManifestEntry>,
}
