// ====================================================================================
// ARCHITECTURAL OVERVIEW: The Store Layer
// ====================================================================================
//
// The store is the columnar storage backend the writer persists into. The
// writer only ever talks to it through two traits:
//
//   [StoreFactory]  -> opens one [TableStore] per output file path
//   [TableStore]    -> row-append and segment-copy primitives, registries,
//                      a running byte count and a final `finish`
//
// Data Flow (writing):
//
//   1. [RecordWriter]  -> serializes a row into a `RowFrame` (or takes the
//                         source frame verbatim for a bulk copy)
//         |
//         `-> append_row / copy_segment ->
//
//   2. [FrameFileStore] -> writes the frame, records it in the manifest
//
//   3. finish()         -> writes the JSON footer and its length
//
// Data Flow (reading): [FileReader] validates header and footer, then reads
// frames by (table, entry) through the manifest.
//
// ====================================================================================
pub mod file_store;
pub mod format;
pub mod memory;
pub mod reader;
pub mod row_frame;

pub use file_store::{FrameFileStore, FsStoreFactory};
pub use format::{FrameKind, RegistryKind, TableId};
pub use memory::MemoryStoreFactory;
pub use reader::FileReader;
pub use row_frame::RowFrame;

use crate::error::OutputError;
use crate::file_index::EntryNumber;
use std::path::Path;

/// One open output file in the storage backend.
pub trait TableStore: Send {
    fn path(&self) -> &Path;

    /// Appends a row serialized by the writer; returns its position in `table`.
    fn append_row(&mut self, table: TableId, frame: &[u8]) -> Result<EntryNumber, OutputError>;

    /// Appends already-serialized bytes from an input file verbatim.
    fn copy_segment(&mut self, table: TableId, bytes: &[u8]) -> Result<EntryNumber, OutputError>;

    fn write_registry(&mut self, kind: RegistryKind, payload: &[u8]) -> Result<(), OutputError>;

    /// Bytes written so far, including the header.
    fn bytes_written(&self) -> u64;

    /// Number of frames appended to `table` so far.
    fn entries(&self, table: TableId) -> u64;

    /// Writes the footer and flushes. Returns the final file size.
    fn finish(self: Box<Self>) -> Result<u64, OutputError>;
}

/// Opens stores for new output files.
pub trait StoreFactory: Send + Sync {
    /// `buffer_size` is the number of bytes the store may hold back before
    /// they reach the underlying medium.
    fn create(&self, path: &Path, buffer_size: usize) -> Result<Box<dyn TableStore>, OutputError>;
}
