//! The output-file writer.
//!
//! [`OutputStream`] is the entry point. It owns the current [`OutputFile`],
//! rotates it according to the closing policy and delegates each record to
//! the [`RecordWriter`]. Closed files are reported to a [`CatalogSink`].

pub mod catalog;
pub mod output_file;
pub mod record_writer;
pub mod stream;

#[cfg(test)]
mod tests;

pub use catalog::{CatalogSink, ClosedFileReport, CollectingCatalog, FileStats};
pub use output_file::OutputFile;
pub use record_writer::{RecordWriter, WriteMethod, WriterState};
pub use stream::{FileStatus, InputFileInfo, OutputStream, StreamContext};
