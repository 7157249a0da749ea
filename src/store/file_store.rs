// In: src/store/file_store.rs

use crate::error::OutputError;
use crate::file_index::EntryNumber;
use crate::store::format::{
    FileFooter, FileFormatVersion, FrameKind, FrameManifestEntry, RegistryKind, TableId,
    FILE_FORMAT_VERSION, FILE_HEADER_SIZE, FILE_MAGIC,
};
use crate::store::{StoreFactory, TableStore};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::mem;
use std::path::{Path, PathBuf};

/// A framed output file over any byte sink.
/// This implementation is stream-compatible and does not require the writer to be seekable.
#[derive(Debug)]
pub struct FrameFileStore<W: Write + Send> {
    writer: W,
    path: PathBuf,
    manifest: Vec<FrameManifestEntry>,
    entries: HashMap<TableId, EntryNumber>,
    /// Manually tracks the number of bytes written to the underlying writer.
    bytes_written: u64,
}

impl<W: Write + Send> FrameFileStore<W> {
    /// Creates the store and immediately writes the file header, so the
    /// byte counter is accurate from the start.
    pub fn new(mut writer: W, path: impl Into<PathBuf>) -> Result<Self, OutputError> {
        let path = path.into();
        writer
            .write_all(FILE_MAGIC)
            .and_then(|_| writer.write_all(&FILE_FORMAT_VERSION.to_le_bytes()))
            .map_err(|source| OutputError::FileSystemFailure { path: path.clone(), source })?;

        Ok(Self {
            writer,
            path,
            manifest: Vec::new(),
            entries: HashMap::new(),
            bytes_written: FILE_HEADER_SIZE,
        })
    }

    fn push_frame(
        &mut self,
        table: TableId,
        bytes: &[u8],
        kind: FrameKind,
    ) -> Result<EntryNumber, OutputError> {
        let offset_in_file = self.bytes_written;
        self.write_raw(bytes)?;

        let next = self.entries.entry(table).or_insert(0);
        let entry = *next;
        *next += 1;

        self.manifest.push(FrameManifestEntry {
            table,
            entry,
            offset_in_file,
            size: bytes.len() as u64,
            kind,
        });
        Ok(entry)
    }

    fn write_raw(&mut self, bytes: &[u8]) -> Result<(), OutputError> {
        self.writer
            .write_all(bytes)
            .map_err(|source| OutputError::FileSystemFailure { path: self.path.clone(), source })?;
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }

    /// Consumes the store and returns the underlying writer, footer included.
    pub fn into_inner(mut self) -> Result<W, OutputError> {
        self.write_footer()?;
        Ok(self.writer)
    }

    fn write_footer(&mut self) -> Result<(), OutputError> {
        let footer = FileFooter {
            format: FileFormatVersion::default(),
            writer_version: env!("CARGO_PKG_VERSION").to_string(),
            // Use `mem::take` for efficiency instead of `clone`.
            frames: mem::take(&mut self.manifest),
        };
        let footer_bytes = serde_json::to_vec(&footer)?;
        let footer_len = footer_bytes.len() as u64;

        self.write_raw(&footer_bytes)?;
        self.write_raw(&footer_len.to_le_bytes())?;
        self.writer
            .flush()
            .map_err(|source| OutputError::FileSystemFailure { path: self.path.clone(), source })
    }
}

impl<W: Write + Send> TableStore for FrameFileStore<W> {
    fn path(&self) -> &Path {
        &self.path
    }

    fn append_row(&mut self, table: TableId, frame: &[u8]) -> Result<EntryNumber, OutputError> {
        self.push_frame(table, frame, FrameKind::Serialized)
    }

    fn copy_segment(&mut self, table: TableId, bytes: &[u8]) -> Result<EntryNumber, OutputError> {
        self.push_frame(table, bytes, FrameKind::Copied)
    }

    fn write_registry(&mut self, kind: RegistryKind, payload: &[u8]) -> Result<(), OutputError> {
        self.push_frame(TableId::Registry(kind), payload, FrameKind::Serialized)
            .map(|_| ())
    }

    fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    fn entries(&self, table: TableId) -> u64 {
        self.entries.get(&table).copied().unwrap_or(0)
    }

    fn finish(mut self: Box<Self>) -> Result<u64, OutputError> {
        self.write_footer()?;
        Ok(self.bytes_written)
    }
}

/// Opens buffered files on the local file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStoreFactory;

impl FsStoreFactory {
    pub fn new() -> Self {
        Self
    }
}

impl StoreFactory for FsStoreFactory {
    fn create(&self, path: &Path, buffer_size: usize) -> Result<Box<dyn TableStore>, OutputError> {
        let fs_failure = |source| OutputError::FileSystemFailure {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(fs_failure)?;
        }
        let file = File::create(path).map_err(fs_failure)?;
        let writer = BufWriter::with_capacity(buffer_size.max(1), file);
        Ok(Box::new(FrameFileStore::new(writer, path)?))
    }
}
