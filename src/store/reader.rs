// In: src/store/reader.rs

use crate::error::OutputError;
use crate::file_index::{EntryNumber, FileIndex, LookupTable};
use crate::provenance::ProvenanceEntry;
use crate::registry::{
    CatalogMetadata, EventHistory, ParameterSetRegistry, ParentageRegistry, ProcessHistory,
    ProductDependencies, RangeSetRegistry, SchemaRegistry,
};
use crate::store::format::{
    FileFooter, FileFormatVersion, FrameManifestEntry, RegistryKind, TableId, FILE_FORMAT_VERSION,
    FILE_HEADER_SIZE, FILE_MAGIC,
};
use crate::store::row_frame::RowFrame;
use crate::types::{ColumnId, RecordCategory, SourceSegment};
use arrow::array::ArrayRef;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::io::{Read, Seek, SeekFrom};
use std::sync::Arc;

/// Reads a closed output file back: validates the container, then gives
/// random access to frames through the footer manifest.
#[derive(Debug)]
pub struct FileReader<R: Read + Seek> {
    source: R,
    footer: FileFooter,
    by_table: HashMap<TableId, Vec<usize>>,
}

impl<R: Read + Seek> FileReader<R> {
    pub fn new(mut source: R) -> Result<Self, OutputError> {
        let total_len = source.seek(SeekFrom::End(0))?;
        if total_len < FILE_HEADER_SIZE + 8 {
            return Err(OutputError::FrameFormatError(format!(
                "File is too small to be valid: {} bytes",
                total_len
            )));
        }

        source.seek(SeekFrom::Start(0))?;
        let mut header = [0u8; FILE_HEADER_SIZE as usize];
        source.read_exact(&mut header)?;
        if &header[0..4] != FILE_MAGIC {
            return Err(OutputError::FrameFormatError("Invalid file magic number".into()));
        }
        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != FILE_FORMAT_VERSION {
            return Err(OutputError::FrameFormatError(format!(
                "Unsupported file format version: expected {}, got {}",
                FILE_FORMAT_VERSION, version
            )));
        }

        source.seek(SeekFrom::End(-8))?;
        let mut u64_buf = [0u8; 8];
        source.read_exact(&mut u64_buf)?;
        let footer_len = u64::from_le_bytes(u64_buf);
        // SECURITY: the footer must fit between header and trailer.
        if footer_len > total_len - FILE_HEADER_SIZE - 8 {
            return Err(OutputError::FrameFormatError(format!(
                "Declared footer length ({}) exceeds file size",
                footer_len
            )));
        }
        let footer_start = total_len - 8 - footer_len;
        source.seek(SeekFrom::Start(footer_start))?;
        let mut footer_bytes = vec![0; footer_len as usize];
        source.read_exact(&mut footer_bytes)?;
        let footer: FileFooter = serde_json::from_slice(&footer_bytes)?;

        let mut by_table: HashMap<TableId, Vec<usize>> = HashMap::new();
        for (i, frame) in footer.frames.iter().enumerate() {
            // SECURITY: offsets come from the footer and may be forged.
            let frame_end = frame.offset_in_file.checked_add(frame.size);
            if frame.offset_in_file < FILE_HEADER_SIZE
                || frame_end.map_or(true, |end| end > footer_start)
            {
                return Err(OutputError::FrameFormatError(format!(
                    "Frame {} of {} lies outside the file body",
                    frame.entry, frame.table
                )));
            }
            by_table.entry(frame.table).or_default().push(i);
        }
        for indices in by_table.values_mut() {
            indices.sort_by_key(|&i| footer.frames[i].entry);
        }

        Ok(Self { source, footer, by_table })
    }

    pub fn format_version(&self) -> &FileFormatVersion {
        &self.footer.format
    }

    pub fn writer_version(&self) -> &str {
        &self.footer.writer_version
    }

    /// Manifest entries of `table`, ordered by entry number.
    pub fn frames(&self, table: TableId) -> Vec<&FrameManifestEntry> {
        self.by_table
            .get(&table)
            .map(|indices| indices.iter().map(|&i| &self.footer.frames[i]).collect())
            .unwrap_or_default()
    }

    pub fn entry_count(&self, table: TableId) -> u64 {
        self.by_table.get(&table).map_or(0, |v| v.len() as u64)
    }

    fn manifest_entry(
        &self,
        table: TableId,
        entry: EntryNumber,
    ) -> Result<FrameManifestEntry, OutputError> {
        self.by_table
            .get(&table)
            .and_then(|indices| indices.get(entry as usize))
            .map(|&i| self.footer.frames[i].clone())
            .ok_or_else(|| {
                OutputError::FrameFormatError(format!("No entry {} in table {}", entry, table))
            })
    }

    /// The raw bytes of one frame.
    pub fn read_frame(
        &mut self,
        table: TableId,
        entry: EntryNumber,
    ) -> Result<Vec<u8>, OutputError> {
        let info = self.manifest_entry(table, entry)?;
        self.source.seek(SeekFrom::Start(info.offset_in_file))?;
        let mut buf = vec![0; info.size as usize];
        self.source.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Decodes one record row of `category`.
    pub fn read_row(
        &mut self,
        category: RecordCategory,
        entry: EntryNumber,
    ) -> Result<Vec<(ColumnId, ArrayRef)>, OutputError> {
        let bytes = self.read_frame(TableId::Records(category), entry)?;
        RowFrame::from_bytes(&bytes)?.decode_values()
    }

    /// The stored provenance of one record, if the file carries a provenance table.
    pub fn provenance(
        &mut self,
        category: RecordCategory,
        entry: EntryNumber,
    ) -> Result<Option<Vec<ProvenanceEntry>>, OutputError> {
        if self.entry_count(TableId::Provenance(category)) == 0 {
            return Ok(None);
        }
        let bytes = self.read_frame(TableId::Provenance(category), entry)?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// An event row packaged for bulk copy into another output file.
    pub fn source_segment(
        &mut self,
        entry: EntryNumber,
        input_file: u32,
    ) -> Result<SourceSegment, OutputError> {
        let bytes = self.read_frame(TableId::Records(RecordCategory::Event), entry)?;
        Ok(SourceSegment { input_file, bytes: Arc::from(bytes) })
    }

    /// Deserializes the payload of a registry table.
    pub fn registry<T: DeserializeOwned>(
        &mut self,
        kind: RegistryKind,
    ) -> Result<Option<T>, OutputError> {
        if self.entry_count(TableId::Registry(kind)) == 0 {
            return Ok(None);
        }
        let bytes = self.read_frame(TableId::Registry(kind), 0)?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    fn required_registry<T: DeserializeOwned>(
        &mut self,
        kind: RegistryKind,
    ) -> Result<T, OutputError> {
        self.registry(kind)?.ok_or_else(|| {
            OutputError::FrameFormatError(format!("File has no {:?} registry", kind))
        })
    }

    pub fn schema(&mut self) -> Result<SchemaRegistry, OutputError> {
        self.required_registry(RegistryKind::Schema)
    }

    pub fn file_index(&mut self) -> Result<FileIndex, OutputError> {
        self.required_registry(RegistryKind::FileIndex)
    }

    pub fn lookup_table(&mut self) -> Result<Option<LookupTable>, OutputError> {
        self.registry(RegistryKind::LookupIndex)
    }

    pub fn range_sets(&mut self) -> Result<RangeSetRegistry, OutputError> {
        self.required_registry(RegistryKind::RangeSets)
    }

    pub fn process_history(&mut self) -> Result<ProcessHistory, OutputError> {
        self.required_registry(RegistryKind::ProcessHistory)
    }

    pub fn parameter_sets(&mut self) -> Result<ParameterSetRegistry, OutputError> {
        self.required_registry(RegistryKind::ParameterSets)
    }

    pub fn catalog_metadata(&mut self) -> Result<CatalogMetadata, OutputError> {
        self.required_registry(RegistryKind::CatalogMetadata)
    }

    pub fn parentage(&mut self) -> Result<ParentageRegistry, OutputError> {
        self.required_registry(RegistryKind::Parentage)
    }

    pub fn product_dependencies(&mut self) -> Result<ProductDependencies, OutputError> {
        self.required_registry(RegistryKind::ProductDependencies)
    }

    pub fn event_history(&mut self) -> Result<EventHistory, OutputError> {
        self.required_registry(RegistryKind::EventHistory)
    }
}
