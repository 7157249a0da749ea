//! Defines the self-describing on-disk format for a single record row.
//! This module is the single source of truth for serialization,
//! deserialization and layout peeking of a row frame. Bulk segment copy
//! moves these frames between files without touching their contents.

use crate::error::OutputError;
use crate::kernels::zstd;
use crate::types::ColumnId;
use arrow::array::ArrayRef;
use arrow::datatypes::{Field, Schema};
use arrow::ipc::reader::StreamReader;
use arrow::ipc::writer::StreamWriter;
use arrow::record_batch::RecordBatch;
use std::io::{Cursor, Read, Write};
use std::sync::Arc;

//==================================================================================
// Format Constants
//==================================================================================
/// The magic number to identify a row frame.
pub const ROW_MAGIC: &[u8; 4] = b"ROWF";
/// The version of the row frame format.
pub const ROW_FORMAT_VERSION: u16 = 1;
/// magic(4) + version(2) + codec(1) + body_len(4)
const ROW_HEADER_SIZE: usize = 11;
/// A reasonable limit to prevent OOM from malformed lengths. (256MB)
const MAX_REASONABLE_PAYLOAD_LEN: usize = 256 * 1024 * 1024;

const CODEC_NONE: u8 = 0;
const CODEC_ZSTD: u8 = 1;

//==================================================================================
// Column Value Codec
//==================================================================================

/// Serializes one column value as an Arrow IPC stream.
pub fn encode_value(value: &ArrayRef) -> Result<Vec<u8>, OutputError> {
    let schema = Arc::new(Schema::new(vec![Field::new(
        "value",
        value.data_type().clone(),
        true,
    )]));
    let batch = RecordBatch::try_new(schema.clone(), vec![value.clone()])?;

    let mut buf = Vec::new();
    let mut writer = StreamWriter::try_new(&mut buf, &schema)?;
    writer.write(&batch)?;
    writer.finish()?;
    drop(writer);
    Ok(buf)
}

pub fn decode_value(bytes: &[u8]) -> Result<ArrayRef, OutputError> {
    let mut reader = StreamReader::try_new(Cursor::new(bytes), None)?;
    let batch = reader
        .next()
        .ok_or_else(|| OutputError::FrameFormatError("column value stream is empty".into()))??;
    Ok(batch.column(0).clone())
}

//==================================================================================
// Row Frame
//==================================================================================

/// A serialized row: each selected column's encoded value, in selection order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RowFrame {
    pub columns: Vec<(ColumnId, Vec<u8>)>,
}

impl RowFrame {
    /// Serializes the frame. A positive `compression_level` zstd-compresses
    /// the body; zero stores it as is.
    pub fn to_bytes(&self, compression_level: i32) -> Result<Vec<u8>, OutputError> {
        let map_err = |e: std::io::Error| OutputError::FrameFormatError(e.to_string());

        let payload_len: usize = self.columns.iter().map(|(_, v)| v.len()).sum();
        let mut body = Vec::with_capacity(2 + self.columns.len() * 12 + payload_len);
        body.write_all(&(self.columns.len() as u16).to_le_bytes()).map_err(map_err)?;
        for (id, data) in &self.columns {
            body.write_all(&id.0.to_le_bytes()).map_err(map_err)?;
            body.write_all(&(data.len() as u64).to_le_bytes()).map_err(map_err)?;
        }
        for (_, data) in &self.columns {
            body.write_all(data).map_err(map_err)?;
        }

        let (codec, body) = if compression_level > 0 {
            (CODEC_ZSTD, zstd::encode(&body, compression_level)?)
        } else {
            (CODEC_NONE, body)
        };
        if body.len() > u32::MAX as usize {
            return Err(OutputError::FrameFormatError(format!(
                "row body of {} bytes does not fit a frame",
                body.len()
            )));
        }

        let mut out = Vec::with_capacity(ROW_HEADER_SIZE + body.len());
        out.extend_from_slice(ROW_MAGIC);
        out.extend_from_slice(&ROW_FORMAT_VERSION.to_le_bytes());
        out.push(codec);
        out.extend_from_slice(&(body.len() as u32).to_le_bytes());
        out.extend_from_slice(&body);
        Ok(out)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, OutputError> {
        let body = Self::body(bytes)?;
        let mut cursor = Cursor::new(body.as_slice());
        let layout = read_layout(&mut cursor)?;

        let map_err = |e: std::io::Error| OutputError::FrameFormatError(e.to_string());
        let mut columns = Vec::with_capacity(layout.len());
        for (id, len) in layout {
            let mut data = vec![0; len];
            cursor.read_exact(&mut data).map_err(map_err)?;
            columns.push((id, data));
        }
        Ok(Self { columns })
    }

    /// The column ids stored in a frame, without copying the payloads out.
    pub fn peek_layout(bytes: &[u8]) -> Result<Vec<ColumnId>, OutputError> {
        let body = Self::body(bytes)?;
        let mut cursor = Cursor::new(body.as_slice());
        Ok(read_layout(&mut cursor)?.into_iter().map(|(id, _)| id).collect())
    }

    /// Decodes every column value.
    pub fn decode_values(&self) -> Result<Vec<(ColumnId, ArrayRef)>, OutputError> {
        self.columns
            .iter()
            .map(|(id, data)| Ok((*id, decode_value(data)?)))
            .collect()
    }

    /// Validates the header and returns the (decompressed) body.
    fn body(bytes: &[u8]) -> Result<Vec<u8>, OutputError> {
        if bytes.len() < ROW_HEADER_SIZE {
            return Err(OutputError::FrameFormatError(format!(
                "Row frame is too small to be valid. Minimum size: {}, got: {}",
                ROW_HEADER_SIZE,
                bytes.len()
            )));
        }
        if &bytes[0..4] != ROW_MAGIC {
            return Err(OutputError::FrameFormatError("Invalid row frame magic number".into()));
        }
        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != ROW_FORMAT_VERSION {
            return Err(OutputError::FrameFormatError(format!(
                "Unsupported row frame version: expected {}, got {}",
                ROW_FORMAT_VERSION, version
            )));
        }
        let codec = bytes[6];
        let body_len = u32::from_le_bytes([bytes[7], bytes[8], bytes[9], bytes[10]]) as usize;
        if bytes.len() != ROW_HEADER_SIZE + body_len {
            return Err(OutputError::FrameFormatError(
                "Declared body length does not match frame size".into(),
            ));
        }
        let raw = &bytes[ROW_HEADER_SIZE..];
        match codec {
            CODEC_NONE => Ok(raw.to_vec()),
            CODEC_ZSTD => zstd::decode(raw, MAX_REASONABLE_PAYLOAD_LEN)
                .map_err(|e| OutputError::FrameFormatError(e.to_string())),
            other => Err(OutputError::FrameFormatError(format!("Unknown row codec {}", other))),
        }
    }
}

fn read_layout(cursor: &mut Cursor<&[u8]>) -> Result<Vec<(ColumnId, usize)>, OutputError> {
    let map_err = |e: std::io::Error| OutputError::FrameFormatError(e.to_string());

    let mut u16_buf = [0u8; 2];
    cursor.read_exact(&mut u16_buf).map_err(map_err)?;
    let count = u16::from_le_bytes(u16_buf) as usize;

    let mut layout = Vec::with_capacity(count);
    let mut total = 0usize;
    for _ in 0..count {
        let mut u32_buf = [0u8; 4];
        let mut u64_buf = [0u8; 8];
        cursor.read_exact(&mut u32_buf).map_err(map_err)?;
        cursor.read_exact(&mut u64_buf).map_err(map_err)?;
        let len = u64::from_le_bytes(u64_buf) as usize;
        // SECURITY: Validate length against a sane maximum before allocating.
        if len > MAX_REASONABLE_PAYLOAD_LEN {
            return Err(OutputError::FrameFormatError(format!(
                "Column payload length ({}) exceeds maximum allowed size ({})",
                len, MAX_REASONABLE_PAYLOAD_LEN
            )));
        }
        total = total.saturating_add(len);
        layout.push((ColumnId(u32::from_le_bytes(u32_buf)), len));
    }

    let remaining = cursor.get_ref().len() - cursor.position() as usize;
    if total > remaining {
        return Err(OutputError::FrameFormatError(
            "Sum of declared column sizes exceeds frame body".into(),
        ));
    }
    Ok(layout)
}

//==================================================================================
// Unit Tests
//==================================================================================
