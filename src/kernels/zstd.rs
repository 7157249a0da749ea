//! Zstandard compression of whole frames.
//!
//! A compressed buffer is prefixed with its uncompressed length (u64, LE) so
//! that decoding can verify the result. This module is a panic-free wrapper
//! around the `zstd` crate.

use crate::error::OutputError;
use std::io::Read;
use zstd::stream::Decoder;

/// Compresses `input_bytes` at `level`, prepending the uncompressed size.
pub fn encode(input_bytes: &[u8], level: i32) -> Result<Vec<u8>, OutputError> {
    let mut output_buf = Vec::with_capacity(input_bytes.len() / 2 + 16);

    let uncompressed_len: u64 = input_bytes.len() as u64;
    output_buf.extend_from_slice(&uncompressed_len.to_le_bytes());

    let mut encoder = zstd::stream::Encoder::new(&mut output_buf, level)
        .map_err(|e| OutputError::ZstdError(e.to_string()))?;
    std::io::Write::write_all(&mut encoder, input_bytes)
        .map_err(|e| OutputError::ZstdError(e.to_string()))?;
    // `finish` is essential to finalize the Zstd frame.
    encoder
        .finish()
        .map_err(|e| OutputError::ZstdError(e.to_string()))?;

    Ok(output_buf)
}

/// Reverses [`encode`]. A header declaring more than `max_len` bytes is
/// rejected before anything is decompressed.
pub fn decode(input_bytes: &[u8], max_len: usize) -> Result<Vec<u8>, OutputError> {
    let Some((len_bytes, compressed_data)) = input_bytes.split_first_chunk::<8>() else {
        return Err(OutputError::ZstdError(
            "Input stream too short to contain size header.".to_string(),
        ));
    };
    let uncompressed_len = u64::from_le_bytes(*len_bytes);
    // SECURITY: the header is untrusted; never size a buffer from it unchecked.
    if uncompressed_len > max_len as u64 {
        return Err(OutputError::ZstdError(format!(
            "Declared size {} exceeds the limit of {} bytes.",
            uncompressed_len, max_len
        )));
    }

    let decoder =
        Decoder::new(compressed_data).map_err(|e| OutputError::ZstdError(e.to_string()))?;
    // One byte past the declared size is enough to detect a lying header.
    let mut limited = decoder.take(uncompressed_len + 1);
    let mut decompressed_data = Vec::new();
    limited
        .read_to_end(&mut decompressed_data)
        .map_err(|e| OutputError::ZstdError(e.to_string()))?;

    if decompressed_data.len() as u64 != uncompressed_len {
        return Err(OutputError::ZstdError(format!(
            "Decompressed size does not match header. Expected {}, got {}.",
            uncompressed_len,
            decompressed_data.len()
        )));
    }

    Ok(decompressed_data)
}
