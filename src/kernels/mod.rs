//! Low-level byte codecs used by the frame formats.

pub mod zstd;
