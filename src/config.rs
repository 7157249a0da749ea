// In: src/config.rs

//! The single source of truth for all output-stream configuration.
//!
//! `OutputSettings` is created once at the application boundary (e.g. from a
//! JSON job description) and handed to [`OutputStream`](crate::output::OutputStream)
//! by value. The writer treats it as opaque beyond the fields below.

use crate::error::OutputError;
use crate::policy::ClosingCriteria;
use crate::provenance::DropMetaData;
use crate::selection::{SelectionRule, SelectionRules};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Placeholder in `file_name` replaced by the file sequence number.
pub const SEQUENCE_PLACEHOLDER: &str = "%#";

//==================================================================================
// I. The Unified OutputSettings
//==================================================================================

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "snake_case")]
pub struct OutputSettings {
    /// Output path pattern. Every `%#` is replaced by the zero-padded
    /// sequence number of the file (starting at 1).
    #[serde(default = "default_file_name")]
    pub file_name: String,

    /// The rotation triggers. Defaults to none ("unset").
    #[serde(default)]
    pub closing: ClosingCriteria,

    /// Zstd level applied to each serialized row. `0` stores rows uncompressed.
    #[serde(default = "default_compression_level")]
    pub compression_level: i32,

    /// Size of the write buffer between the writer and the file, in bytes.
    /// Handed to the store factory for every file it opens.
    #[serde(default = "default_basket_size")]
    pub basket_size: usize,

    /// Column split granularity, recorded for readers.
    #[serde(default = "default_split_level")]
    pub split_level: u32,

    /// How much provenance is persisted next to the data.
    #[serde(default)]
    pub drop_metadata: DropMetaData,

    /// If true, descriptors of dropped columns are left out of the schema
    /// registry. By default they are persisted next to the selected ones.
    #[serde(default)]
    pub drop_metadata_for_dropped_data: bool,

    /// `None` means the default (on) and was not set explicitly; a denial
    /// is then only reported at info level.
    #[serde(default)]
    pub fast_cloning: Option<bool>,

    /// Ordered keep/drop rules matched against column names.
    #[serde(default)]
    pub selection: Vec<SelectionRule>,

    /// If true, a lookup table sorted by run/subrun/event is written at close.
    #[serde(default = "default_true")]
    pub write_lookup_index: bool,

    #[serde(default)]
    pub data_tier: String,

    #[serde(default = "default_stream_name")]
    pub stream_name: String,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            file_name: default_file_name(),
            closing: ClosingCriteria::default(),
            compression_level: default_compression_level(),
            basket_size: default_basket_size(),
            split_level: default_split_level(),
            drop_metadata: DropMetaData::default(),
            drop_metadata_for_dropped_data: false,
            fast_cloning: None,
            selection: Vec::new(),
            write_lookup_index: true,
            data_tier: String::new(),
            stream_name: default_stream_name(),
        }
    }
}

impl OutputSettings {
    pub fn with_file_name(mut self, pattern: impl Into<String>) -> Self {
        self.file_name = pattern.into();
        self
    }

    pub fn with_closing(mut self, closing: ClosingCriteria) -> Self {
        self.closing = closing;
        self
    }

    pub fn with_fast_cloning(mut self, enabled: bool) -> Self {
        self.fast_cloning = Some(enabled);
        self
    }

    pub fn with_drop_metadata(mut self, drop: DropMetaData) -> Self {
        self.drop_metadata = drop;
        self
    }

    pub fn with_selection(mut self, rules: Vec<SelectionRule>) -> Self {
        self.selection = rules;
        self
    }

    pub fn fast_cloning_requested(&self) -> bool {
        self.fast_cloning.unwrap_or(true)
    }

    pub fn fast_cloning_set_by_user(&self) -> bool {
        self.fast_cloning.is_some()
    }

    /// The path of the `sequence`-th file of the stream.
    pub fn file_path(&self, sequence: u32) -> PathBuf {
        PathBuf::from(
            self.file_name
                .replace(SEQUENCE_PLACEHOLDER, &format!("{:03}", sequence)),
        )
    }

    /// Rejects settings the writer cannot honor.
    pub fn validate(&self) -> Result<(), OutputError> {
        let invalid = |msg: String| Err(OutputError::InvalidConfiguration(msg));

        if self.file_name.trim().is_empty() {
            return invalid("file_name must not be empty".into());
        }
        if !self.closing.is_unset() && !self.file_name.contains(SEQUENCE_PLACEHOLDER) {
            return invalid(format!(
                "file_name '{}' needs a '{}' placeholder when rotation is configured",
                self.file_name, SEQUENCE_PLACEHOLDER
            ));
        }
        let zero_limits = [
            ("max_events", self.closing.max_events == Some(0)),
            ("max_size", self.closing.max_size == Some(0)),
            ("max_age_secs", self.closing.max_age_secs == Some(0)),
            ("max_input_files", self.closing.max_input_files == Some(0)),
        ];
        if let Some((name, _)) = zero_limits.iter().find(|(_, is_zero)| *is_zero) {
            return invalid(format!("{} must be greater than zero", name));
        }
        if !(0..=22).contains(&self.compression_level) {
            return invalid(format!(
                "compression_level {} is outside 0..=22",
                self.compression_level
            ));
        }
        if self.basket_size == 0 {
            return invalid("basket_size must be greater than zero".into());
        }
        SelectionRules::compile(&self.selection)?;
        Ok(())
    }
}

//==================================================================================
// II. Serde Default Helpers
//==================================================================================

fn default_file_name() -> String {
    "output_%#.evs".to_string()
}

fn default_compression_level() -> i32 {
    3
}

/// 64 KiB write buffer.
fn default_basket_size() -> usize {
    64 * 1024
}

fn default_split_level() -> u32 {
    99
}

fn default_true() -> bool {
    true
}

fn default_stream_name() -> String {
    "out".to_string()
}
