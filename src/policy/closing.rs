//! File rotation policy.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// The configured thresholds that trigger rotating to a new output file.
///
/// The default value configures no trigger at all ("unset"): the file then
/// closes only on external signals such as the end of the stream.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ClosingCriteria {
    /// Close once this many Event records were written.
    #[serde(default)]
    pub max_events: Option<u64>,
    /// Close once the file reaches this many bytes.
    #[serde(default)]
    pub max_size: Option<u64>,
    /// Close once the file has been open this long.
    #[serde(default)]
    pub max_age_secs: Option<u64>,
    /// Close once this many input files were fully written into the file.
    #[serde(default)]
    pub max_input_files: Option<u32>,
    /// Close at the next input-file boundary.
    #[serde(default)]
    pub close_at_input_file_boundary: bool,
}

impl ClosingCriteria {
    pub fn unset() -> Self {
        Self::default()
    }

    pub fn with_max_events(mut self, max_events: u64) -> Self {
        self.max_events = Some(max_events);
        self
    }

    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = Some(max_size);
        self
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age_secs = Some(max_age.as_secs());
        self
    }

    pub fn with_max_input_files(mut self, max_input_files: u32) -> Self {
        self.max_input_files = Some(max_input_files);
        self
    }

    pub fn closing_at_input_file_boundary(mut self) -> Self {
        self.close_at_input_file_boundary = true;
        self
    }

    /// `true` when no rotation trigger is configured.
    pub fn is_unset(&self) -> bool {
        self.max_events.is_none()
            && self.max_size.is_none()
            && self.max_age_secs.is_none()
            && self.max_input_files.is_none()
            && !self.close_at_input_file_boundary
    }

    /// `true` when every configured trigger can only fire between records in
    /// a way a verbatim segment copy can honor. Size, age and input-file-count
    /// triggers cannot be predicted while a segment is being copied.
    pub fn allows_segment_copy(&self) -> bool {
        self.max_size.is_none() && self.max_age_secs.is_none() && self.max_input_files.is_none()
    }
}

/// Why a file was asked to close.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosureRequestMode {
    MaxEvents,
    MaxSize,
    MaxAge,
    MaxInputFiles,
    InputFileBoundary,
    Unset,
}

impl fmt::Display for ClosureRequestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// The counters of the file currently being written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileCounters {
    pub events: u64,
    pub size_bytes: u64,
    pub age: Duration,
    /// Input files whose records were completely written into this file.
    pub input_files_closed: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClosingVerdict {
    pub should_close: bool,
    pub reason: ClosureRequestMode,
}

impl ClosingVerdict {
    const KEEP_OPEN: ClosingVerdict = ClosingVerdict {
        should_close: false,
        reason: ClosureRequestMode::Unset,
    };

    fn close(reason: ClosureRequestMode) -> Self {
        Self { should_close: true, reason }
    }
}

/// Decides whether the current file should stop accepting records.
///
/// Consulted before a record is written, never in the middle of one, so a
/// record is never split across files.
pub struct ClosingPolicyEvaluator;

impl ClosingPolicyEvaluator {
    /// Triggers are checked in a fixed order; the first one that fires is
    /// reported as the reason.
    pub fn evaluate(counters: &FileCounters, criteria: &ClosingCriteria) -> ClosingVerdict {
        if criteria.is_unset() {
            return ClosingVerdict::KEEP_OPEN;
        }
        if criteria.max_events.is_some_and(|max| counters.events >= max) {
            return ClosingVerdict::close(ClosureRequestMode::MaxEvents);
        }
        if criteria.max_size.is_some_and(|max| counters.size_bytes >= max) {
            return ClosingVerdict::close(ClosureRequestMode::MaxSize);
        }
        if criteria
            .max_age_secs
            .is_some_and(|max| counters.age >= Duration::from_secs(max))
        {
            return ClosingVerdict::close(ClosureRequestMode::MaxAge);
        }
        if criteria
            .max_input_files
            .is_some_and(|max| counters.input_files_closed >= max)
        {
            return ClosingVerdict::close(ClosureRequestMode::MaxInputFiles);
        }
        if criteria.close_at_input_file_boundary && counters.input_files_closed > 0 {
            return ClosingVerdict::close(ClosureRequestMode::InputFileBoundary);
        }
        ClosingVerdict::KEEP_OPEN
    }

    pub fn should_close(counters: &FileCounters, criteria: &ClosingCriteria) -> bool {
        Self::evaluate(counters, criteria).should_close
    }

    pub fn close_reason(counters: &FileCounters, criteria: &ClosingCriteria) -> ClosureRequestMode {
        Self::evaluate(counters, criteria).reason
    }
}
