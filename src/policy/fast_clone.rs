//! Whether bulk segment copy ("fast cloning") is legal for an input file.
//!
//! Bulk copy reuses the input file's serialized rows verbatim. That is only
//! sound when every row of the segment is wanted unmodified and when the
//! output rotation policy cannot force a split in the middle of a copy.
//! The decision is re-made at every input-file transition.

use crate::policy::ClosingCriteria;
use std::fmt;

/// The first condition that ruled bulk copy out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FastCloneDenial {
    NotRequested,
    GloballyDisabled,
    EventSelectionActive,
    IncompatibleClosingCriteria,
    /// The input file's event rows were written with a different column layout.
    IncompatibleLayout,
}

impl fmt::Display for FastCloneDenial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FastCloneDenial::NotRequested => "fast cloning was not requested",
            FastCloneDenial::GloballyDisabled => "fast cloning is globally disabled",
            FastCloneDenial::EventSelectionActive => "event selection is configured",
            FastCloneDenial::IncompatibleClosingCriteria => {
                "file switching may split an input segment"
            }
            FastCloneDenial::IncompatibleLayout => {
                "input event layout differs from the output selection"
            }
        };
        f.write_str(text)
    }
}

pub struct FastCloneDecisionEngine;

impl FastCloneDecisionEngine {
    /// All four conditions must hold for bulk copy to be legal.
    pub fn decide(
        fast_cloning_requested: bool,
        fast_cloning_globally_enabled: bool,
        want_all_events_unfiltered: bool,
        criteria: &ClosingCriteria,
    ) -> bool {
        Self::check(
            fast_cloning_requested,
            fast_cloning_globally_enabled,
            want_all_events_unfiltered,
            criteria,
        )
        .is_ok()
    }

    /// Same decision, reporting the first failed condition.
    pub fn check(
        fast_cloning_requested: bool,
        fast_cloning_globally_enabled: bool,
        want_all_events_unfiltered: bool,
        criteria: &ClosingCriteria,
    ) -> Result<(), FastCloneDenial> {
        if !fast_cloning_requested {
            return Err(FastCloneDenial::NotRequested);
        }
        if !fast_cloning_globally_enabled {
            return Err(FastCloneDenial::GloballyDisabled);
        }
        if !want_all_events_unfiltered {
            return Err(FastCloneDenial::EventSelectionActive);
        }
        if !criteria.allows_segment_copy() {
            return Err(FastCloneDenial::IncompatibleClosingCriteria);
        }
        Ok(())
    }
}
