//! Run/subrun coverage claimed by aggregate (SubRun and Run) records.

use crate::types::{RunNumber, SubRunNumber};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An inclusive interval of subruns within one run.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubRunRange {
    pub run: RunNumber,
    pub first: SubRunNumber,
    pub last: SubRunNumber,
}

impl SubRunRange {
    /// Bounds given in the wrong order are swapped.
    pub fn new(run: RunNumber, first: SubRunNumber, last: SubRunNumber) -> Self {
        Self {
            run,
            first: first.min(last),
            last: first.max(last),
        }
    }

    /// Overlapping or directly adjacent within the same run.
    fn touches(&self, other: &SubRunRange) -> bool {
        self.run == other.run
            && self.first <= other.last.saturating_add(1)
            && other.first <= self.last.saturating_add(1)
    }

    fn union(&self, other: &SubRunRange) -> SubRunRange {
        SubRunRange {
            run: self.run,
            first: self.first.min(other.first),
            last: self.last.max(other.last),
        }
    }
}

/// A set of disjoint subrun intervals.
///
/// Intervals are kept sorted and maximally merged: no two stored intervals
/// overlap or touch. The set only grows through [`RangeSet::extend`] and
/// [`RangeSet::merge`].
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(from = "Vec<SubRunRange>", into = "Vec<SubRunRange>")]
pub struct RangeSet {
    ranges: Vec<SubRunRange>,
}

impl RangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Covers every subrun of `run`.
    pub fn for_run(run: RunNumber) -> Self {
        let mut rs = Self::new();
        rs.extend(SubRunRange::new(run, 0, SubRunNumber::MAX));
        rs
    }

    pub fn for_subrun(run: RunNumber, subrun: SubRunNumber) -> Self {
        let mut rs = Self::new();
        rs.extend(SubRunRange::new(run, subrun, subrun));
        rs
    }

    /// Adds `range`, absorbing every stored interval it overlaps or touches.
    pub fn extend(&mut self, range: SubRunRange) {
        let mut merged = range;
        let mut kept = Vec::with_capacity(self.ranges.len() + 1);
        // Stored ranges never touch each other, so one pass absorbs everything.
        for existing in self.ranges.drain(..) {
            if existing.touches(&merged) {
                merged = merged.union(&existing);
            } else {
                kept.push(existing);
            }
        }
        let pos = kept.partition_point(|r| r < &merged);
        kept.insert(pos, merged);
        self.ranges = kept;
    }

    pub fn merge(&mut self, other: &RangeSet) {
        for range in &other.ranges {
            self.extend(*range);
        }
    }

    pub fn ranges(&self) -> &[SubRunRange] {
        &self.ranges
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn contains(&self, run: RunNumber, subrun: SubRunNumber) -> bool {
        self.ranges
            .iter()
            .any(|r| r.run == run && r.first <= subrun && subrun <= r.last)
    }

    /// Distinct runs touched by this set, ascending.
    pub fn runs(&self) -> Vec<RunNumber> {
        let mut runs: Vec<_> = self.ranges.iter().map(|r| r.run).collect();
        runs.dedup();
        runs
    }

    /// One line per run, e.g. `run 1: 1-5,7`.
    pub fn to_compact_string(&self) -> String {
        self.runs()
            .into_iter()
            .map(|run| {
                let parts: Vec<String> = self
                    .ranges
                    .iter()
                    .filter(|r| r.run == run)
                    .map(|r| {
                        if r.first == r.last {
                            r.first.to_string()
                        } else {
                            format!("{}-{}", r.first, r.last)
                        }
                    })
                    .collect();
                format!("run {}: {}", run, parts.join(","))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl From<Vec<SubRunRange>> for RangeSet {
    fn from(ranges: Vec<SubRunRange>) -> Self {
        let mut rs = RangeSet::new();
        for range in ranges {
            rs.extend(range);
        }
        rs
    }
}

impl From<RangeSet> for Vec<SubRunRange> {
    fn from(rs: RangeSet) -> Self {
        rs.ranges
    }
}

impl fmt::Display for RangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .ranges
            .iter()
            .map(|r| format!("{}:[{},{}]", r.run, r.first, r.last))
            .collect();
        write!(f, "{{{}}}", parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adjacent_intervals_merge_into_one() {
        let mut rs = RangeSet::new();
        rs.extend(SubRunRange::new(1, 1, 3));
        rs.extend(SubRunRange::new(1, 4, 6));

        assert_eq!(rs.ranges(), &[SubRunRange::new(1, 1, 6)]);
    }

    #[test]
    fn test_gap_keeps_intervals_apart() {
        let mut rs = RangeSet::new();
        rs.extend(SubRunRange::new(1, 1, 3));
        rs.extend(SubRunRange::new(1, 5, 6));

        assert_eq!(rs.ranges().len(), 2);
        assert!(!rs.contains(1, 4));
        assert!(rs.contains(1, 5));
    }

    #[test]
    fn test_bridging_interval_collapses_neighbours() {
        let mut rs = RangeSet::new();
        rs.extend(SubRunRange::new(2, 7, 8));
        rs.extend(SubRunRange::new(2, 1, 2));
        rs.extend(SubRunRange::new(2, 4, 5));
        assert_eq!(rs.ranges().len(), 3);

        rs.extend(SubRunRange::new(2, 3, 6));
        assert_eq!(rs.ranges(), &[SubRunRange::new(2, 1, 8)]);
    }

    #[test]
    fn test_same_subruns_in_different_runs_do_not_merge() {
        let mut rs = RangeSet::for_subrun(1, 5);
        rs.merge(&RangeSet::for_subrun(2, 6));

        assert_eq!(rs.ranges().len(), 2);
        assert_eq!(rs.runs(), vec![1, 2]);
    }

    #[test]
    fn test_ranges_stay_sorted() {
        let mut rs = RangeSet::new();
        rs.extend(SubRunRange::new(3, 1, 1));
        rs.extend(SubRunRange::new(1, 9, 9));
        rs.extend(SubRunRange::new(1, 2, 2));

        let ranges = rs.ranges();
        assert!(ranges.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_deserialization_normalizes() {
        // Overlapping input must come back merged.
        let json = r#"[{"run":1,"first":1,"last":4},{"run":1,"first":3,"last":9}]"#;
        let rs: RangeSet = serde_json::from_str(json).unwrap();
        assert_eq!(rs.ranges(), &[SubRunRange::new(1, 1, 9)]);
    }

    #[test]
    fn test_compact_string() {
        let mut rs = RangeSet::new();
        rs.extend(SubRunRange::new(1, 1, 5));
        rs.extend(SubRunRange::new(1, 7, 7));
        rs.extend(SubRunRange::new(4, 2, 3));

        assert_eq!(rs.to_compact_string(), "run 1: 1-5,7\nrun 4: 2-3");
    }
}
