//! The fixed set of record categories and a small array keyed by them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};

/// The category a persisted record belongs to. Each category owns its own
/// table, column set and provenance list; they never mix.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecordCategory {
    Event,
    SubRun,
    Run,
    Results,
}

impl RecordCategory {
    /// The number of categories. Known at compile time.
    pub const COUNT: usize = 4;

    /// All categories in their canonical (index) order.
    pub const ALL: [RecordCategory; Self::COUNT] = [
        RecordCategory::Event,
        RecordCategory::SubRun,
        RecordCategory::Run,
        RecordCategory::Results,
    ];

    /// Position of this category inside a [`CategoryArray`].
    pub const fn index(self) -> usize {
        match self {
            RecordCategory::Event => 0,
            RecordCategory::SubRun => 1,
            RecordCategory::Run => 2,
            RecordCategory::Results => 3,
        }
    }

    /// Returns `true` for the aggregate categories that claim a `RangeSet`.
    pub fn is_aggregate(self) -> bool {
        matches!(self, RecordCategory::SubRun | RecordCategory::Run)
    }
}

impl fmt::Display for RecordCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // These names are part of the on-disk contract (table names).
        write!(f, "{:?}", self)
    }
}

/// One slot per [`RecordCategory`], indexed by the enumeration.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryArray<T>([T; RecordCategory::COUNT]);

impl<T> CategoryArray<T> {
    /// Builds the array by calling `f` once per category, in index order.
    pub fn from_fn(mut f: impl FnMut(RecordCategory) -> T) -> Self {
        Self(RecordCategory::ALL.map(&mut f))
    }

    pub fn iter(&self) -> impl Iterator<Item = (RecordCategory, &T)> {
        RecordCategory::ALL.into_iter().zip(self.0.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (RecordCategory, &mut T)> {
        RecordCategory::ALL.into_iter().zip(self.0.iter_mut())
    }
}

impl<T> Index<RecordCategory> for CategoryArray<T> {
    type Output = T;

    fn index(&self, category: RecordCategory) -> &T {
        &self.0[category.index()]
    }
}

impl<T> IndexMut<RecordCategory> for CategoryArray<T> {
    fn index_mut(&mut self, category: RecordCategory) -> &mut T {
        &mut self.0[category.index()]
    }
}
