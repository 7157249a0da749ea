//! Per-category column selection and the values written for each record.

pub mod dummy;
pub mod rules;
pub mod selector;

pub use dummy::{DummyValueCache, MissingValueStrategy, StrictMode};
pub use rules::{SelectionAction, SelectionRule, SelectionRules};
pub use selector::{ColumnSelector, RefreshedRow, SelectedColumn};
