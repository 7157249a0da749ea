//! Which columns of each category are persisted, and their values for the
//! record currently being written.

use crate::error::OutputError;
use crate::provenance::ProductStatus;
use crate::registry::{ProductDependencies, ProductDependency};
use crate::selection::{MissingValueStrategy, SelectionRules};
use crate::types::{CategoryArray, ColumnDescriptor, ColumnId, Record, RecordCategory};
use arrow::array::ArrayRef;
use std::collections::HashSet;

/// The per-category column selection of one output stream.
///
/// Computed once at configuration time; the order of selected columns
/// (ascending `ColumnId`) is fixed for the lifetime of the stream.
#[derive(Debug)]
pub struct ColumnSelector {
    selected: CategoryArray<Vec<ColumnDescriptor>>,
    dropped: CategoryArray<Vec<ColumnDescriptor>>,
    drop_metadata_for_dropped_data: bool,
}

/// A selected column bound to its value for one record.
///
/// Borrows both the record and the dummy cache, so it cannot outlive the
/// write of the record it was refreshed for.
#[derive(Debug)]
pub struct SelectedColumn<'r> {
    pub descriptor: &'r ColumnDescriptor,
    pub value: &'r ArrayRef,
    pub status: ProductStatus,
}

/// All selected columns of one record, in selection order.
#[derive(Debug)]
pub struct RefreshedRow<'r> {
    pub category: RecordCategory,
    pub columns: Vec<SelectedColumn<'r>>,
}

impl<'r> RefreshedRow<'r> {
    /// Columns that must receive a provenance entry.
    pub fn provenance_columns(&self) -> impl Iterator<Item = &SelectedColumn<'r>> + '_ {
        self.columns.iter().filter(|c| !c.descriptor.transient)
    }
}

impl ColumnSelector {
    pub fn new(
        schema: &[ColumnDescriptor],
        rules: &SelectionRules,
        drop_metadata_for_dropped_data: bool,
    ) -> Result<Self, OutputError> {
        let mut seen = HashSet::with_capacity(schema.len());
        let mut selected: CategoryArray<Vec<ColumnDescriptor>> = CategoryArray::default();
        let mut dropped: CategoryArray<Vec<ColumnDescriptor>> = CategoryArray::default();

        for column in schema {
            if !seen.insert(column.id) {
                return Err(OutputError::InvalidConfiguration(format!(
                    "column id {} is declared twice",
                    column.id
                )));
            }
            if rules.is_kept(&column.name) {
                selected[column.category].push(column.clone());
            } else {
                if column.mandatory {
                    log::warn!(
                        "Mandatory {} column '{}' is dropped by the selection rules",
                        column.category,
                        column.name
                    );
                }
                log::debug!("Dropping {} column '{}'", column.category, column.name);
                dropped[column.category].push(column.clone());
            }
        }
        for (_, columns) in selected.iter_mut() {
            columns.sort_by_key(|c| c.id);
        }
        for (_, columns) in dropped.iter_mut() {
            columns.sort_by_key(|c| c.id);
        }

        Ok(Self { selected, dropped, drop_metadata_for_dropped_data })
    }

    pub fn selected_columns(&self, category: RecordCategory) -> &[ColumnDescriptor] {
        &self.selected[category]
    }

    pub fn dropped_columns(&self, category: RecordCategory) -> &[ColumnDescriptor] {
        &self.dropped[category]
    }

    /// Number of provenance entries every record of `category` produces.
    pub fn provenance_width(&self, category: RecordCategory) -> usize {
        self.selected[category].iter().filter(|c| !c.transient).count()
    }

    pub fn provenance_widths(&self) -> CategoryArray<usize> {
        CategoryArray::from_fn(|c| self.provenance_width(c))
    }

    /// The selected column ids of `category`, in order. Two streams with the
    /// same layout serialize identical row frames.
    pub fn layout(&self, category: RecordCategory) -> Vec<ColumnId> {
        self.selected[category].iter().map(|c| c.id).collect()
    }

    /// Descriptors written to the schema registry: the selected columns, and
    /// the dropped ones too unless their metadata is dropped as well.
    pub fn descriptions_to_persist(&self, category: RecordCategory) -> Vec<ColumnDescriptor> {
        let mut out = self.selected[category].clone();
        if !self.drop_metadata_for_dropped_data {
            out.extend(self.dropped[category].iter().cloned());
            out.sort_by_key(|c| c.id);
        }
        out
    }

    /// Declared dependencies of every column whose descriptor is persisted.
    pub fn product_dependencies(&self) -> ProductDependencies {
        let dependencies = RecordCategory::ALL
            .into_iter()
            .flat_map(|category| self.descriptions_to_persist(category))
            .filter(|c| !c.depends_on.is_empty())
            .map(|c| ProductDependency { column: c.id, depends_on: c.depends_on })
            .collect();
        ProductDependencies { dependencies }
    }

    /// Binds every selected column of the record's category to its value.
    ///
    /// A missing value is taken from `fallback`; when it has none the whole
    /// refresh fails with `MissingMandatoryColumn`.
    pub fn refresh<'r>(
        &'r self,
        record: &'r Record,
        fallback: &'r dyn MissingValueStrategy,
    ) -> Result<RefreshedRow<'r>, OutputError> {
        let columns = self.selected[record.category]
            .iter()
            .map(|descriptor| match record.products.get(&descriptor.id) {
                Some(product) => Ok(SelectedColumn {
                    descriptor,
                    value: &product.value,
                    status: product.origin.into(),
                }),
                None => fallback
                    .substitute(descriptor)
                    .map(|value| SelectedColumn {
                        descriptor,
                        value,
                        status: ProductStatus::Dropped,
                    })
                    .ok_or_else(|| OutputError::MissingMandatoryColumn {
                        category: record.category,
                        column: descriptor.name.clone(),
                    }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RefreshedRow { category: record.category, columns })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::{DummyValueCache, SelectionRule, StrictMode};
    use arrow::array::Int32Array;
    use arrow_schema::DataType;
    use std::sync::Arc;

    fn schema() -> Vec<ColumnDescriptor> {
        vec![
            ColumnDescriptor::new(3, RecordCategory::Event, "tracks_reco", DataType::Int32)
                .derived_from([ColumnId(1), ColumnId(2)]),
            ColumnDescriptor::new(1, RecordCategory::Event, "header_daq", DataType::Int32)
                .mandatory(),
            ColumnDescriptor::new(2, RecordCategory::Event, "digits_raw", DataType::Int32),
            ColumnDescriptor::new(4, RecordCategory::Event, "timing_reco", DataType::Int32)
                .transient(),
            ColumnDescriptor::new(10, RecordCategory::SubRun, "pot_beam", DataType::Int32),
        ]
    }

    fn selector(drop_meta_for_dropped: bool) -> ColumnSelector {
        let rules = SelectionRules::compile(&[SelectionRule::drop("*_raw")]).unwrap();
        ColumnSelector::new(&schema(), &rules, drop_meta_for_dropped).unwrap()
    }

    fn value(v: i32) -> ArrayRef {
        Arc::new(Int32Array::from(vec![v]))
    }

    #[test]
    fn test_selection_is_ordered_and_respects_rules() {
        let s = selector(true);
        assert_eq!(s.layout(RecordCategory::Event), vec![ColumnId(1), ColumnId(3), ColumnId(4)]);
        assert_eq!(s.dropped_columns(RecordCategory::Event).len(), 1);
        assert_eq!(s.provenance_width(RecordCategory::Event), 2);
        assert_eq!(s.provenance_width(RecordCategory::SubRun), 1);
        assert_eq!(s.provenance_width(RecordCategory::Run), 0);
    }

    #[test]
    fn test_descriptions_to_persist_follow_flag() {
        assert_eq!(selector(true).descriptions_to_persist(RecordCategory::Event).len(), 3);
        assert_eq!(selector(false).descriptions_to_persist(RecordCategory::Event).len(), 4);
    }

    #[test]
    fn test_product_dependencies_cover_persisted_columns() {
        let deps = selector(true).product_dependencies();
        assert_eq!(deps.dependencies.len(), 1);
        assert_eq!(deps.of(ColumnId(3)), &[ColumnId(1), ColumnId(2)]);
        assert!(deps.of(ColumnId(1)).is_empty());
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let mut cols = schema();
        cols.push(ColumnDescriptor::new(3, RecordCategory::Run, "dup", DataType::Int32));
        let err = ColumnSelector::new(&cols, &SelectionRules::keep_all(), true).unwrap_err();
        assert!(matches!(err, OutputError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_refresh_fills_optional_gaps_with_dummies() {
        let s = selector(true);
        let cache = DummyValueCache::for_columns(s.selected_columns(RecordCategory::Event));
        let record = Record::event(1, 1, 1)
            .with_product(ColumnId(1), value(7))
            .with_carried_product(ColumnId(4), value(9));

        let row = s.refresh(&record, &cache).unwrap();
        let statuses: Vec<_> = row.columns.iter().map(|c| c.status).collect();
        assert_eq!(
            statuses,
            vec![ProductStatus::Produced, ProductStatus::Dropped, ProductStatus::CarriedOver]
        );
        // The transient column is excluded from provenance.
        assert_eq!(row.provenance_columns().count(), 2);
    }

    #[test]
    fn test_refresh_fails_on_missing_mandatory_column() {
        let s = selector(true);
        let cache = DummyValueCache::for_columns(s.selected_columns(RecordCategory::Event));
        let record = Record::event(1, 1, 1).with_product(ColumnId(3), value(1));

        let err = s.refresh(&record, &cache).unwrap_err();
        assert!(matches!(
            err,
            OutputError::MissingMandatoryColumn { ref column, .. } if column == "header_daq"
        ));
    }

    #[test]
    fn test_strict_mode_fails_on_any_gap() {
        let s = selector(true);
        let record = Record::event(1, 1, 1)
            .with_product(ColumnId(1), value(1))
            .with_product(ColumnId(3), value(2));
        assert!(s.refresh(&record, &StrictMode).is_err());
    }
}
