//! Measurement result table.

use serde::Serialize;

use crate::units::ValueInformation;

/// The contiguous column block one feature contributes to the result table.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureColumns {
    /// Feature name as requested in the configuration.
    pub feature: String,
    /// First column of the block within a result row.
    pub offset: usize,
    /// Per-column name and units.
    pub values: Vec<ValueInformation>,
}

impl FeatureColumns {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Resolves feature names to their column blocks. Composite features use this
/// once, before composition starts, to bind their dependency offsets.
pub struct ColumnResolver<'a> {
    columns: &'a [FeatureColumns],
}

impl<'a> ColumnResolver<'a> {
    pub fn new(columns: &'a [FeatureColumns]) -> Self {
        Self { columns }
    }

    /// `(offset, width)` of the named feature's column block.
    pub fn resolve(&self, feature: &str) -> Option<(usize, usize)> {
        self.columns
            .iter()
            .find(|c| c.feature == feature)
            .map(|c| (c.offset, c.values.len()))
    }
}

/// Finished measurement: one row of values per object, one column block per
/// feature.
#[derive(Debug, Clone, Serialize)]
pub struct Measurement {
    objects: Vec<u32>,
    columns: Vec<FeatureColumns>,
    row_width: usize,
    data: Vec<f64>,
}

impl Measurement {
    pub(crate) fn new(
        objects: Vec<u32>,
        columns: Vec<FeatureColumns>,
        row_width: usize,
        data: Vec<f64>,
    ) -> Self {
        debug_assert_eq!(data.len(), objects.len() * row_width);
        Self {
            objects,
            columns,
            row_width,
            data,
        }
    }

    /// Measured object ids, sorted ascending.
    pub fn objects(&self) -> &[u32] {
        &self.objects
    }

    pub fn columns(&self) -> &[FeatureColumns] {
        &self.columns
    }

    pub fn row_width(&self) -> usize {
        self.row_width
    }

    /// All values of the object at row `r`.
    pub fn row(&self, r: usize) -> &[f64] {
        &self.data[r * self.row_width..(r + 1) * self.row_width]
    }

    /// Column block of the named feature.
    pub fn feature_columns(&self, feature: &str) -> Option<&FeatureColumns> {
        self.columns.iter().find(|c| c.feature == feature)
    }

    /// Values of one feature for one object id, or `None` when either the id
    /// or the feature is not part of the measurement.
    pub fn value(&self, object_id: u32, feature: &str) -> Option<&[f64]> {
        let r = self.objects.binary_search(&object_id).ok()?;
        let c = self.feature_columns(feature)?;
        let start = r * self.row_width + c.offset;
        Some(&self.data[start..start + c.len()])
    }
}
