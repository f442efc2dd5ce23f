//! Per-object grey-value statistics and extrema.

use std::any::Any;

use labelmetry_core::{MinMaxAccumulator, StatisticsAccumulator};

use crate::error::MeasureResult;
use crate::feature::{ImageContext, LineBased, ScanLine};
use crate::index::ObjectIndex;
use crate::records::Records;
use crate::units::ValueInformation;

/// Mean, standard deviation, skewness and excess kurtosis of the grey values
/// of each object, accumulated in a single pass.
#[derive(Debug, Default)]
pub struct GreyStatistics {
    n_objects: usize,
    records: Records<StatisticsAccumulator>,
}

impl LineBased for GreyStatistics {
    fn name(&self) -> &'static str {
        "GreyStatistics"
    }

    fn initialize(&mut self, ctx: &ImageContext<'_>) -> MeasureResult<Vec<ValueInformation>> {
        ctx.require_scalar_grey("GreyStatistics")?;
        self.n_objects = ctx.n_objects;
        self.records = Records::new(ctx.n_objects, 1);
        Ok(vec![
            ValueInformation::dimensionless("Mean"),
            ValueInformation::dimensionless("StandardDeviation"),
            ValueInformation::dimensionless("Skewness"),
            ValueInformation::dimensionless("ExcessKurtosis"),
        ])
    }

    fn scan_line(&mut self, line: &ScanLine<'_>, index: &ObjectIndex) {
        let Some(grey) = line.grey else { return };
        let mut last_id = 0u32;
        let mut row: Option<usize> = None;
        for (j, &id) in line.labels.iter().enumerate() {
            if id == 0 {
                continue;
            }
            if id != last_id {
                last_id = id;
                row = index.index_of(id);
            }
            if let Some(r) = row {
                self.records.row_mut(r)[0].push(grey[j]);
            }
        }
    }

    fn finish(&self, row: usize, output: &mut [f64]) {
        let acc = self.records.row(row)[0];
        output[0] = acc.mean();
        output[1] = acc.standard_deviation();
        output[2] = acc.skewness();
        output[3] = acc.excess_kurtosis();
    }

    fn cleanup(&mut self) {
        self.records.clear();
    }

    fn split(&self) -> Box<dyn LineBased> {
        Box::new(GreyStatistics {
            n_objects: self.n_objects,
            records: Records::new(self.n_objects, 1),
        })
    }

    fn merge(&mut self, other: Box<dyn LineBased>) {
        let other = other
            .into_any()
            .downcast::<GreyStatistics>()
            .expect("merged partial must come from GreyStatistics::split");
        self.records.merge_with(&other.records, |a, b| *a += *b);
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

/// Minimum and maximum grey value of each object.
///
/// The scan consumes pixels two at a time: when a pair belongs to the same
/// object, one comparison between the two values decides which of them
/// challenges the minimum and which the maximum.
#[derive(Debug, Default)]
pub struct GreyExtrema {
    n_objects: usize,
    records: Records<MinMaxAccumulator>,
}

impl GreyExtrema {
    fn push_one(
        &mut self,
        id: u32,
        value: f64,
        index: &ObjectIndex,
        last_id: &mut u32,
        row: &mut Option<usize>,
    ) {
        if id == 0 {
            return;
        }
        if id != *last_id {
            *last_id = id;
            *row = index.index_of(id);
        }
        if let Some(r) = *row {
            self.records.row_mut(r)[0].push(value);
        }
    }
}

impl LineBased for GreyExtrema {
    fn name(&self) -> &'static str {
        "GreyExtrema"
    }

    fn initialize(&mut self, ctx: &ImageContext<'_>) -> MeasureResult<Vec<ValueInformation>> {
        ctx.require_scalar_grey("GreyExtrema")?;
        self.n_objects = ctx.n_objects;
        self.records = Records::new(ctx.n_objects, 1);
        Ok(vec![
            ValueInformation::dimensionless("Minimum"),
            ValueInformation::dimensionless("Maximum"),
        ])
    }

    fn scan_line(&mut self, line: &ScanLine<'_>, index: &ObjectIndex) {
        let Some(grey) = line.grey else { return };
        let labels = line.labels;
        let mut last_id = 0u32;
        let mut row: Option<usize> = None;
        let mut j = 0;
        while j + 1 < labels.len() {
            let (a, b) = (labels[j], labels[j + 1]);
            if a == b {
                if a != 0 {
                    if a != last_id {
                        last_id = a;
                        row = index.index_of(a);
                    }
                    if let Some(r) = row {
                        self.records.row_mut(r)[0].push_pair(grey[j], grey[j + 1]);
                    }
                }
            } else {
                self.push_one(a, grey[j], index, &mut last_id, &mut row);
                self.push_one(b, grey[j + 1], index, &mut last_id, &mut row);
            }
            j += 2;
        }
        if j < labels.len() {
            self.push_one(labels[j], grey[j], index, &mut last_id, &mut row);
        }
    }

    fn finish(&self, row: usize, output: &mut [f64]) {
        let acc = self.records.row(row)[0];
        if acc.is_empty() {
            output[0] = 0.0;
            output[1] = 0.0;
        } else {
            output[0] = acc.minimum();
            output[1] = acc.maximum();
        }
    }

    fn cleanup(&mut self) {
        self.records.clear();
    }

    fn split(&self) -> Box<dyn LineBased> {
        Box::new(GreyExtrema {
            n_objects: self.n_objects,
            records: Records::new(self.n_objects, 1),
        })
    }

    fn merge(&mut self, other: Box<dyn LineBased>) {
        let other = other
            .into_any()
            .downcast::<GreyExtrema>()
            .expect("merged partial must come from GreyExtrema::split");
        self.records.merge_with(&other.records, |a, b| *a += *b);
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}
