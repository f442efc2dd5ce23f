//! Object size: foreground pixel count times the pixel volume.

use std::any::Any;

use crate::error::MeasureResult;
use crate::feature::{ImageContext, LineBased, ScanLine};
use crate::index::ObjectIndex;
use crate::records::Records;
use crate::units::{Units, ValueInformation};

#[derive(Debug, Default)]
pub struct Size {
    n_objects: usize,
    scale: f64,
    records: Records<f64>,
}

impl LineBased for Size {
    fn name(&self) -> &'static str {
        "Size"
    }

    fn initialize(&mut self, ctx: &ImageContext<'_>) -> MeasureResult<Vec<ValueInformation>> {
        let mut scale = 1.0;
        let mut units = Units::dimensionless();
        for pq in ctx.pixel_size {
            scale *= pq.magnitude;
            units = units * pq.units.clone();
        }
        self.n_objects = ctx.n_objects;
        self.scale = scale;
        self.records = Records::new(ctx.n_objects, 1);
        Ok(vec![ValueInformation::new("Size", units)])
    }

    fn scan_line(&mut self, line: &ScanLine<'_>, index: &ObjectIndex) {
        let mut last_id = 0u32;
        let mut row: Option<usize> = None;
        for &id in line.labels {
            if id == 0 {
                continue;
            }
            if id != last_id {
                last_id = id;
                row = index.index_of(id);
            }
            if let Some(r) = row {
                self.records.row_mut(r)[0] += 1.0;
            }
        }
    }

    fn finish(&self, row: usize, output: &mut [f64]) {
        output[0] = self.records.row(row)[0] * self.scale;
    }

    fn cleanup(&mut self) {
        self.records.clear();
    }

    fn split(&self) -> Box<dyn LineBased> {
        Box::new(Size {
            n_objects: self.n_objects,
            scale: self.scale,
            records: Records::new(self.n_objects, 1),
        })
    }

    fn merge(&mut self, other: Box<dyn LineBased>) {
        let other = other
            .into_any()
            .downcast::<Size>()
            .expect("merged partial must come from Size::split");
        self.records.merge_with(&other.records, |a, b| *a += *b);
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}
