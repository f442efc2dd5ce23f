//! Inertia tensors of 2D and 3D objects, binary or grey-weighted.
//!
//! Both features accumulate raw coordinate sums, coordinate-product sums and
//! the total mass per object, then convert them to the central second-moment
//! (inertia) tensor in one closed-form step per object. The binary variant
//! weighs every foreground pixel 1; the grey variant weighs it by its grey
//! value. Output is the packed symmetric tensor `{xx, yy, xy}` in 2D and
//! `{xx, yy, zz, xy, xz, yz}` in 3D, each entry scaled to physical units from
//! the per-dimension pixel sizes.

use std::any::Any;

use crate::error::{MeasureError, MeasureResult};
use crate::feature::{ImageContext, LineBased, ScanLine};
use crate::index::ObjectIndex;
use crate::records::Records;
use crate::units::ValueInformation;

const DIMS: [&str; 3] = ["x", "y", "z"];

/// Raw-moment accumulation shared by the binary and grey variants.
///
/// Record layout per object, 2D: `[x y xx xy yy mass]`;
/// 3D: `[x y z xx xy xz yy yz zz mass]`.
#[derive(Debug, Default)]
struct MomentState {
    ndims: usize,
    width: usize,
    n_objects: usize,
    scales: Vec<f64>,
    records: Records<f64>,
}

impl MomentState {
    fn initialize(
        &mut self,
        ctx: &ImageContext<'_>,
        feature: &'static str,
    ) -> MeasureResult<Vec<ValueInformation>> {
        let nd = ctx.dimensionality();
        if !(2..=3).contains(&nd) {
            return Err(MeasureError::DimensionalityNotSupported {
                feature,
                got: nd,
                min: 2,
                max: 3,
            });
        }
        let n_out = nd * (nd + 1) / 2;
        self.ndims = nd;
        self.width = nd + n_out + 1;
        self.n_objects = ctx.n_objects;
        self.records = Records::new(ctx.n_objects, self.width);
        self.scales = Vec::with_capacity(n_out);

        let mut out = Vec::with_capacity(n_out);
        for i in 0..nd {
            let pq = &ctx.pixel_size[i];
            self.scales.push(pq.magnitude * pq.magnitude);
            out.push(ValueInformation::new(
                format!("I{}{}", DIMS[i], DIMS[i]),
                &pq.units * &pq.units,
            ));
        }
        for i in 0..nd {
            for j in i + 1..nd {
                let (pi, pj) = (&ctx.pixel_size[i], &ctx.pixel_size[j]);
                self.scales.push(pi.magnitude * pj.magnitude);
                out.push(ValueInformation::new(
                    format!("I{}{}", DIMS[i], DIMS[j]),
                    &pi.units * &pj.units,
                ));
            }
        }
        Ok(out)
    }

    /// Accumulates one line; `weights` is `None` for the binary variant.
    fn scan_line(&mut self, line: &ScanLine<'_>, index: &ObjectIndex, weights: Option<&[f64]>) {
        let nd = self.ndims;
        let mut coord = [0.0f64; 3];
        for d in 1..nd {
            coord[d] = line.start[d] as f64;
        }
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
            let Some(r) = row else { continue };
            let w = weights.map_or(1.0, |g| g[j]);
            coord[0] = j as f64;
            let data = self.records.row_mut(r);
            for d in 0..nd {
                data[d] += coord[d] * w;
            }
            let mut k = nd;
            for a in 0..nd {
                for b in a..nd {
                    data[k] += coord[a] * coord[b] * w;
                    k += 1;
                }
            }
            data[k] += w;
        }
    }

    fn finish(&self, row: usize, output: &mut [f64]) {
        let n_out = self.width - self.ndims - 1;
        let d = self.records.row(row);
        let n = d[self.width - 1];
        if n == 0.0 {
            output[..n_out].fill(0.0);
            return;
        }
        if self.ndims == 2 {
            let x = d[0] / n;
            let y = d[1] / n;
            let xx = d[2] / n - x * x;
            let xy = d[3] / n - x * y;
            let yy = d[4] / n - y * y;
            output[0] = yy * self.scales[0];
            output[1] = xx * self.scales[1];
            output[2] = -xy * self.scales[2];
        } else {
            let x = d[0] / n;
            let y = d[1] / n;
            let z = d[2] / n;
            let xx = d[3] / n - x * x;
            let xy = d[4] / n - x * y;
            let xz = d[5] / n - x * z;
            let yy = d[6] / n - y * y;
            let yz = d[7] / n - y * z;
            let zz = d[8] / n - z * z;
            output[0] = (yy + zz) * self.scales[0];
            output[1] = (xx + zz) * self.scales[1];
            output[2] = (xx + yy) * self.scales[2];
            output[3] = -xy * self.scales[3];
            output[4] = -xz * self.scales[4];
            output[5] = -yz * self.scales[5];
        }
    }

    fn cleanup(&mut self) {
        self.records.clear();
        self.scales.clear();
    }

    fn split(&self) -> Self {
        Self {
            ndims: self.ndims,
            width: self.width,
            n_objects: self.n_objects,
            scales: self.scales.clone(),
            records: Records::new(self.n_objects, self.width),
        }
    }

    fn merge(&mut self, other: &Self) {
        self.records.merge_with(&other.records, |a, b| *a += *b);
    }
}

/// Inertia tensor of the binary object shape.
#[derive(Debug, Default)]
pub struct InertiaTensor {
    state: MomentState,
}

impl LineBased for InertiaTensor {
    fn name(&self) -> &'static str {
        "InertiaTensor"
    }

    fn initialize(&mut self, ctx: &ImageContext<'_>) -> MeasureResult<Vec<ValueInformation>> {
        self.state.initialize(ctx, "InertiaTensor")
    }

    fn scan_line(&mut self, line: &ScanLine<'_>, index: &ObjectIndex) {
        self.state.scan_line(line, index, None);
    }

    fn finish(&self, row: usize, output: &mut [f64]) {
        self.state.finish(row, output);
    }

    fn cleanup(&mut self) {
        self.state.cleanup();
    }

    fn split(&self) -> Box<dyn LineBased> {
        Box::new(InertiaTensor {
            state: self.state.split(),
        })
    }

    fn merge(&mut self, other: Box<dyn LineBased>) {
        let other = other
            .into_any()
            .downcast::<InertiaTensor>()
            .expect("merged partial must come from InertiaTensor::split");
        self.state.merge(&other.state);
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

/// Grey-weighted inertia tensor: same closed forms with the grey values as
/// pixel masses.
#[derive(Debug, Default)]
pub struct GreyInertiaTensor {
    state: MomentState,
}

impl LineBased for GreyInertiaTensor {
    fn name(&self) -> &'static str {
        "GreyInertiaTensor"
    }

    fn initialize(&mut self, ctx: &ImageContext<'_>) -> MeasureResult<Vec<ValueInformation>> {
        ctx.require_scalar_grey("GreyInertiaTensor")?;
        self.state.initialize(ctx, "GreyInertiaTensor")
    }

    fn scan_line(&mut self, line: &ScanLine<'_>, index: &ObjectIndex) {
        let Some(grey) = line.grey else { return };
        self.state.scan_line(line, index, Some(grey));
    }

    fn finish(&self, row: usize, output: &mut [f64]) {
        self.state.finish(row, output);
    }

    fn cleanup(&mut self) {
        self.state.cleanup();
    }

    fn split(&self) -> Box<dyn LineBased> {
        Box::new(GreyInertiaTensor {
            state: self.state.split(),
        })
    }

    fn merge(&mut self, other: Box<dyn LineBased>) {
        let other = other
            .into_any()
            .downcast::<GreyInertiaTensor>()
            .expect("merged partial must come from GreyInertiaTensor::split");
        self.state.merge(&other.state);
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::{PhysicalQuantity, Units};
    use approx::assert_relative_eq;

    fn pixel_sizes(n: usize) -> Vec<PhysicalQuantity> {
        (0..n).map(|_| PhysicalQuantity::pixel()).collect()
    }

    fn context<'a>(
        sizes: &'a [usize],
        pixel_size: &'a [PhysicalQuantity],
        n_objects: usize,
    ) -> ImageContext<'a> {
        ImageContext {
            sizes,
            pixel_size,
            grey_tensor_elements: Some(1),
            n_objects,
        }
    }

    fn scan_rows(feature: &mut dyn LineBased, rows: &[(&[u32], usize)], index: &ObjectIndex) {
        for &(labels, y) in rows {
            let start = [0, y];
            feature.scan_line(
                &ScanLine {
                    labels,
                    grey: None,
                    start: &start,
                },
                index,
            );
        }
    }

    #[test]
    fn column_names_follow_packed_order() {
        let ps = pixel_sizes(3);
        let mut f = InertiaTensor::default();
        let info = f
            .initialize(&context(&[4, 4, 4], &ps, 1))
            .expect("3d supported");
        let names: Vec<&str> = info.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, ["Ixx", "Iyy", "Izz", "Ixy", "Ixz", "Iyz"]);
    }

    #[test]
    fn one_dimensional_image_is_rejected() {
        let ps = pixel_sizes(1);
        let mut f = InertiaTensor::default();
        let err = f.initialize(&context(&[16], &ps, 1)).unwrap_err();
        assert!(matches!(
            err,
            MeasureError::DimensionalityNotSupported { got: 1, .. }
        ));
    }

    #[test]
    fn square_tensor_is_isotropic() {
        // 4x4 square: both diagonal entries (W^2 - 1) / 12, zero covariance.
        let ps = pixel_sizes(2);
        let mut f = InertiaTensor::default();
        f.initialize(&context(&[6, 6], &ps, 1)).expect("2d supported");
        let index = ObjectIndex::from_ids([1]);
        let row: &[u32] = &[0, 1, 1, 1, 1, 0];
        scan_rows(&mut f, &[(row, 1), (row, 2), (row, 3), (row, 4)], &index);

        let mut out = [0.0; 3];
        f.finish(0, &mut out);
        let expected = (16.0 - 1.0) / 12.0;
        assert_relative_eq!(out[0], expected, epsilon = 1e-12);
        assert_relative_eq!(out[1], expected, epsilon = 1e-12);
        assert_relative_eq!(out[2], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn rectangle_tensor_separates_axes() {
        // 5x3 rectangle: Ixx is the vertical variance, Iyy the horizontal one.
        let ps = pixel_sizes(2);
        let mut f = InertiaTensor::default();
        f.initialize(&context(&[7, 5], &ps, 1)).expect("2d supported");
        let index = ObjectIndex::from_ids([1]);
        let row: &[u32] = &[0, 1, 1, 1, 1, 1, 0];
        scan_rows(&mut f, &[(row, 1), (row, 2), (row, 3)], &index);

        let mut out = [0.0; 3];
        f.finish(0, &mut out);
        assert_relative_eq!(out[0], (9.0 - 1.0) / 12.0, epsilon = 1e-12);
        assert_relative_eq!(out[1], (25.0 - 1.0) / 12.0, epsilon = 1e-12);
        assert_relative_eq!(out[2], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn single_pixel_object_has_zero_tensor() {
        let ps = pixel_sizes(2);
        let mut f = InertiaTensor::default();
        f.initialize(&context(&[4, 4], &ps, 1)).expect("2d supported");
        let index = ObjectIndex::from_ids([3]);
        scan_rows(&mut f, &[(&[0, 0, 3, 0], 2)], &index);

        let mut out = [9.0; 3];
        f.finish(0, &mut out);
        assert_eq!(out, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn zero_mass_object_finishes_to_zeros() {
        let ps = pixel_sizes(2);
        let mut f = InertiaTensor::default();
        f.initialize(&context(&[4, 4], &ps, 1)).expect("2d supported");
        // No scan at all: the indexed object never appears in the image.
        let mut out = [7.0; 3];
        f.finish(0, &mut out);
        assert_eq!(out, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn physical_pixel_sizes_scale_entries_and_units() {
        let ps = vec![
            PhysicalQuantity::micrometers(2.0),
            PhysicalQuantity::micrometers(3.0),
        ];
        let mut f = InertiaTensor::default();
        let info = f.initialize(&context(&[4, 4], &ps, 1)).expect("2d supported");
        assert_eq!(info[0].units, Units::base("µm").powi(2));
        assert_eq!(info[2].units, Units::base("µm").powi(2));

        // 2x2 square: unscaled diagonal entries are 0.25.
        let index = ObjectIndex::from_ids([1]);
        let row: &[u32] = &[1, 1, 0, 0];
        scan_rows(&mut f, &[(row, 0), (row, 1)], &index);

        let mut out = [0.0; 3];
        f.finish(0, &mut out);
        assert_relative_eq!(out[0], 0.25 * 4.0, epsilon = 1e-12);
        assert_relative_eq!(out[1], 0.25 * 9.0, epsilon = 1e-12);
        assert_relative_eq!(out[2], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn box_3d_matches_closed_form() {
        // 2x3x4 box: diagonal entries are sums of the two transverse
        // variances (a^2 - 1) / 12.
        let ps = pixel_sizes(3);
        let mut f = InertiaTensor::default();
        f.initialize(&context(&[4, 5, 6], &ps, 1)).expect("3d supported");
        let index = ObjectIndex::from_ids([1]);
        let row: &[u32] = &[0, 1, 1, 0];
        for z in 1..5 {
            for y in 1..4 {
                let start = [0, y, z];
                f.scan_line(
                    &ScanLine {
                        labels: row,
                        grey: None,
                        start: &start,
                    },
                    &index,
                );
            }
        }

        let vx = (4.0 - 1.0) / 12.0;
        let vy = (9.0 - 1.0) / 12.0;
        let vz = (16.0 - 1.0) / 12.0;
        let mut out = [0.0; 6];
        f.finish(0, &mut out);
        assert_relative_eq!(out[0], vy + vz, epsilon = 1e-12);
        assert_relative_eq!(out[1], vx + vz, epsilon = 1e-12);
        assert_relative_eq!(out[2], vx + vy, epsilon = 1e-12);
        assert_relative_eq!(out[3], 0.0, epsilon = 1e-12);
        assert_relative_eq!(out[4], 0.0, epsilon = 1e-12);
        assert_relative_eq!(out[5], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn uniform_grey_matches_binary_tensor() {
        // Constant weight cancels in the normalized moments.
        let ps = pixel_sizes(2);
        let index = ObjectIndex::from_ids([1]);
        let labels: &[u32] = &[0, 1, 1, 1, 0];
        let grey = [2.5; 5];

        let mut binary = InertiaTensor::default();
        binary
            .initialize(&context(&[5, 3], &ps, 1))
            .expect("2d supported");
        let mut weighted = GreyInertiaTensor::default();
        weighted
            .initialize(&context(&[5, 3], &ps, 1))
            .expect("2d supported");

        for y in 0..2 {
            let start = [0, y];
            let line = ScanLine {
                labels,
                grey: Some(&grey),
                start: &start,
            };
            binary.scan_line(&line, &index);
            weighted.scan_line(&line, &index);
        }

        let mut a = [0.0; 3];
        let mut b = [0.0; 3];
        binary.finish(0, &mut a);
        weighted.finish(0, &mut b);
        for i in 0..3 {
            assert_relative_eq!(a[i], b[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn grey_variant_requires_grey_image() {
        let ps = pixel_sizes(2);
        let mut f = GreyInertiaTensor::default();
        let ctx = ImageContext {
            sizes: &[4, 4],
            pixel_size: &ps,
            grey_tensor_elements: None,
            n_objects: 1,
        };
        let err = f.initialize(&ctx).unwrap_err();
        assert!(matches!(err, MeasureError::MissingGreyImage(_)));
    }

    #[test]
    fn split_and_merge_match_single_scan() {
        let ps = pixel_sizes(2);
        let mut whole = InertiaTensor::default();
        whole
            .initialize(&context(&[6, 4], &ps, 1))
            .expect("2d supported");
        let index = ObjectIndex::from_ids([1]);
        let rows: [&[u32]; 4] = [
            &[0, 1, 1, 0, 0, 0],
            &[1, 1, 1, 1, 0, 0],
            &[0, 0, 1, 1, 1, 0],
            &[0, 0, 0, 1, 0, 0],
        ];

        let mut reference = InertiaTensor::default();
        reference
            .initialize(&context(&[6, 4], &ps, 1))
            .expect("2d supported");
        for (y, labels) in rows.iter().enumerate() {
            let start = [0, y];
            reference.scan_line(
                &ScanLine {
                    labels,
                    grey: None,
                    start: &start,
                },
                &index,
            );
        }

        let mut part = whole.split();
        for (y, labels) in rows.iter().enumerate() {
            let start = [0, y];
            let line = ScanLine {
                labels,
                grey: None,
                start: &start,
            };
            if y < 2 {
                whole.scan_line(&line, &index);
            } else {
                part.scan_line(&line, &index);
            }
        }
        whole.merge(part);

        let mut merged = [0.0; 3];
        let mut single = [0.0; 3];
        whole.finish(0, &mut merged);
        reference.finish(0, &mut single);
        for i in 0..3 {
            assert_relative_eq!(merged[i], single[i], epsilon = 1e-12);
        }
    }
}
