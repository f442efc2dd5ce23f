//! Measurement assembly: runs a set of features over a labeled image.
//!
//! The run is staged: index the objects, instantiate and initialize the
//! requested features, lay out the result table, scan the image once (line by
//! line, optionally in parallel over disjoint line ranges), finish the
//! line-based features per object, then compose the composite features in
//! dependency order. Any configuration or initialization error aborts the run
//! with no partial result.

use std::collections::{HashMap, HashSet};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{MeasureError, MeasureResult};
use crate::feature::{self, Feature, ImageContext, LineBased, ScanLine};
use crate::image::{GreyImage, LabelImage};
use crate::index::ObjectIndex;
use crate::table::{ColumnResolver, FeatureColumns, Measurement};

/// Measurement run configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeasureConfig {
    /// Feature names to measure, in output-column order. Composite features
    /// require their dependencies to be listed too.
    pub features: Vec<String>,
    /// Scan the image with one accumulation state per worker thread.
    #[serde(default)]
    pub parallel: bool,
}

impl MeasureConfig {
    pub fn new(features: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            features: features.into_iter().map(Into::into).collect(),
            parallel: false,
        }
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

/// Measures the configured features for every object in `labels`.
///
/// `grey` supplies per-pixel weights and values for the grey features; it
/// must match the label image's sizes. Objects are the distinct non-zero ids
/// of the label image.
pub fn measure(
    labels: &LabelImage,
    grey: Option<&GreyImage>,
    config: &MeasureConfig,
) -> MeasureResult<Measurement> {
    if labels.tensor_elements() != 1 {
        return Err(MeasureError::NotScalar {
            context: "label",
            tensor_elements: labels.tensor_elements(),
        });
    }
    if let Some(g) = grey {
        if g.sizes() != labels.sizes() {
            return Err(MeasureError::ShapeMismatch);
        }
    }

    let index = ObjectIndex::from_label_image(labels);

    let mut features = Vec::with_capacity(config.features.len());
    let mut seen = HashSet::new();
    for name in &config.features {
        if !seen.insert(name.as_str()) {
            continue;
        }
        features.push(feature::create(name)?);
    }
    let levels = dependency_levels(&features)?;

    let pixel_size = labels.resolved_pixel_sizes();
    let ctx = ImageContext {
        sizes: labels.sizes(),
        pixel_size: &pixel_size,
        grey_tensor_elements: grey.map(|g| g.tensor_elements()),
        n_objects: index.len(),
    };

    let mut columns: Vec<FeatureColumns> = Vec::with_capacity(features.len());
    let mut row_width = 0usize;
    for f in features.iter_mut() {
        let values = f.initialize(&ctx)?;
        let width = values.len();
        columns.push(FeatureColumns {
            feature: f.name().to_owned(),
            offset: row_width,
            values,
        });
        row_width += width;
    }

    debug!(
        objects = index.len(),
        features = features.len(),
        row_width,
        "measurement initialized"
    );

    {
        let resolver = ColumnResolver::new(&columns);
        for f in features.iter_mut() {
            if let Feature::Composite(c) = f {
                c.bind(&resolver)?;
            }
        }
    }

    let line_count = labels.line_count();
    if config.parallel && line_count > 1 {
        scan_parallel(labels, grey, &index, &mut features);
    } else {
        scan_sequential(labels, grey, &index, &mut features);
    }
    debug!(lines = line_count, parallel = config.parallel, "scan complete");

    let n_objects = index.len();
    let mut data = vec![0.0f64; n_objects * row_width];
    for (f, col) in features.iter().zip(&columns) {
        if let Feature::Line(lb) = f {
            let (offset, width) = (col.offset, col.len());
            for r in 0..n_objects {
                let start = r * row_width + offset;
                lb.finish(r, &mut data[start..start + width]);
            }
        }
    }

    // Composites run in dependency-level order so each one reads finished
    // values only.
    let mut order: Vec<usize> = (0..features.len())
        .filter(|&i| matches!(features[i], Feature::Composite(_)))
        .collect();
    order.sort_by_key(|&i| levels[i]);
    let mut scratch_row = vec![0.0f64; row_width];
    let mut scratch_out = vec![0.0f64; row_width];
    for &i in &order {
        let Feature::Composite(c) = &features[i] else {
            continue;
        };
        let (offset, width) = (columns[i].offset, columns[i].len());
        for r in 0..n_objects {
            scratch_row.copy_from_slice(&data[r * row_width..(r + 1) * row_width]);
            c.compose(&scratch_row, &mut scratch_out[..width])?;
            let start = r * row_width + offset;
            data[start..start + width].copy_from_slice(&scratch_out[..width]);
        }
    }

    for f in features.iter_mut() {
        if let Feature::Line(lb) = f {
            lb.cleanup();
        }
    }

    Ok(Measurement::new(
        index.ids().to_vec(),
        columns,
        row_width,
        data,
    ))
}

/// Dependency level per feature: 0 for line-based features, one more than the
/// deepest dependency for composites. Rejects unknown dependency names and
/// cycles.
fn dependency_levels(features: &[Feature]) -> MeasureResult<Vec<usize>> {
    let by_name: HashMap<&str, usize> = features
        .iter()
        .enumerate()
        .map(|(i, f)| (f.name(), i))
        .collect();
    let mut levels = vec![None; features.len()];
    let mut in_progress = vec![false; features.len()];
    for i in 0..features.len() {
        level_of(i, features, &by_name, &mut levels, &mut in_progress)?;
    }
    Ok(levels.into_iter().map(|l| l.unwrap_or(0)).collect())
}

fn level_of(
    i: usize,
    features: &[Feature],
    by_name: &HashMap<&str, usize>,
    levels: &mut [Option<usize>],
    in_progress: &mut [bool],
) -> MeasureResult<usize> {
    if let Some(level) = levels[i] {
        return Ok(level);
    }
    if in_progress[i] {
        return Err(MeasureError::DependencyCycle(features[i].name().to_owned()));
    }
    in_progress[i] = true;
    let mut level = 0;
    for &dep in features[i].dependencies() {
        let &j = by_name
            .get(dep)
            .ok_or(MeasureError::UnresolvedDependency {
                feature: features[i].name(),
                dependency: dep,
            })?;
        level = level.max(level_of(j, features, by_name, levels, in_progress)? + 1);
    }
    in_progress[i] = false;
    levels[i] = Some(level);
    Ok(level)
}

fn scan_sequential(
    labels: &LabelImage,
    grey: Option<&GreyImage>,
    index: &ObjectIndex,
    features: &mut [Feature],
) {
    let ndims = labels.dimensionality();
    let mut start = vec![0usize; ndims];
    for i in 0..labels.line_count() {
        labels.line_start(i, &mut start);
        let line = ScanLine {
            labels: labels.line_data(i),
            grey: grey.map(|g| g.line_data(i)),
            start: &start,
        };
        for f in features.iter_mut() {
            if let Feature::Line(lb) = f {
                lb.scan_line(&line, index);
            }
        }
    }
}

/// Parallel scan: rayon folds disjoint line ranges into per-worker feature
/// clones, then reduces the partial accumulation states pairwise with each
/// feature's merge operation.
fn scan_parallel(
    labels: &LabelImage,
    grey: Option<&GreyImage>,
    index: &ObjectIndex,
    features: &mut [Feature],
) {
    let prototypes: Vec<&dyn LineBased> = features
        .iter()
        .filter_map(|f| match f {
            Feature::Line(lb) => Some(lb.as_ref()),
            Feature::Composite(_) => None,
        })
        .collect();
    if prototypes.is_empty() {
        return;
    }

    let ndims = labels.dimensionality();
    let merged = (0..labels.line_count())
        .into_par_iter()
        .fold(
            || prototypes.iter().map(|p| p.split()).collect::<Vec<_>>(),
            |mut locals, i| {
                let mut start = vec![0usize; ndims];
                labels.line_start(i, &mut start);
                let line = ScanLine {
                    labels: labels.line_data(i),
                    grey: grey.map(|g| g.line_data(i)),
                    start: &start,
                };
                for lb in locals.iter_mut() {
                    lb.scan_line(&line, index);
                }
                locals
            },
        )
        .reduce(
            || prototypes.iter().map(|p| p.split()).collect::<Vec<_>>(),
            |mut left, right| {
                for (a, b) in left.iter_mut().zip(right) {
                    a.merge(b);
                }
                left
            },
        );
    drop(prototypes);

    let mut parts = merged.into_iter();
    for f in features.iter_mut() {
        if let Feature::Line(lb) = f {
            if let Some(part) = parts.next() {
                lb.merge(part);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::NdImage;
    use crate::test_utils::{grey_2d, label_2d};
    use crate::units::{PhysicalQuantity, Units};
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn all_features() -> Vec<&'static str> {
        vec![
            "Size",
            "InertiaTensor",
            "GreyInertiaTensor",
            "GreyStatistics",
            "GreyExtrema",
            "PrincipalMoments",
            "PrincipalAxes",
        ]
    }

    #[test]
    fn square_measurement_end_to_end() {
        // 4x4 square of id 1 plus a single pixel of id 7.
        let labels = label_2d(8, 8, |x, y| {
            if (2..6).contains(&x) && (2..6).contains(&y) {
                1
            } else if x == 7 && y == 7 {
                7
            } else {
                0
            }
        });
        let config = MeasureConfig::new(["Size", "InertiaTensor", "PrincipalMoments"]);
        let m = measure(&labels, None, &config).expect("measurement succeeds");

        assert_eq!(m.objects(), &[1, 7]);
        assert_relative_eq!(m.value(1, "Size").expect("size measured")[0], 16.0);
        assert_relative_eq!(m.value(7, "Size").expect("size measured")[0], 1.0);

        let expected = (16.0 - 1.0) / 12.0;
        let tensor = m.value(1, "InertiaTensor").expect("tensor measured");
        assert_relative_eq!(tensor[0], expected, epsilon = 1e-12);
        assert_relative_eq!(tensor[1], expected, epsilon = 1e-12);
        assert_relative_eq!(tensor[2], 0.0, epsilon = 1e-12);

        let moments = m.value(1, "PrincipalMoments").expect("moments measured");
        assert_relative_eq!(moments[0], expected, epsilon = 1e-12);
        assert_relative_eq!(moments[1], expected, epsilon = 1e-12);

        // The single-pixel object has a zero tensor and zero moments.
        let tensor = m.value(7, "InertiaTensor").expect("tensor measured");
        assert_eq!(tensor, &[0.0, 0.0, 0.0]);
        let moments = m.value(7, "PrincipalMoments").expect("moments measured");
        assert_eq!(moments, &[0.0, 0.0]);
    }

    #[test]
    fn rectangle_axes_are_axis_aligned() {
        // 7x3 rectangle: distinct eigenvalues, so the axes are determined up
        // to sign.
        let labels = label_2d(9, 5, |x, y| {
            u32::from((1..8).contains(&x) && (1..4).contains(&y))
        });
        let config = MeasureConfig::new(["InertiaTensor", "PrincipalMoments", "PrincipalAxes"]);
        let m = measure(&labels, None, &config).expect("measurement succeeds");

        let moments = m.value(1, "PrincipalMoments").expect("moments measured");
        assert_relative_eq!(moments[0], (49.0 - 1.0) / 12.0, epsilon = 1e-12);
        assert_relative_eq!(moments[1], (9.0 - 1.0) / 12.0, epsilon = 1e-12);

        // Largest moment is about the horizontal spread: its axis is +/- e_y.
        let axes = m.value(1, "PrincipalAxes").expect("axes measured");
        assert_relative_eq!(axes[0].abs(), 0.0, epsilon = 1e-10);
        assert_relative_eq!(axes[1].abs(), 1.0, epsilon = 1e-10);
        assert_relative_eq!(axes[2].abs(), 1.0, epsilon = 1e-10);
        assert_relative_eq!(axes[3].abs(), 0.0, epsilon = 1e-10);
    }

    #[test]
    fn grey_features_on_known_values() {
        let labels = label_2d(5, 1, |_, _| 1);
        let grey = grey_2d(5, 1, |x, _| (x + 1) as f64);
        let config = MeasureConfig::new(["GreyStatistics", "GreyExtrema", "GreyInertiaTensor"]);
        let m = measure(&labels, Some(&grey), &config).expect("measurement succeeds");

        let stats = m.value(1, "GreyStatistics").expect("stats measured");
        assert_relative_eq!(stats[0], 3.0, epsilon = 1e-12);
        assert_relative_eq!(stats[1], 2.5f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(stats[2], 0.0, epsilon = 1e-12);
        assert_relative_eq!(stats[3], -1.2, epsilon = 1e-12);

        let extrema = m.value(1, "GreyExtrema").expect("extrema measured");
        assert_relative_eq!(extrema[0], 1.0);
        assert_relative_eq!(extrema[1], 5.0);
    }

    #[test]
    fn parallel_scan_matches_sequential() {
        let mut rng = StdRng::seed_from_u64(42);
        let labels = label_2d(64, 33, |_, _| rng.gen_range(0..6));
        let mut rng = StdRng::seed_from_u64(7);
        let grey = grey_2d(64, 33, |_, _| rng.gen::<f64>() * 10.0 - 3.0);

        let config = MeasureConfig::new(all_features());
        let sequential = measure(&labels, Some(&grey), &config).expect("sequential run");
        let parallel = measure(&labels, Some(&grey), &config.clone().with_parallel(true))
            .expect("parallel run");

        assert_eq!(sequential.objects(), parallel.objects());
        assert_eq!(sequential.row_width(), parallel.row_width());
        for r in 0..sequential.objects().len() {
            for (a, b) in sequential.row(r).iter().zip(parallel.row(r)) {
                assert_relative_eq!(*a, *b, epsilon = 1e-9, max_relative = 1e-9);
            }
        }
    }

    #[test]
    fn physical_calibration_scales_values_and_units() {
        let labels = label_2d(4, 4, |x, y| u32::from(x < 2 && y < 2))
            .with_pixel_size(vec![
                Some(PhysicalQuantity::micrometers(2.0)),
                Some(PhysicalQuantity::micrometers(3.0)),
            ])
            .expect("pixel size matches dimensionality");
        let config = MeasureConfig::new(["Size", "InertiaTensor"]);
        let m = measure(&labels, None, &config).expect("measurement succeeds");

        assert_relative_eq!(m.value(1, "Size").expect("size measured")[0], 24.0);
        let size_units = &m.feature_columns("Size").expect("size column").values[0].units;
        assert_eq!(*size_units, Units::base("µm").powi(2));

        let tensor = m.value(1, "InertiaTensor").expect("tensor measured");
        assert_relative_eq!(tensor[0], 0.25 * 4.0, epsilon = 1e-12);
        assert_relative_eq!(tensor[1], 0.25 * 9.0, epsilon = 1e-12);
    }

    #[test]
    fn background_only_image_yields_empty_measurement() {
        let labels = label_2d(4, 4, |_, _| 0);
        let config = MeasureConfig::new(["Size", "InertiaTensor"]);
        let m = measure(&labels, None, &config).expect("measurement succeeds");
        assert!(m.objects().is_empty());
        assert_eq!(m.columns().len(), 2);
        assert_eq!(m.row_width(), 4);
    }

    #[test]
    fn three_dimensional_box() {
        let mut data = vec![0u32; 4 * 5 * 6];
        for z in 1..5 {
            for y in 1..4 {
                for x in 1..3 {
                    data[x + 4 * (y + 5 * z)] = 1;
                }
            }
        }
        let labels = NdImage::from_vec(vec![4, 5, 6], data).expect("sizes match data");
        let config = MeasureConfig::new(["Size", "InertiaTensor", "PrincipalMoments"]);
        let m = measure(&labels, None, &config).expect("measurement succeeds");

        assert_relative_eq!(m.value(1, "Size").expect("size measured")[0], 24.0);
        let vx = (4.0 - 1.0) / 12.0;
        let vy = (9.0 - 1.0) / 12.0;
        let vz = (16.0 - 1.0) / 12.0;
        let tensor = m.value(1, "InertiaTensor").expect("tensor measured");
        assert_relative_eq!(tensor[0], vy + vz, epsilon = 1e-12);
        assert_relative_eq!(tensor[1], vx + vz, epsilon = 1e-12);
        assert_relative_eq!(tensor[2], vx + vy, epsilon = 1e-12);

        // Diagonal tensor: principal moments are the sorted diagonal.
        let moments = m.value(1, "PrincipalMoments").expect("moments measured");
        assert_relative_eq!(moments[0], vy + vz, epsilon = 1e-12);
        assert_relative_eq!(moments[1], vx + vz, epsilon = 1e-12);
        assert_relative_eq!(moments[2], vx + vy, epsilon = 1e-12);
    }

    #[test]
    fn configuration_errors_abort_the_run() {
        let labels = label_2d(4, 4, |_, _| 1);

        let err = measure(&labels, None, &MeasureConfig::new(["Volume"])).unwrap_err();
        assert!(matches!(err, MeasureError::UnknownFeature(_)));

        let err = measure(&labels, None, &MeasureConfig::new(["PrincipalMoments"])).unwrap_err();
        assert!(matches!(
            err,
            MeasureError::UnresolvedDependency {
                feature: "PrincipalMoments",
                dependency: "InertiaTensor",
            }
        ));

        let err = measure(&labels, None, &MeasureConfig::new(["GreyStatistics"])).unwrap_err();
        assert!(matches!(err, MeasureError::MissingGreyImage(_)));

        let grey = grey_2d(3, 3, |_, _| 0.0);
        let err = measure(&labels, Some(&grey), &MeasureConfig::new(["Size"])).unwrap_err();
        assert!(matches!(err, MeasureError::ShapeMismatch));
    }

    #[test]
    fn duplicate_feature_requests_are_collapsed() {
        let labels = label_2d(4, 4, |_, _| 1);
        let config = MeasureConfig::new(["Size", "Size"]);
        let m = measure(&labels, None, &config).expect("measurement succeeds");
        assert_eq!(m.columns().len(), 1);
        assert_eq!(m.row_width(), 1);
    }

    #[test]
    fn grey_weighting_shifts_the_tensor() {
        // A 3x1 object with all mass on the outer pixels has a larger
        // horizontal moment than the uniform one.
        let labels = label_2d(5, 3, |x, y| u32::from((1..4).contains(&x) && y == 1));
        let uniform = grey_2d(5, 3, |_, _| 1.0);
        let peaked = grey_2d(5, 3, |x, _| if x == 2 { 0.1 } else { 1.0 });
        let config = MeasureConfig::new(["GreyInertiaTensor"]);

        let a = measure(&labels, Some(&uniform), &config).expect("uniform run");
        let b = measure(&labels, Some(&peaked), &config).expect("peaked run");
        let iyy_uniform = a.value(1, "GreyInertiaTensor").expect("tensor")[1];
        let iyy_peaked = b.value(1, "GreyInertiaTensor").expect("tensor")[1];
        assert!(iyy_peaked > iyy_uniform);
    }
}
