//! Feature protocols and the feature registry.
//!
//! A measurement feature is either **line-based** (accumulates per-object
//! state while the images are scanned line by line, then converts the state
//! to output values) or **composite** (computes its values from the finished
//! values of other features). The assembler in [`crate::measure`] drives the
//! lifecycle; features never see whole images, only scan lines and rows.

use std::any::Any;
use std::fmt;

use crate::error::{MeasureError, MeasureResult};
use crate::index::ObjectIndex;
use crate::table::ColumnResolver;
use crate::units::{PhysicalQuantity, ValueInformation};

mod inertia;
mod principal;
mod size;
mod statistics;

pub use inertia::{GreyInertiaTensor, InertiaTensor};
pub use principal::{PrincipalAxes, PrincipalMoments};
pub use size::Size;
pub use statistics::{GreyExtrema, GreyStatistics};

/// Image properties features validate against and allocate from.
pub struct ImageContext<'a> {
    /// Label image sizes (grey sizes are identical when grey is present).
    pub sizes: &'a [usize],
    /// Per-dimension pixel size with the pixel fallback already applied.
    pub pixel_size: &'a [PhysicalQuantity],
    /// Samples per pixel of the grey image, `None` when no grey image was
    /// supplied.
    pub grey_tensor_elements: Option<usize>,
    /// Number of indexed objects; sizes the per-object record tables.
    pub n_objects: usize,
}

impl ImageContext<'_> {
    pub fn dimensionality(&self) -> usize {
        self.sizes.len()
    }

    /// Checks that a scalar grey image is available for `feature`.
    pub fn require_scalar_grey(&self, feature: &'static str) -> MeasureResult<()> {
        match self.grey_tensor_elements {
            None => Err(MeasureError::MissingGreyImage(feature)),
            Some(1) => Ok(()),
            Some(tensor_elements) => Err(MeasureError::NotScalar {
                context: "grey",
                tensor_elements,
            }),
        }
    }
}

/// One scan line, contiguous along dimension 0.
pub struct ScanLine<'a> {
    /// Object id per pixel.
    pub labels: &'a [u32],
    /// Grey value per pixel, when a grey image was supplied.
    pub grey: Option<&'a [f64]>,
    /// Coordinates of the first pixel; `start[0]` is always 0.
    pub start: &'a [usize],
}

/// A feature that accumulates per-object state during the image scan.
///
/// Lifecycle: `initialize` (validate, allocate records, declare output
/// columns), then `scan_line` once per line, then `finish` once per object,
/// then `cleanup`. For a parallel scan the assembler calls `split` to give
/// each worker a zeroed clone and `merge` to fold the workers' partial state
/// back together; `scan_line` therefore has no error path and `finish` must
/// write zeros when an object accumulated no mass.
pub trait LineBased: Send + Sync {
    fn name(&self) -> &'static str;

    fn initialize(&mut self, ctx: &ImageContext<'_>) -> MeasureResult<Vec<ValueInformation>>;

    /// Accumulates one scan line. Pixels with id 0 or an id missing from the
    /// index are skipped.
    fn scan_line(&mut self, line: &ScanLine<'_>, index: &ObjectIndex);

    /// Converts the accumulated state of object row `row` into output values.
    fn finish(&self, row: usize, output: &mut [f64]);

    /// Releases accumulation storage once all values are written.
    fn cleanup(&mut self);

    /// A clone with the same run configuration and zeroed records, for one
    /// scan worker.
    fn split(&self) -> Box<dyn LineBased>;

    /// Folds a worker's partial state (produced by `split`) into `self`.
    fn merge(&mut self, other: Box<dyn LineBased>);

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
}

/// A feature computed from the finished values of other features.
///
/// `bind` resolves the dependency column offsets once, after the table layout
/// is known and before any `compose` call.
pub trait Composite: Send + Sync {
    fn name(&self) -> &'static str;

    fn initialize(&mut self, ctx: &ImageContext<'_>) -> MeasureResult<Vec<ValueInformation>>;

    /// Names of the features this one reads. They must be part of the same
    /// measurement.
    fn dependencies(&self) -> &[&'static str];

    /// Resolves and caches the dependency column offsets.
    fn bind(&mut self, resolver: &ColumnResolver<'_>) -> MeasureResult<()>;

    /// Computes this feature's values for one object. `row` is the object's
    /// full result row with all dependencies finished.
    fn compose(&self, row: &[f64], output: &mut [f64]) -> MeasureResult<()>;
}

/// Closed feature dispatch: the assembler only distinguishes the two
/// protocols, never concrete features.
pub enum Feature {
    Line(Box<dyn LineBased>),
    Composite(Box<dyn Composite>),
}

impl Feature {
    pub fn name(&self) -> &'static str {
        match self {
            Feature::Line(f) => f.name(),
            Feature::Composite(f) => f.name(),
        }
    }

    pub fn dependencies(&self) -> &[&'static str] {
        match self {
            Feature::Line(_) => &[],
            Feature::Composite(f) => f.dependencies(),
        }
    }

    pub fn initialize(&mut self, ctx: &ImageContext<'_>) -> MeasureResult<Vec<ValueInformation>> {
        match self {
            Feature::Line(f) => f.initialize(ctx),
            Feature::Composite(f) => f.initialize(ctx),
        }
    }
}

impl fmt::Debug for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feature::Line(inner) => write!(f, "Line({})", inner.name()),
            Feature::Composite(inner) => write!(f, "Composite({})", inner.name()),
        }
    }
}

/// Names accepted by [`create`].
pub fn known_features() -> &'static [&'static str] {
    &[
        "Size",
        "InertiaTensor",
        "GreyInertiaTensor",
        "GreyStatistics",
        "GreyExtrema",
        "PrincipalMoments",
        "PrincipalAxes",
    ]
}

/// Instantiates a feature by name.
pub fn create(name: &str) -> MeasureResult<Feature> {
    match name {
        "Size" => Ok(Feature::Line(Box::new(Size::default()))),
        "InertiaTensor" => Ok(Feature::Line(Box::new(InertiaTensor::default()))),
        "GreyInertiaTensor" => Ok(Feature::Line(Box::new(GreyInertiaTensor::default()))),
        "GreyStatistics" => Ok(Feature::Line(Box::new(GreyStatistics::default()))),
        "GreyExtrema" => Ok(Feature::Line(Box::new(GreyExtrema::default()))),
        "PrincipalMoments" => Ok(Feature::Composite(Box::new(PrincipalMoments::default()))),
        "PrincipalAxes" => Ok(Feature::Composite(Box::new(PrincipalAxes::default()))),
        _ => Err(MeasureError::UnknownFeature(name.to_owned())),
    }
}
