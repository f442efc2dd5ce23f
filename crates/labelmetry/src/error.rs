//! Error types for the measurement engine.

use labelmetry_core::KernelError;
use thiserror::Error;

/// Convenience alias used throughout the engine.
pub type MeasureResult<T> = Result<T, MeasureError>;

/// Errors raised while configuring or running a measurement.
///
/// A measurement run fails atomically: the first error aborts the run and no
/// partial result is returned.
#[derive(Debug, Error)]
pub enum MeasureError {
    /// Image data length does not match the product of the sizes.
    #[error("image data holds {got} samples, sizes require {expected}")]
    SizeMismatch { expected: usize, got: usize },
    /// An image was constructed without dimensions.
    #[error("image must have at least one dimension")]
    ZeroDimensional,
    /// The per-dimension pixel size list does not match the dimensionality.
    #[error("pixel size has {got} entries for a {expected}-dimensional image")]
    PixelSizeMismatch { expected: usize, got: usize },
    /// An input image carries more than one sample per pixel.
    #[error("{context} image must be scalar, got {tensor_elements} samples per pixel")]
    NotScalar {
        context: &'static str,
        tensor_elements: usize,
    },
    /// A feature does not support the image dimensionality.
    #[error("feature '{feature}' supports {min}..={max} dimensions, image has {got}")]
    DimensionalityNotSupported {
        feature: &'static str,
        got: usize,
        min: usize,
        max: usize,
    },
    /// A requested feature name is not in the registry.
    #[error("unknown feature '{0}'")]
    UnknownFeature(String),
    /// A composite feature depends on a feature that was not requested.
    #[error("feature '{feature}' depends on '{dependency}', which is not part of the measurement")]
    UnresolvedDependency {
        feature: &'static str,
        dependency: &'static str,
    },
    /// The requested features form a dependency cycle.
    #[error("dependency cycle involving feature '{0}'")]
    DependencyCycle(String),
    /// The label and grey-value images have different sizes.
    #[error("label and grey-value images have different sizes")]
    ShapeMismatch,
    /// A grey-value feature was requested without a grey-value image.
    #[error("feature '{0}' requires a grey-value image")]
    MissingGreyImage(&'static str),
    /// A linear-algebra kernel failed inside a composite feature.
    #[error(transparent)]
    Kernel(#[from] KernelError),
}
