//! labelmetry — per-object measurement of labeled n-dimensional images.
//!
//! Given a label image (object id per pixel, 0 is background) and optionally
//! a matching grey-value image, the engine measures a configurable set of
//! features for every object in a single pass over the image:
//!
//! ```
//! use labelmetry::{measure, MeasureConfig, NdImage};
//!
//! # fn main() -> Result<(), labelmetry::MeasureError> {
//! // A 2x2 object in a 4x4 image.
//! let mut data = vec![0u32; 16];
//! for y in 1..3 {
//!     for x in 1..3 {
//!         data[x + 4 * y] = 1;
//!     }
//! }
//! let labels = NdImage::from_vec(vec![4, 4], data)?;
//!
//! let config = MeasureConfig::new(["Size", "InertiaTensor", "PrincipalMoments"]);
//! let result = measure(&labels, None, &config)?;
//! assert_eq!(result.value(1, "Size"), Some(&[4.0][..]));
//! # Ok(())
//! # }
//! ```
//!
//! Features are either *line-based* (they accumulate per-object state while
//! the image is scanned line by line) or *composite* (they compute their
//! values from the finished values of other features); see [`feature`] for
//! the protocols and the catalog. Line-based accumulation state is mergeable,
//! so the scan can run in parallel over disjoint line ranges with one state
//! per worker. Values carry unit metadata derived from the image's pixel
//! sizes; uncalibrated dimensions fall back to pixel units.

pub mod error;
pub mod feature;
pub mod image;
pub mod index;
pub mod measure;
pub mod records;
pub mod table;
pub mod units;

#[cfg(test)]
pub(crate) mod test_utils;

pub use error::{MeasureError, MeasureResult};
pub use image::{GreyImage, LabelImage, NdImage};
pub use index::ObjectIndex;
pub use measure::{measure, MeasureConfig};
pub use table::{FeatureColumns, Measurement};
pub use units::{PhysicalQuantity, Units, ValueInformation};
