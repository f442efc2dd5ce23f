//! Dense n-dimensional image container.
//!
//! Pixels are stored with dimension 0 fastest (stride 1), so every scan line
//! along dimension 0 is a contiguous slice. The measurement engine visits the
//! image strictly line by line; threads can own disjoint line ranges without
//! any coordination.

use crate::error::{MeasureError, MeasureResult};
use crate::units::PhysicalQuantity;

/// A dense image with `sizes.len()` dimensions and `tensor_elements`
/// interleaved samples per pixel.
#[derive(Debug, Clone)]
pub struct NdImage<T> {
    sizes: Vec<usize>,
    tensor_elements: usize,
    pixel_size: Vec<Option<PhysicalQuantity>>,
    data: Vec<T>,
}

/// Object-id image; 0 is background.
pub type LabelImage = NdImage<u32>;
/// Grey-value image paired with a label image for weighted features.
pub type GreyImage = NdImage<f64>;

impl<T> NdImage<T> {
    /// Builds a scalar image from its sizes and sample data.
    pub fn from_vec(sizes: Vec<usize>, data: Vec<T>) -> MeasureResult<Self> {
        Self::from_vec_tensor(sizes, 1, data)
    }

    /// Builds an image with `tensor_elements` interleaved samples per pixel.
    pub fn from_vec_tensor(
        sizes: Vec<usize>,
        tensor_elements: usize,
        data: Vec<T>,
    ) -> MeasureResult<Self> {
        if sizes.is_empty() {
            return Err(MeasureError::ZeroDimensional);
        }
        let expected = sizes.iter().product::<usize>() * tensor_elements;
        if data.len() != expected {
            return Err(MeasureError::SizeMismatch {
                expected,
                got: data.len(),
            });
        }
        let dims = sizes.len();
        Ok(Self {
            sizes,
            tensor_elements,
            pixel_size: vec![None; dims],
            data,
        })
    }

    /// Attaches per-dimension pixel sizes; `None` marks an uncalibrated
    /// dimension.
    pub fn with_pixel_size(
        mut self,
        pixel_size: Vec<Option<PhysicalQuantity>>,
    ) -> MeasureResult<Self> {
        if pixel_size.len() != self.sizes.len() {
            return Err(MeasureError::PixelSizeMismatch {
                expected: self.sizes.len(),
                got: pixel_size.len(),
            });
        }
        self.pixel_size = pixel_size;
        Ok(self)
    }

    pub fn dimensionality(&self) -> usize {
        self.sizes.len()
    }

    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    pub fn tensor_elements(&self) -> usize {
        self.tensor_elements
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Pixel size along `dim`, falling back to the pixel sentinel when the
    /// dimension carries no calibration.
    pub fn pixel_size(&self, dim: usize) -> PhysicalQuantity {
        self.pixel_size[dim]
            .clone()
            .unwrap_or_else(PhysicalQuantity::pixel)
    }

    /// All pixel sizes with the fallback applied.
    pub fn resolved_pixel_sizes(&self) -> Vec<PhysicalQuantity> {
        (0..self.sizes.len()).map(|d| self.pixel_size(d)).collect()
    }

    /// Number of scan lines along dimension 0.
    pub fn line_count(&self) -> usize {
        self.sizes[1..].iter().product()
    }

    /// Samples of line `line`, contiguous along dimension 0.
    pub fn line_data(&self, line: usize) -> &[T] {
        let w = self.sizes[0] * self.tensor_elements;
        &self.data[line * w..(line + 1) * w]
    }

    /// Writes the start coordinates of line `line` into `coords`
    /// (`coords[0]` is always 0).
    pub fn line_start(&self, line: usize, coords: &mut [usize]) {
        coords[0] = 0;
        let mut rem = line;
        for d in 1..self.sizes.len() {
            coords[d] = rem % self.sizes[d];
            rem /= self.sizes[d];
        }
    }

    /// Start coordinates and samples of line `line`.
    pub fn line(&self, line: usize) -> (Vec<usize>, &[T]) {
        let mut coords = vec![0; self.sizes.len()];
        self.line_start(line, &mut coords);
        (coords, self.line_data(line))
    }
}
