//! Synthetic image builders shared by the unit tests.

use crate::image::{GreyImage, LabelImage, NdImage};

/// Builds a 2D label image from a per-pixel function of `(x, y)`.
pub fn label_2d(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> u32) -> LabelImage {
    let mut data = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            data.push(f(x, y));
        }
    }
    NdImage::from_vec(vec![width, height], data).expect("sizes match data")
}

/// Builds a 2D grey-value image from a per-pixel function of `(x, y)`.
pub fn grey_2d(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> f64) -> GreyImage {
    let mut data = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            data.push(f(x, y));
        }
    }
    NdImage::from_vec(vec![width, height], data).expect("sizes match data")
}
