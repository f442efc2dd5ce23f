//! Dense linear-algebra kernels for small matrices.
//!
//! All kernels operate on flat **column-major** buffers with explicit
//! dimension arguments; element `(r, c)` of an `m × n` matrix lives at
//! `buffer[c * m + r]`. Outputs are written into caller-pre-sized slices
//! instead of being allocated per call, so measurement inner loops can reuse
//! scratch buffers across objects and pixels. Buffer-length mismatches are
//! programming errors and panic; genuine failure modes (unsupported packed
//! dimensionality, singular input) are reported as [`KernelError`].

mod decomp;
mod eigen;

pub use decomp::{
    determinant, determinant_diagonal, inverse, pseudo_inverse, rank,
    singular_value_decomposition, trace, trace_diagonal,
};
pub use eigen::{eigen, eigen_complex, symmetric_eigen, symmetric_eigen_packed};

use thiserror::Error;

/// Errors reported by the small-matrix kernels.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// Packed symmetric storage is only defined for 2×2 and 3×3 matrices.
    #[error("unsupported matrix dimensionality {0} (expected 2 or 3)")]
    UnsupportedDimensionality(usize),
    /// The input matrix is singular (or numerically rank-deficient).
    #[error("matrix is singular")]
    Singular,
    /// The iterative eigenvalue computation did not converge.
    #[error("eigendecomposition did not converge")]
    Convergence,
}
