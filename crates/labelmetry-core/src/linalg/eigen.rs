//! Eigendecompositions of small symmetric and general matrices.

use nalgebra::{Complex, DMatrix, DVector};

use super::KernelError;

/// Eigenvalues (and optionally eigenvectors) of a symmetric real matrix.
///
/// `input` holds `n * n` values in column-major order; only the lower
/// triangle is read. Eigenvalues are written to `lambdas` sorted largest to
/// smallest. When `vectors` is `Some`, the `n` eigenvectors are written as
/// consecutive length-`n` blocks (`&vectors[0]`, `&vectors[n]`, …), matching
/// the eigenvalue order; `None` skips the eigenvector computation entirely.
pub fn symmetric_eigen(n: usize, input: &[f64], lambdas: &mut [f64], vectors: Option<&mut [f64]>) {
    assert!(input.len() >= n * n, "input must hold n*n values");
    assert!(lambdas.len() >= n, "lambdas must hold n values");

    // Mirror the lower triangle into a full symmetric matrix.
    let mut m = DMatrix::<f64>::zeros(n, n);
    for c in 0..n {
        for r in c..n {
            let v = input[c * n + r];
            m[(r, c)] = v;
            m[(c, r)] = v;
        }
    }

    let se = m.symmetric_eigen();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        se.eigenvalues[b]
            .partial_cmp(&se.eigenvalues[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    for (k, &i) in order.iter().enumerate() {
        lambdas[k] = se.eigenvalues[i];
    }
    if let Some(out) = vectors {
        assert!(out.len() >= n * n, "vectors must hold n*n values");
        for (k, &i) in order.iter().enumerate() {
            for r in 0..n {
                out[k * n + r] = se.eigenvectors[(r, i)];
            }
        }
    }
}

/// Like [`symmetric_eigen`], but the matrix is given in packed triangular
/// form holding only the unique values:
///
/// - `n == 2`: `{xx, yy, xy}`
/// - `n == 3`: `{xx, yy, zz, xy, xz, yz}`
///
/// Any other `n` fails with [`KernelError::UnsupportedDimensionality`].
pub fn symmetric_eigen_packed(
    n: usize,
    packed: &[f64],
    lambdas: &mut [f64],
    vectors: Option<&mut [f64]>,
) -> Result<(), KernelError> {
    let mut full = [0.0_f64; 9];
    match n {
        2 => {
            assert!(packed.len() >= 3, "packed 2x2 input must hold 3 values");
            full[0] = packed[0]; // xx
            full[1] = packed[2]; // xy
            full[3] = packed[1]; // yy
        }
        3 => {
            assert!(packed.len() >= 6, "packed 3x3 input must hold 6 values");
            full[0] = packed[0]; // xx
            full[1] = packed[3]; // xy
            full[2] = packed[4]; // xz
            full[4] = packed[1]; // yy
            full[5] = packed[5]; // yz
            full[8] = packed[2]; // zz
        }
        _ => return Err(KernelError::UnsupportedDimensionality(n)),
    }
    symmetric_eigen(n, &full[..n * n], lambdas, vectors);
    Ok(())
}

/// Eigenvalues (and optionally eigenvectors) of a general square real matrix.
///
/// `input` holds `n * n` values in column-major order. Eigenvalues and
/// eigenvectors are complex and carry no ordering guarantee. Eigenvector
/// blocks are laid out as in [`symmetric_eigen`].
pub fn eigen(
    n: usize,
    input: &[f64],
    lambdas: &mut [Complex<f64>],
    vectors: Option<&mut [Complex<f64>]>,
) -> Result<(), KernelError> {
    assert!(input.len() >= n * n, "input must hold n*n values");
    assert!(lambdas.len() >= n, "lambdas must hold n values");

    let m = DMatrix::<f64>::from_column_slice(n, n, &input[..n * n]);
    let eigenvalues = m.complex_eigenvalues();
    for i in 0..n {
        lambdas[i] = eigenvalues[i];
    }

    if let Some(out) = vectors {
        let mc = m.map(|x| Complex::new(x, 0.0));
        write_eigenvectors(&mc, &lambdas[..n], out);
    }
    Ok(())
}

/// Eigenvalues (and optionally eigenvectors) of a general square complex matrix.
///
/// Same contract as [`eigen`] with complex input.
pub fn eigen_complex(
    n: usize,
    input: &[Complex<f64>],
    lambdas: &mut [Complex<f64>],
    vectors: Option<&mut [Complex<f64>]>,
) -> Result<(), KernelError> {
    assert!(input.len() >= n * n, "input must hold n*n values");
    assert!(lambdas.len() >= n, "lambdas must hold n values");

    let m = DMatrix::<Complex<f64>>::from_column_slice(n, n, &input[..n * n]);
    let eigenvalues = m.eigenvalues().ok_or(KernelError::Convergence)?;
    for i in 0..n {
        lambdas[i] = eigenvalues[i];
    }

    if let Some(out) = vectors {
        write_eigenvectors(&m, &lambdas[..n], out);
    }
    Ok(())
}

/// Recover one eigenvector per eigenvalue as the null direction of
/// `A - lambda I`, extracted from the right-singular vectors of that shifted
/// matrix. For an eigenvalue of multiplicity k the null space is
/// k-dimensional, so repeats of the same eigenvalue pick successive basis
/// vectors instead of returning the same direction twice.
fn write_eigenvectors(m: &DMatrix<Complex<f64>>, lambdas: &[Complex<f64>], out: &mut [Complex<f64>]) {
    let n = m.nrows();
    assert!(out.len() >= n * n, "vectors must hold n*n values");

    let scale = m.iter().map(|x| x.norm()).fold(0.0_f64, f64::max).max(1.0);
    let tol = scale * 1e-9;

    for (i, &lambda) in lambdas.iter().enumerate() {
        let repeat = lambdas[..i]
            .iter()
            .filter(|&&prev| (prev - lambda).norm() <= tol)
            .count();
        let mut shifted = m.clone();
        for d in 0..n {
            shifted[(d, d)] -= lambda;
        }
        let v = null_space_vector(&shifted, repeat.min(n - 1));
        for r in 0..n {
            out[i * n + r] = v[r];
        }
    }
}

/// The `which`-th basis vector of the (near-)null space of `m`, i.e. the
/// right-singular vector for the `which`-th smallest singular value.
fn null_space_vector(m: &DMatrix<Complex<f64>>, which: usize) -> DVector<Complex<f64>> {
    let n = m.ncols();
    let svd = m.clone().svd(false, true);
    let v_t = svd
        .v_t
        .expect("svd was computed with right-singular vectors");
    // Rows of v_t are ordered by descending singular value.
    v_t.row(n - 1 - which).adjoint()
}
