//! Reductions, inversion and singular-value decomposition.

use nalgebra::{ComplexField, DMatrix};

use super::KernelError;

/// Sum of the diagonal of a square `n × n` matrix.
pub fn trace<T: ComplexField>(n: usize, input: &[T]) -> T {
    assert!(input.len() >= n * n, "input must hold n*n values");
    (0..n).fold(nalgebra::zero::<T>(), |acc, i| {
        acc + input[i * n + i].clone()
    })
}

/// Sum of a diagonal matrix given as its `n` diagonal values.
pub fn trace_diagonal<T: ComplexField>(diagonal: &[T]) -> T {
    diagonal
        .iter()
        .fold(nalgebra::zero::<T>(), |acc, d| acc + d.clone())
}

/// Determinant of a square `n × n` matrix.
pub fn determinant<T: ComplexField>(n: usize, input: &[T]) -> T {
    assert!(input.len() >= n * n, "input must hold n*n values");
    DMatrix::from_column_slice(n, n, &input[..n * n]).determinant()
}

/// Determinant of a diagonal matrix given as its `n` diagonal values.
pub fn determinant_diagonal<T: ComplexField>(diagonal: &[T]) -> T {
    diagonal
        .iter()
        .fold(nalgebra::one::<T>(), |acc, d| acc * d.clone())
}

/// Inverse of a square `n × n` matrix, written to `output` (also `n × n`,
/// column-major). Fails with [`KernelError::Singular`] when no inverse exists.
pub fn inverse<T: ComplexField>(n: usize, input: &[T], output: &mut [T]) -> Result<(), KernelError> {
    assert!(input.len() >= n * n, "input must hold n*n values");
    assert!(output.len() >= n * n, "output must hold n*n values");
    let inv = DMatrix::from_column_slice(n, n, &input[..n * n])
        .try_inverse()
        .ok_or(KernelError::Singular)?;
    output[..n * n].clone_from_slice(inv.as_slice());
    Ok(())
}

/// Thin singular-value decomposition of an `m × n` matrix.
///
/// Writes the `p = min(m, n)` singular values to `sv` in descending order.
/// When `vectors` is `Some((u, v))`, also writes the left-singular vectors
/// `U` (`m × p`) to `u` and the right-singular vectors `V` (`n × p`, not its
/// adjoint) to `v`, both column-major. The two sides are always computed
/// together or not at all.
pub fn singular_value_decomposition<T: ComplexField>(
    m: usize,
    n: usize,
    input: &[T],
    sv: &mut [T::RealField],
    vectors: Option<(&mut [T], &mut [T])>,
) -> Result<(), KernelError> {
    assert!(input.len() >= m * n, "input must hold m*n values");
    let p = m.min(n);
    assert!(sv.len() >= p, "sv must hold min(m, n) values");

    let mat = DMatrix::from_column_slice(m, n, &input[..m * n]);
    let want_vectors = vectors.is_some();
    let svd = mat
        .try_svd(want_vectors, want_vectors, convert(f64::EPSILON), 0)
        .ok_or(KernelError::Convergence)?;

    for i in 0..p {
        sv[i] = svd.singular_values[i].clone();
    }
    if let Some((u_out, v_out)) = vectors {
        assert!(u_out.len() >= m * p, "u must hold m*min(m, n) values");
        assert!(v_out.len() >= n * p, "v must hold n*min(m, n) values");
        let u = svd.u.ok_or(KernelError::Convergence)?;
        let v = svd.v_t.ok_or(KernelError::Convergence)?.adjoint();
        u_out[..m * p].clone_from_slice(u.as_slice());
        v_out[..n * p].clone_from_slice(v.as_slice());
    }
    Ok(())
}

/// Moore–Penrose pseudo-inverse of an `m × n` matrix, written to `output`
/// (`n × m`, column-major). Singular values below `tolerance` times the
/// largest singular value are treated as zero.
pub fn pseudo_inverse<T: ComplexField>(
    m: usize,
    n: usize,
    input: &[T],
    output: &mut [T],
    tolerance: f64,
) -> Result<(), KernelError> {
    assert!(input.len() >= m * n, "input must hold m*n values");
    assert!(output.len() >= n * m, "output must hold n*m values");

    let mat = DMatrix::from_column_slice(m, n, &input[..m * n]);
    let svd = mat
        .try_svd(true, true, convert(f64::EPSILON), 0)
        .ok_or(KernelError::Convergence)?;
    let eps = svd.singular_values.max() * convert::<T::RealField>(tolerance);
    let pinv = svd
        .pseudo_inverse(eps)
        .map_err(|_| KernelError::Singular)?;
    output[..n * m].clone_from_slice(pinv.as_slice());
    Ok(())
}

/// Numerical rank of an `m × n` matrix: the number of singular values above
/// `max(m, n) * eps` relative to the largest one.
pub fn rank<T: ComplexField>(m: usize, n: usize, input: &[T]) -> usize {
    assert!(input.len() >= m * n, "input must hold m*n values");
    let svd = DMatrix::from_column_slice(m, n, &input[..m * n]).svd(false, false);
    let largest = svd.singular_values.max();
    let eps = largest * convert::<T::RealField>(m.max(n) as f64 * f64::EPSILON);
    (0..svd.singular_values.len())
        .filter(|&i| svd.singular_values[i] > eps)
        .count()
}

fn convert<R: nalgebra::RealField>(x: f64) -> R {
    nalgebra::convert(x)
}
