//! Principal moments and principal axes, composed from the inertia tensor.

use labelmetry_core::linalg::symmetric_eigen_packed;

use crate::error::{MeasureError, MeasureResult};
use crate::feature::{Composite, ImageContext};
use crate::table::ColumnResolver;
use crate::units::ValueInformation;

const DIMS: [&str; 3] = ["x", "y", "z"];
const DEPENDENCIES: [&str; 1] = ["InertiaTensor"];

fn check_dimensionality(feature: &'static str, nd: usize) -> MeasureResult<()> {
    if (2..=3).contains(&nd) {
        Ok(())
    } else {
        Err(MeasureError::DimensionalityNotSupported {
            feature,
            got: nd,
            min: 2,
            max: 3,
        })
    }
}

fn bind_tensor(
    feature: &'static str,
    resolver: &ColumnResolver<'_>,
) -> MeasureResult<(usize, usize)> {
    resolver
        .resolve("InertiaTensor")
        .ok_or(MeasureError::UnresolvedDependency {
            feature,
            dependency: "InertiaTensor",
        })
}

/// Eigenvalues of the inertia tensor, sorted largest to smallest. The
/// eigenvector computation is skipped entirely.
#[derive(Debug, Default)]
pub struct PrincipalMoments {
    ndims: usize,
    tensor: Option<(usize, usize)>,
}

impl Composite for PrincipalMoments {
    fn name(&self) -> &'static str {
        "PrincipalMoments"
    }

    fn initialize(&mut self, ctx: &ImageContext<'_>) -> MeasureResult<Vec<ValueInformation>> {
        let nd = ctx.dimensionality();
        check_dimensionality("PrincipalMoments", nd)?;
        self.ndims = nd;
        self.tensor = None;
        // The tensor entries mix per-axis units; tag the eigenvalues with the
        // first axis' squared units, as the tensor diagonal does.
        let units = &ctx.pixel_size[0].units * &ctx.pixel_size[0].units;
        Ok((0..nd)
            .map(|k| ValueInformation::new(format!("lambda{}", k + 1), units.clone()))
            .collect())
    }

    fn dependencies(&self) -> &[&'static str] {
        &DEPENDENCIES
    }

    fn bind(&mut self, resolver: &ColumnResolver<'_>) -> MeasureResult<()> {
        self.tensor = Some(bind_tensor("PrincipalMoments", resolver)?);
        Ok(())
    }

    fn compose(&self, row: &[f64], output: &mut [f64]) -> MeasureResult<()> {
        let (offset, len) = self.tensor.ok_or(MeasureError::UnresolvedDependency {
            feature: "PrincipalMoments",
            dependency: "InertiaTensor",
        })?;
        let packed = &row[offset..offset + len];
        let mut lambdas = [0.0f64; 3];
        symmetric_eigen_packed(self.ndims, packed, &mut lambdas, None)?;
        output[..self.ndims].copy_from_slice(&lambdas[..self.ndims]);
        Ok(())
    }
}

/// Eigenvectors of the inertia tensor, as length-n column blocks ordered by
/// descending eigenvalue.
#[derive(Debug, Default)]
pub struct PrincipalAxes {
    ndims: usize,
    tensor: Option<(usize, usize)>,
}

impl Composite for PrincipalAxes {
    fn name(&self) -> &'static str {
        "PrincipalAxes"
    }

    fn initialize(&mut self, ctx: &ImageContext<'_>) -> MeasureResult<Vec<ValueInformation>> {
        let nd = ctx.dimensionality();
        check_dimensionality("PrincipalAxes", nd)?;
        self.ndims = nd;
        self.tensor = None;
        let mut out = Vec::with_capacity(nd * nd);
        for i in 0..nd {
            for j in 0..nd {
                out.push(ValueInformation::dimensionless(format!(
                    "v{}_{}",
                    i,
                    DIMS[j]
                )));
            }
        }
        Ok(out)
    }

    fn dependencies(&self) -> &[&'static str] {
        &DEPENDENCIES
    }

    fn bind(&mut self, resolver: &ColumnResolver<'_>) -> MeasureResult<()> {
        self.tensor = Some(bind_tensor("PrincipalAxes", resolver)?);
        Ok(())
    }

    fn compose(&self, row: &[f64], output: &mut [f64]) -> MeasureResult<()> {
        let (offset, len) = self.tensor.ok_or(MeasureError::UnresolvedDependency {
            feature: "PrincipalAxes",
            dependency: "InertiaTensor",
        })?;
        let packed = &row[offset..offset + len];
        let nd = self.ndims;
        let mut lambdas = [0.0f64; 3];
        let mut vectors = [0.0f64; 9];
        symmetric_eigen_packed(nd, packed, &mut lambdas, Some(&mut vectors))?;
        output[..nd * nd].copy_from_slice(&vectors[..nd * nd]);
        Ok(())
    }
}
