//! Streaming statistics accumulators with exact parallel merge.
//!
//! All three accumulators share the same usage pattern: `push` samples one by
//! one, query population estimates at any point, and combine independently
//! filled instances with `+=`. The combine formulas are the exact
//! parallel-reduction identities for central moments (Pébay 2008, Terriberry
//! 2008), so splitting a sample stream over threads and merging afterwards
//! gives the same result as a single pass, up to floating-point rounding.
//!
//! Central moments are updated with centered delta formulas rather than raw
//! power sums, avoiding catastrophic cancellation for large offsets.

use std::ops::{Add, AddAssign};

/// Running estimate of mean, variance, skewness and excess kurtosis.
///
/// Accumulates the first four central moments. Estimators use bias-corrected
/// divisors; skewness and excess kurtosis are only unbiased for symmetric
/// resp. normal data (no unbiased estimator exists in general).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatisticsAccumulator {
    n: u64,
    m1: f64,
    m2: f64, // sum of (x - mean)^2
    m3: f64, // sum of (x - mean)^3
    m4: f64, // sum of (x - mean)^4
}

impl StatisticsAccumulator {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one sample into the accumulator.
    pub fn push(&mut self, x: f64) {
        self.n += 1;
        let n = self.n as f64;
        let delta = x - self.m1;
        let term1 = delta / n;
        let term2 = term1 * term1;
        let term3 = delta * term1 * (n - 1.0);
        // m4 and m3 consume the previous m2/m3 values, so update high to low.
        self.m4 +=
            term3 * term2 * (n * n - 3.0 * n + 3.0) + 6.0 * term2 * self.m2 - 4.0 * term1 * self.m3;
        self.m3 += term3 * term1 * (n - 2.0) - 3.0 * term1 * self.m2;
        self.m2 += term3;
        self.m1 += term1;
    }

    /// Number of samples seen.
    pub fn count(&self) -> u64 {
        self.n
    }

    /// Unbiased estimate of the population mean.
    pub fn mean(&self) -> f64 {
        self.m1
    }

    /// Unbiased estimate of the population variance; 0 for fewer than 2 samples.
    pub fn variance(&self) -> f64 {
        if self.n > 1 {
            self.m2 / (self.n - 1) as f64
        } else {
            0.0
        }
    }

    /// Population standard deviation estimate.
    pub fn standard_deviation(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Population skewness estimate; 0 for fewer than 3 samples or zero spread.
    pub fn skewness(&self) -> f64 {
        if self.n > 2 && self.m2 != 0.0 {
            let n = self.n as f64;
            (n * n) / ((n - 1.0) * (n - 2.0)) * (self.m3 / (n * self.variance().powf(1.5)))
        } else {
            0.0
        }
    }

    /// Population excess kurtosis estimate; 0 for fewer than 4 samples or zero spread.
    pub fn excess_kurtosis(&self) -> f64 {
        if self.n > 3 && self.m2 != 0.0 {
            let n = self.n as f64;
            (n - 1.0) / ((n - 2.0) * (n - 3.0))
                * ((n + 1.0) * n * self.m4 / (self.m2 * self.m2) - 3.0 * (n - 1.0))
        } else {
            0.0
        }
    }
}

impl AddAssign for StatisticsAccumulator {
    fn add_assign(&mut self, b: Self) {
        if b.n == 0 {
            return;
        }
        if self.n == 0 {
            *self = b;
            return;
        }
        let an = self.n as f64;
        let bn = b.n as f64;
        let n = an + bn;
        let an2 = an * an;
        let bn2 = bn * bn;
        let xn2 = an * bn;
        let n2 = n * n;
        let delta = b.m1 - self.m1;
        let delta2 = delta * delta;
        self.m4 += b.m4
            + delta2 * delta2 * xn2 * (an2 - xn2 + bn2) / (n2 * n)
            + 6.0 * delta2 * (an2 * b.m2 + bn2 * self.m2) / n2
            + 4.0 * delta * (an * b.m3 - bn * self.m3) / n;
        self.m3 += b.m3 + delta * delta2 * xn2 * (an - bn) / n2
            + 3.0 * delta * (an * b.m2 - bn * self.m2) / n;
        self.m2 += b.m2 + delta2 * xn2 / n;
        self.m1 = (an * self.m1 + bn * b.m1) / n;
        self.n += b.n;
    }
}

impl Add for StatisticsAccumulator {
    type Output = Self;
    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

/// Running estimate of mean and variance (Welford's update).
///
/// Lighter-weight sibling of [`StatisticsAccumulator`] when third and fourth
/// moments are not needed.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VarianceAccumulator {
    n: u64,
    m1: f64,
    m2: f64, // sum of (x - mean)^2
}

impl VarianceAccumulator {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one sample into the accumulator.
    pub fn push(&mut self, x: f64) {
        self.n += 1;
        let delta = x - self.m1;
        self.m1 += delta / self.n as f64;
        self.m2 += delta * (x - self.m1);
    }

    /// Number of samples seen.
    pub fn count(&self) -> u64 {
        self.n
    }

    /// Unbiased estimate of the population mean.
    pub fn mean(&self) -> f64 {
        self.m1
    }

    /// Unbiased estimate of the population variance; 0 for fewer than 2 samples.
    pub fn variance(&self) -> f64 {
        if self.n > 1 {
            self.m2 / (self.n - 1) as f64
        } else {
            0.0
        }
    }

    /// Population standard deviation estimate.
    pub fn standard_deviation(&self) -> f64 {
        self.variance().sqrt()
    }
}

impl AddAssign for VarianceAccumulator {
    fn add_assign(&mut self, b: Self) {
        if b.n == 0 {
            return;
        }
        if self.n == 0 {
            *self = b;
            return;
        }
        let an = self.n as f64;
        let bn = b.n as f64;
        let n = an + bn;
        let delta = b.m1 - self.m1;
        self.m2 += b.m2 + delta * delta * (an * bn) / n;
        self.m1 = (an * self.m1 + bn * b.m1) / n;
        self.n += b.n;
    }
}

impl Add for VarianceAccumulator {
    type Output = Self;
    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

/// Running minimum and maximum of a sample stream.
///
/// Empty accumulators report `minimum() == +inf` and `maximum() == -inf`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinMaxAccumulator {
    min: f64,
    max: f64,
}

impl Default for MinMaxAccumulator {
    fn default() -> Self {
        Self {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl MinMaxAccumulator {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one sample into the accumulator.
    pub fn push(&mut self, x: f64) {
        self.min = self.min.min(x);
        self.max = self.max.max(x);
    }

    /// Fold two samples at once; one comparison of the pair decides which
    /// value challenges the minimum and which the maximum. Prefer this over
    /// two `push` calls in per-pixel loops.
    pub fn push_pair(&mut self, x: f64, y: f64) {
        if y >= x {
            self.min = self.min.min(x);
            self.max = self.max.max(y);
        } else {
            self.min = self.min.min(y);
            self.max = self.max.max(x);
        }
    }

    /// True if no sample has been pushed yet.
    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }

    /// Minimum value seen so far.
    pub fn minimum(&self) -> f64 {
        self.min
    }

    /// Maximum value seen so far.
    pub fn maximum(&self) -> f64 {
        self.max
    }
}

impl AddAssign for MinMaxAccumulator {
    fn add_assign(&mut self, other: Self) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }
}

impl Add for MinMaxAccumulator {
    type Output = Self;
    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}
