//! Physical units and per-value metadata.
//!
//! Measured values carry a unit tag so that results computed on calibrated
//! images (micrometre pixel sizes and the like) read back unambiguously.
//! Units are products of powers of base symbols; multiplying two units adds
//! the powers, and symbols whose power cancels to zero disappear.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Mul;

use serde::{Deserialize, Serialize};

/// A product of powers of base unit symbols, e.g. `µm^2` or `µm·px`.
///
/// The empty product is dimensionless and displays as `1`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Units {
    powers: BTreeMap<String, i32>,
}

impl Units {
    /// The empty, dimensionless unit.
    pub fn dimensionless() -> Self {
        Self::default()
    }

    /// The pixel unit, used when an image carries no physical calibration.
    pub fn pixel() -> Self {
        Self::base("px")
    }

    /// A single base symbol to the first power.
    pub fn base(symbol: &str) -> Self {
        let mut powers = BTreeMap::new();
        powers.insert(symbol.to_owned(), 1);
        Self { powers }
    }

    /// Raises every base symbol to `exp` times its current power.
    pub fn powi(&self, exp: i32) -> Self {
        if exp == 0 {
            return Self::default();
        }
        Self {
            powers: self
                .powers
                .iter()
                .map(|(s, p)| (s.clone(), p * exp))
                .collect(),
        }
    }

    pub fn is_dimensionless(&self) -> bool {
        self.powers.is_empty()
    }
}

impl Mul for Units {
    type Output = Units;

    fn mul(self, rhs: Units) -> Units {
        let mut powers = self.powers;
        for (symbol, power) in rhs.powers {
            *powers.entry(symbol).or_insert(0) += power;
        }
        powers.retain(|_, p| *p != 0);
        Units { powers }
    }
}

impl Mul for &Units {
    type Output = Units;

    fn mul(self, rhs: &Units) -> Units {
        self.clone() * rhs.clone()
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.powers.is_empty() {
            return write!(f, "1");
        }
        for (i, (symbol, power)) in self.powers.iter().enumerate() {
            if i > 0 {
                write!(f, "·")?;
            }
            if *power == 1 {
                write!(f, "{symbol}")?;
            } else {
                write!(f, "{symbol}^{power}")?;
            }
        }
        Ok(())
    }
}

/// A magnitude with units, used for per-dimension pixel sizes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalQuantity {
    pub magnitude: f64,
    pub units: Units,
}

impl PhysicalQuantity {
    pub fn new(magnitude: f64, units: Units) -> Self {
        Self { magnitude, units }
    }

    /// The magnitude-1 pixel sentinel used for uncalibrated dimensions.
    pub fn pixel() -> Self {
        Self::new(1.0, Units::pixel())
    }

    pub fn micrometers(magnitude: f64) -> Self {
        Self::new(magnitude, Units::base("µm"))
    }

    pub fn millimeters(magnitude: f64) -> Self {
        Self::new(magnitude, Units::base("mm"))
    }

    pub fn powi(&self, exp: i32) -> Self {
        Self::new(self.magnitude.powi(exp), self.units.powi(exp))
    }
}

impl Mul for PhysicalQuantity {
    type Output = PhysicalQuantity;

    fn mul(self, rhs: PhysicalQuantity) -> PhysicalQuantity {
        PhysicalQuantity::new(self.magnitude * rhs.magnitude, self.units * rhs.units)
    }
}

impl Mul for &PhysicalQuantity {
    type Output = PhysicalQuantity;

    fn mul(self, rhs: &PhysicalQuantity) -> PhysicalQuantity {
        self.clone() * rhs.clone()
    }
}

impl fmt::Display for PhysicalQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.magnitude, self.units)
    }
}

/// Name and units of one output column, produced by feature initialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueInformation {
    pub name: String,
    pub units: Units,
}

impl ValueInformation {
    pub fn new(name: impl Into<String>, units: Units) -> Self {
        Self {
            name: name.into(),
            units,
        }
    }

    /// A column with no units.
    pub fn dimensionless(name: impl Into<String>) -> Self {
        Self::new(name, Units::dimensionless())
    }
}
