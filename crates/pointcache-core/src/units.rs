//! Physical units attached to point streams.
//!
//! A [`Units`] value is a conversion factor to SI together with the exponents of
//! the SI base dimensions. Two units are compatible when their dimensions agree.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CacheError, Result};

/// Exponents of the SI base dimensions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    /// Mass (kilogram).
    pub mass: i8,
    /// Length (meter).
    pub length: i8,
    /// Time (second).
    pub time: i8,
    /// Electric current (ampere).
    pub current: i8,
    /// Temperature (kelvin).
    pub temperature: i8,
    /// Amount of substance (mole).
    pub amount: i8,
    /// Luminous intensity (candela).
    pub luminosity: i8,
}

impl Dimensions {
    /// No dimensions.
    pub const NONE: Self = Self::new(0, 0, 0);

    /// Mass, length and time exponents; the rest are zero.
    #[must_use]
    pub const fn new(mass: i8, length: i8, time: i8) -> Self {
        Self {
            mass,
            length,
            time,
            current: 0,
            temperature: 0,
            amount: 0,
            luminosity: 0,
        }
    }
}

/// A dimensioned physical unit.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Units {
    /// Multiplier converting a value in these units to SI.
    pub conversion: f64,
    /// SI base dimension exponents.
    pub dimensions: Dimensions,
}

impl Units {
    /// Dimensionless quantity.
    pub const DIMENSIONLESS: Self = Self::new(1.0, Dimensions::NONE);
    /// Meter.
    pub const METER: Self = Self::new(1.0, Dimensions::new(0, 1, 0));
    /// Foot.
    pub const FOOT: Self = Self::new(0.3048, Dimensions::new(0, 1, 0));
    /// Second.
    pub const SECOND: Self = Self::new(1.0, Dimensions::new(0, 0, 1));
    /// Cubic meter per second.
    pub const CUBIC_METER_PER_SECOND: Self = Self::new(1.0, Dimensions::new(0, 3, -1));
    /// Liter per second.
    pub const LITER_PER_SECOND: Self = Self::new(0.001, Dimensions::new(0, 3, -1));
    /// US gallon per minute.
    pub const GALLONS_PER_MINUTE: Self =
        Self::new(6.309_019_640_343_866e-5, Dimensions::new(0, 3, -1));
    /// Pascal.
    pub const PASCAL: Self = Self::new(1.0, Dimensions::new(1, -1, -2));
    /// Pound-force per square inch.
    pub const PSI: Self = Self::new(6_894.757_293_168, Dimensions::new(1, -1, -2));

    /// Creates units from a conversion factor and dimensions.
    #[must_use]
    pub const fn new(conversion: f64, dimensions: Dimensions) -> Self {
        Self {
            conversion,
            dimensions,
        }
    }

    /// Returns true if both units measure the same kind of quantity.
    #[must_use]
    pub fn is_same_dimension(&self, other: &Self) -> bool {
        self.dimensions == other.dimensions
    }

    /// Converts `value` expressed in `self` into `to`.
    ///
    /// # Errors
    /// Returns [`CacheError::InvalidParameter`] if the dimensions differ.
    pub fn convert(&self, value: f64, to: &Self) -> Result<f64> {
        if !self.is_same_dimension(to) {
            return Err(CacheError::InvalidParameter(format!(
                "cannot convert {self} to {to}"
            )));
        }
        Ok(value * self.conversion / to.conversion)
    }

    /// Parses one of the named unit symbols.
    ///
    /// # Errors
    /// Returns [`CacheError::Parse`] for unknown symbols.
    pub fn from_symbol(symbol: &str) -> Result<Self> {
        match symbol.trim().to_ascii_lowercase().as_str() {
            "" | "none" | "-" => Ok(Self::DIMENSIONLESS),
            "m" => Ok(Self::METER),
            "ft" => Ok(Self::FOOT),
            "s" => Ok(Self::SECOND),
            "m3/s" | "cms" => Ok(Self::CUBIC_METER_PER_SECOND),
            "l/s" | "lps" => Ok(Self::LITER_PER_SECOND),
            "gpm" => Ok(Self::GALLONS_PER_MINUTE),
            "pa" => Ok(Self::PASCAL),
            "psi" => Ok(Self::PSI),
            other => Err(CacheError::Parse(format!("unknown units symbol: {other}"))),
        }
    }
}

impl Default for Units {
    fn default() -> Self {
        Self::DIMENSIONLESS
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.conversion)?;
        let d = &self.dimensions;
        for (sym, exp) in [
            ("kg", d.mass),
            ("m", d.length),
            ("s", d.time),
            ("A", d.current),
            ("K", d.temperature),
            ("mol", d.amount),
            ("cd", d.luminosity),
        ] {
            match exp {
                0 => {}
                1 => write!(f, "*{sym}")?,
                n => write!(f, "*{sym}^{n}")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_conversion() {
        let lps = Units::LITER_PER_SECOND
            .convert(1.0, &Units::CUBIC_METER_PER_SECOND)
            .unwrap();
        assert!((lps - 0.001).abs() < 1e-12);

        let gpm = Units::CUBIC_METER_PER_SECOND
            .convert(1.0, &Units::GALLONS_PER_MINUTE)
            .unwrap();
        assert!((gpm - 15_850.323).abs() < 1e-2);
    }

    #[test]
    fn test_incompatible_dimensions() {
        assert!(!Units::METER.is_same_dimension(&Units::SECOND));
        assert!(Units::METER.convert(1.0, &Units::PSI).is_err());
    }

    #[test]
    fn test_from_symbol() {
        assert_eq!(Units::from_symbol("GPM").unwrap(), Units::GALLONS_PER_MINUTE);
        assert_eq!(Units::from_symbol(" psi ").unwrap(), Units::PSI);
        assert!(Units::from_symbol("furlongs").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Units::CUBIC_METER_PER_SECOND.to_string(), "1*m^3*s^-1");
        assert_eq!(Units::DIMENSIONLESS.to_string(), "1");
    }
}
