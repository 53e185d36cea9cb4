//! Physical units for signal domains and sample values.
//!
//! A [`Unit`] is a dimension (exponents of time, voltage and current) plus a
//! scale factor relative to the SI base unit of that dimension. Conversion
//! between two units is only defined when their dimensions agree.

use crate::error::MeasureError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Div, Mul};
use std::str::FromStr;

/// Exponents of the base dimensions a unit is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Dimension {
    pub time: i8,
    pub voltage: i8,
    pub current: i8,
}

impl Dimension {
    pub const NONE: Dimension = Dimension {
        time: 0,
        voltage: 0,
        current: 0,
    };
    pub const TIME: Dimension = Dimension {
        time: 1,
        voltage: 0,
        current: 0,
    };
    pub const VOLTAGE: Dimension = Dimension {
        time: 0,
        voltage: 1,
        current: 0,
    };
    pub const CURRENT: Dimension = Dimension {
        time: 0,
        voltage: 0,
        current: 1,
    };
}

/// A physical unit: dimension plus scale relative to the SI base unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Unit {
    dimension: Dimension,
    scale: f64,
}

/// Symbols the parser and formatter know about.
const NAMED_UNITS: &[(&str, Unit)] = &[
    ("dimensionless", Unit::DIMENSIONLESS),
    ("s", Unit::SECOND),
    ("ms", Unit::MILLISECOND),
    ("us", Unit::MICROSECOND),
    ("Hz", Unit::HERTZ),
    ("V", Unit::VOLT),
    ("mV", Unit::MILLIVOLT),
    ("uV", Unit::MICROVOLT),
    ("A", Unit::AMPERE),
    ("nA", Unit::NANOAMPERE),
    ("pA", Unit::PICOAMPERE),
];

impl Unit {
    pub const DIMENSIONLESS: Unit = Unit::new(Dimension::NONE, 1.0);
    pub const SECOND: Unit = Unit::new(Dimension::TIME, 1.0);
    pub const MILLISECOND: Unit = Unit::new(Dimension::TIME, 1e-3);
    pub const MICROSECOND: Unit = Unit::new(Dimension::TIME, 1e-6);
    pub const HERTZ: Unit = Unit::new(
        Dimension {
            time: -1,
            voltage: 0,
            current: 0,
        },
        1.0,
    );
    pub const VOLT: Unit = Unit::new(Dimension::VOLTAGE, 1.0);
    pub const MILLIVOLT: Unit = Unit::new(Dimension::VOLTAGE, 1e-3);
    pub const MICROVOLT: Unit = Unit::new(Dimension::VOLTAGE, 1e-6);
    pub const AMPERE: Unit = Unit::new(Dimension::CURRENT, 1.0);
    pub const NANOAMPERE: Unit = Unit::new(Dimension::CURRENT, 1e-9);
    pub const PICOAMPERE: Unit = Unit::new(Dimension::CURRENT, 1e-12);

    pub const fn new(dimension: Dimension, scale: f64) -> Self {
        Self { dimension, scale }
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn is_dimensionless(&self) -> bool {
        self.dimension == Dimension::NONE
    }

    /// Whether values in `self` can be expressed in `other`.
    pub fn is_compatible(&self, other: &Unit) -> bool {
        self.dimension == other.dimension
    }

    /// Factor that turns a magnitude in `self` into a magnitude in `target`.
    pub fn conversion_factor(&self, target: &Unit) -> Result<f64, MeasureError> {
        if !self.is_compatible(target) {
            return Err(MeasureError::IncompatibleUnits {
                from: self.to_string(),
                to: target.to_string(),
            });
        }
        Ok(self.scale / target.scale)
    }

    /// Convert a bare magnitude from `self` into `target`.
    pub fn convert(&self, value: f64, target: &Unit) -> Result<f64, MeasureError> {
        if self == target {
            return Ok(value);
        }
        Ok(value * self.conversion_factor(target)?)
    }

    fn symbol(&self) -> Option<&'static str> {
        NAMED_UNITS
            .iter()
            .find(|(_, unit)| unit.dimension == self.dimension && approx_scale(unit.scale, self.scale))
            .map(|(symbol, _)| *symbol)
    }
}

fn approx_scale(a: f64, b: f64) -> bool {
    (a - b).abs() <= f64::EPSILON * a.abs().max(b.abs())
}

impl Mul for Unit {
    type Output = Unit;

    fn mul(self, rhs: Unit) -> Unit {
        Unit::new(
            Dimension {
                time: self.dimension.time + rhs.dimension.time,
                voltage: self.dimension.voltage + rhs.dimension.voltage,
                current: self.dimension.current + rhs.dimension.current,
            },
            self.scale * rhs.scale,
        )
    }
}

impl Div for Unit {
    type Output = Unit;

    fn div(self, rhs: Unit) -> Unit {
        Unit::new(
            Dimension {
                time: self.dimension.time - rhs.dimension.time,
                voltage: self.dimension.voltage - rhs.dimension.voltage,
                current: self.dimension.current - rhs.dimension.current,
            },
            self.scale / rhs.scale,
        )
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(symbol) = self.symbol() {
            return write!(f, "{symbol}");
        }
        // Compound units print as `scale*V^a*A^b*s^c`.
        let mut parts = Vec::new();
        if !approx_scale(self.scale, 1.0) {
            parts.push(format!("{:e}", self.scale));
        }
        for (name, exp) in [
            ("V", self.dimension.voltage),
            ("A", self.dimension.current),
            ("s", self.dimension.time),
        ] {
            match exp {
                0 => {}
                1 => parts.push(name.to_string()),
                e => parts.push(format!("{name}^{e}")),
            }
        }
        if parts.is_empty() {
            write!(f, "dimensionless")
        } else {
            write!(f, "{}", parts.join("*"))
        }
    }
}

impl FromStr for Unit {
    type Err = MeasureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(Unit::DIMENSIONLESS);
        }
        NAMED_UNITS
            .iter()
            .find(|(symbol, _)| *symbol == trimmed)
            .map(|(_, unit)| *unit)
            .ok_or_else(|| MeasureError::UnknownUnit(trimmed.to_string()))
    }
}

impl TryFrom<String> for Unit {
    type Error = MeasureError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Unit> for String {
    fn from(unit: Unit) -> Self {
        unit.to_string()
    }
}

/// A scalar magnitude tagged with its unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub value: f64,
    pub unit: Unit,
}

impl Quantity {
    pub fn new(value: f64, unit: Unit) -> Self {
        Self { value, unit }
    }

    /// NaN in the given unit, the soft-failure sentinel.
    pub fn nan(unit: Unit) -> Self {
        Self::new(f64::NAN, unit)
    }

    pub fn is_nan(&self) -> bool {
        self.value.is_nan()
    }

    /// Express this quantity in `unit`.
    pub fn convert_to(&self, unit: &Unit) -> Result<Quantity, MeasureError> {
        Ok(Quantity::new(self.unit.convert(self.value, unit)?, *unit))
    }

    /// `self - other`, with `other` first expressed in `self`'s unit.
    pub fn checked_sub(&self, other: &Quantity) -> Result<Quantity, MeasureError> {
        let rhs = other.convert_to(&self.unit)?;
        Ok(Quantity::new(self.value - rhs.value, self.unit))
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.unit.is_dimensionless() {
            write!(f, "{}", self.value)
        } else {
            write!(f, "{} {}", self.value, self.unit)
        }
    }
}
