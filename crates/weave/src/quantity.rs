//! [`Unit`] and [`Quantity`]: a measurement value paired with a unit of
//! measure, converted through a small fixed table rather than a general
//! unit-algebra engine.

use std::fmt;

/// The units recognized by `quantity`/`unit` literals and the `to :quantity`
/// conversion. Intentionally small and flat: no compound units, no
/// user-extensible unit registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Meters,
    Kilometers,
    Centimeters,
    Miles,
    Feet,
    Grams,
    Kilograms,
    Pounds,
    Seconds,
    Minutes,
    Hours,
}

impl Unit {
    /// Conversion factor to this unit's base (meters, grams, or seconds).
    fn to_base_factor(self) -> f64 {
        match self {
            Self::Meters | Self::Grams | Self::Seconds => 1.0,
            Self::Kilometers => 1000.0,
            Self::Centimeters => 0.01,
            Self::Miles => 1609.344,
            Self::Feet => 0.3048,
            Self::Kilograms => 1000.0,
            Self::Pounds => 453.592_37,
            Self::Minutes => 60.0,
            Self::Hours => 3600.0,
        }
    }

    fn dimension(self) -> Dimension {
        match self {
            Self::Meters | Self::Kilometers | Self::Centimeters | Self::Miles | Self::Feet => Dimension::Length,
            Self::Grams | Self::Kilograms | Self::Pounds => Dimension::Mass,
            Self::Seconds | Self::Minutes | Self::Hours => Dimension::Time,
        }
    }

    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "m" | "meters" => Self::Meters,
            "km" | "kilometers" => Self::Kilometers,
            "cm" | "centimeters" => Self::Centimeters,
            "mi" | "miles" => Self::Miles,
            "ft" | "feet" => Self::Feet,
            "g" | "grams" => Self::Grams,
            "kg" | "kilograms" => Self::Kilograms,
            "lb" | "pounds" => Self::Pounds,
            "s" | "seconds" => Self::Seconds,
            "min" | "minutes" => Self::Minutes,
            "h" | "hours" => Self::Hours,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dimension {
    Length,
    Mass,
    Time,
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Meters => "m",
            Self::Kilometers => "km",
            Self::Centimeters => "cm",
            Self::Miles => "mi",
            Self::Feet => "ft",
            Self::Grams => "g",
            Self::Kilograms => "kg",
            Self::Pounds => "lb",
            Self::Seconds => "s",
            Self::Minutes => "min",
            Self::Hours => "h",
        };
        write!(f, "{s}")
    }
}

/// A measured value: a magnitude plus the unit it's expressed in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantity {
    pub value: f64,
    pub unit: Unit,
}

impl Quantity {
    #[must_use]
    pub fn new(value: f64, unit: Unit) -> Self {
        Self { value, unit }
    }

    /// Converts to another unit, returning `None` when the two units don't
    /// share a dimension (e.g. converting a length to a mass).
    #[must_use]
    pub fn convert_to(&self, target: Unit) -> Option<Self> {
        if self.unit.dimension() != target.dimension() {
            return None;
        }
        let base = self.value * self.unit.to_base_factor();
        Some(Self { value: base / target.to_base_factor(), unit: target })
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_within_dimension() {
        let q = Quantity::new(1.0, Unit::Kilometers);
        let m = q.convert_to(Unit::Meters).unwrap();
        assert!((m.value - 1000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_cross_dimension_conversion() {
        let q = Quantity::new(1.0, Unit::Kilograms);
        assert!(q.convert_to(Unit::Meters).is_none());
    }
}
