use derive_more::{Display, Into};
use std::f64::consts::PI;
use std::ops::{Add, Sub};

/// Decimal places kept by [`Precise`] after every mutation.
pub const PRECISION: i32 = 9;
/// Decimal places kept when an [`Angle`] is read back in degrees.
pub const DEGREE_PRECISION: i32 = 6;
pub const FULL_TURN: f64 = 360.0;

fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    let rounded = (value * scale).round() / scale;
    // avoid carrying a negative zero around
    if rounded == 0.0 { 0.0 } else { rounded }
}

/// A scalar that is re-rounded after every mutation, so thousands of small
/// additions cannot drift away from the value they logically add up to.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Display, Into)]
pub struct Precise(f64);

impl Precise {
    pub const ZERO: Self = Self(0.0);

    pub fn new(value: f64) -> Self {
        Self(round_to(value, PRECISION))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Reduces a non-negative accumulated measure into `[0, modulus)`.
    pub fn reduced(self, modulus: f64) -> Self {
        Self::new(self.0.rem_euclid(modulus))
    }
}

impl From<f64> for Precise {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl Add<f64> for Precise {
    type Output = Self;

    fn add(self, delta: f64) -> Self {
        Self::new(self.0 + delta)
    }
}

impl Add for Precise {
    type Output = Self;

    fn add(self, delta: Self) -> Self {
        self + delta.0
    }
}

impl Sub<f64> for Precise {
    type Output = Self;

    fn sub(self, delta: f64) -> Self {
        Self::new(self.0 - delta)
    }
}

impl Sub for Precise {
    type Output = Self;

    fn sub(self, delta: Self) -> Self {
        self - delta.0
    }
}

/// An angle held in radians in the engine's basis, where zero is the top of
/// the wheel.
///
/// Callers used to measuring from the positive x-axis construct with
/// `from_top = false`, which re-bases the input by a quarter turn once at
/// construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd)]
pub struct Angle {
    radians: Precise,
}

impl Angle {
    pub fn from_radians(radians: f64, from_top: bool) -> Self {
        let radians = if from_top { radians } else { radians - PI / 2.0 };
        Self {
            radians: Precise::new(radians),
        }
    }

    pub fn from_degrees(degrees: f64, from_top: bool) -> Self {
        Self::from_radians(degrees * PI / 180.0, from_top)
    }

    pub fn radians(self) -> f64 {
        self.radians.value()
    }

    pub fn degrees(self) -> f64 {
        round_to(self.radians.value() * 180.0 / PI, DEGREE_PRECISION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_repeated_additions_do_not_drift() {
        let mut stepped = Precise::ZERO;
        for _ in 0..10 {
            stepped = stepped + 0.1;
        }
        assert_eq!(stepped, Precise::new(1.0));

        let mut long_run = Precise::ZERO;
        for _ in 0..100_000 {
            long_run = long_run + 0.001;
        }
        assert_eq!(long_run, Precise::new(100.0));
    }

    #[test]
    fn test_subtraction_rounds() {
        let value = Precise::new(0.3) - 0.1;
        assert_eq!(value, Precise::new(0.2));
        assert_eq!(Precise::new(720.0) - Precise::new(360.0), Precise::new(360.0));
    }

    #[test]
    fn test_reduced_into_one_turn() {
        assert_eq!(Precise::new(720.0).reduced(FULL_TURN), Precise::ZERO);
        assert_eq!(Precise::new(1170.5).reduced(FULL_TURN), Precise::new(90.5));
        assert_eq!(Precise::new(359.0).reduced(FULL_TURN), Precise::new(359.0));
    }

    #[test]
    fn test_rebasing() {
        assert_eq!(Angle::from_degrees(90.0, false).degrees(), 0.0);
        assert_eq!(Angle::from_degrees(0.0, true).degrees(), 0.0);
        assert_eq!(Angle::from_degrees(180.0, false).degrees(), 90.0);
        assert_relative_eq!(
            Angle::from_radians(PI, false).radians(),
            PI / 2.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_degree_round_trip() {
        for degrees in [0.0, 1.0, 45.0, 90.0, 270.0, 359.0, 1080.0] {
            assert_eq!(Angle::from_degrees(degrees, true).degrees(), degrees);
        }
    }

    #[test]
    fn test_ordering_follows_radians() {
        let a = Angle::from_degrees(10.0, true);
        let b = Angle::from_degrees(20.0, true);
        assert!(a < b);
        assert_eq!(a, Angle::from_radians(10.0 * PI / 180.0, true));
    }
}
