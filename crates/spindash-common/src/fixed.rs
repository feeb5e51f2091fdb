//! 16.16 fixed-point scalars and 32-bit binary angles.
//!
//! Map geometry is expressed in `Fixed` map units. Angles use the full
//! `u32` range for one turn, so subtraction wraps naturally. Sines come from
//! a fine-angle lookup table built once on first use.

use std::f64::consts::TAU;
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

/// Number of fractional bits in a `Fixed`.
pub const FRACBITS: u32 = 16;

/// Raw value of `1.0` in fixed point.
pub const FRACUNIT: i32 = 1 << FRACBITS;

/// Number of entries in the fine sine table.
pub const FINE_ANGLES: usize = 8192;

/// Shift that turns a binary angle into a fine table index.
pub const ANGLE_TO_FINE_SHIFT: u32 = 19;

/// A signed 16.16 fixed-point number.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fixed(i32);

impl Fixed {
    /// Zero.
    pub const ZERO: Self = Self(0);
    /// One map unit.
    pub const ONE: Self = Self(FRACUNIT);
    /// Largest representable value.
    pub const MAX: Self = Self(i32::MAX);
    /// Smallest representable value.
    pub const MIN: Self = Self(i32::MIN);

    /// Wraps a raw 16.16 value.
    #[must_use]
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    /// Returns the raw 16.16 value.
    #[must_use]
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Converts whole map units to fixed point.
    #[must_use]
    pub const fn from_int(units: i32) -> Self {
        Self(units.wrapping_shl(FRACBITS))
    }

    /// Truncates to whole map units (rounds toward negative infinity).
    #[must_use]
    pub const fn to_int(self) -> i32 {
        self.0 >> FRACBITS
    }

    /// Converts from a float.
    #[must_use]
    pub fn from_f64(value: f64) -> Self {
        Self((value * f64::from(FRACUNIT)) as i32)
    }

    /// Converts to a float.
    #[must_use]
    pub fn to_f64(self) -> f64 {
        f64::from(self.0) / f64::from(FRACUNIT)
    }

    /// Absolute value (wrapping at `MIN`).
    #[must_use]
    pub const fn abs(self) -> Self {
        Self(self.0.wrapping_abs())
    }

    /// Fixed-point multiply.
    #[must_use]
    pub const fn fixed_mul(self, rhs: Self) -> Self {
        Self(((self.0 as i64 * rhs.0 as i64) >> FRACBITS) as i32)
    }

    /// Fixed-point divide, saturating instead of overflowing.
    ///
    /// Division by zero saturates toward the sign of the dividend.
    #[must_use]
    pub const fn fixed_div(self, rhs: Self) -> Self {
        if (self.0.wrapping_abs() >> 14) >= rhs.0.wrapping_abs() {
            if (self.0 ^ rhs.0) < 0 {
                Self::MIN
            } else {
                Self::MAX
            }
        } else {
            Self((((self.0 as i64) << FRACBITS) / rhs.0 as i64) as i32)
        }
    }
}

impl fmt::Debug for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fixed({:.4})", self.to_f64())
    }
}

impl fmt::Display for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.to_f64())
    }
}

impl Add for Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.wrapping_add(rhs.0))
    }
}

impl AddAssign for Fixed {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0.wrapping_sub(rhs.0))
    }
}

impl SubAssign for Fixed {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Neg for Fixed {
    type Output = Self;

    fn neg(self) -> Self {
        Self(self.0.wrapping_neg())
    }
}

/// A binary angle: the full `u32` range is one turn, counter-clockwise
/// from the positive X axis.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Angle(u32);

impl Angle {
    /// East.
    pub const ZERO: Self = Self(0);
    /// 45 degrees.
    pub const ANGLE_45: Self = Self(0x2000_0000);
    /// North.
    pub const ANGLE_90: Self = Self(0x4000_0000);
    /// West.
    pub const ANGLE_180: Self = Self(0x8000_0000);
    /// South.
    pub const ANGLE_270: Self = Self(0xC000_0000);

    /// Wraps a raw binary angle.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw binary angle.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Builds an angle from whole degrees.
    #[must_use]
    pub const fn from_degrees(degrees: u32) -> Self {
        Self((((degrees % 360) as u64) << 32).wrapping_div(360) as u32)
    }

    /// Converts to degrees in `[0, 360)`.
    #[must_use]
    pub fn to_degrees(self) -> f64 {
        f64::from(self.0) * 360.0 / 4_294_967_296.0
    }

    /// Angle of the vector pointing from `from` to `to` on the XY plane.
    ///
    /// Coincident points yield `ZERO`.
    #[must_use]
    pub fn between(from: (Fixed, Fixed), to: (Fixed, Fixed)) -> Self {
        let dx = (to.0 - from.0).to_f64();
        let dy = (to.1 - from.1).to_f64();
        if dx == 0.0 && dy == 0.0 {
            return Self::ZERO;
        }
        let radians = dy.atan2(dx).rem_euclid(TAU);
        Self((radians / TAU * 4_294_967_296.0) as u64 as u32)
    }

    /// Wrapping difference `self - other`.
    #[must_use]
    pub const fn wrapping_sub(self, other: Self) -> Self {
        Self(self.0.wrapping_sub(other.0))
    }

    /// Wrapping sum `self + other`.
    #[must_use]
    pub const fn wrapping_add(self, other: Self) -> Self {
        Self(self.0.wrapping_add(other.0))
    }

    /// Index into the fine sine table.
    #[must_use]
    pub const fn fine_index(self) -> usize {
        (self.0 >> ANGLE_TO_FINE_SHIFT) as usize
    }

    /// Sine of this angle from the lookup table.
    #[must_use]
    pub fn sine(self) -> Fixed {
        fine_sine()[self.fine_index()]
    }

    /// Cosine of this angle from the lookup table.
    #[must_use]
    pub fn cosine(self) -> Fixed {
        self.wrapping_add(Self::ANGLE_90).sine()
    }
}

impl fmt::Debug for Angle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Angle({:.2}deg)", self.to_degrees())
    }
}

/// The fine sine table, built on first use.
#[must_use]
pub fn fine_sine() -> &'static [Fixed] {
    static TABLE: OnceLock<Vec<Fixed>> = OnceLock::new();
    TABLE.get_or_init(|| {
        (0..FINE_ANGLES)
            .map(|i| {
                // Sample at the centre of each fine step.
                let a = (i as f64 + 0.5) * TAU / FINE_ANGLES as f64;
                Fixed::from_raw((a.sin() * f64::from(FRACUNIT)).round() as i32)
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_fixed_mul_div() {
        let a = Fixed::from_int(6);
        let b = Fixed::from_int(3);
        assert_eq!(a.fixed_mul(b), Fixed::from_int(18));
        assert_eq!(a.fixed_div(b), Fixed::from_int(2));
        assert_eq!(Fixed::from_int(1).fixed_div(Fixed::from_int(4)).raw(), FRACUNIT / 4);
    }

    #[test]
    fn test_fixed_div_saturates() {
        assert_eq!(Fixed::from_int(1).fixed_div(Fixed::ZERO), Fixed::MAX);
        assert_eq!(Fixed::from_int(-1).fixed_div(Fixed::ZERO), Fixed::MIN);
        assert_eq!(Fixed::from_int(30000).fixed_div(Fixed::from_raw(1)), Fixed::MAX);
    }

    #[test]
    fn test_fixed_to_int_floors() {
        assert_eq!(Fixed::from_raw(-1).to_int(), -1);
        assert_eq!(Fixed::from_raw(FRACUNIT - 1).to_int(), 0);
    }

    #[test]
    fn test_angle_from_degrees() {
        assert_eq!(Angle::from_degrees(90), Angle::ANGLE_90);
        assert_eq!(Angle::from_degrees(180), Angle::ANGLE_180);
        assert_eq!(Angle::from_degrees(360), Angle::ZERO);
    }

    #[test]
    fn test_angle_between_quadrants() {
        let o = (Fixed::ZERO, Fixed::ZERO);
        let east = Angle::between(o, (Fixed::from_int(10), Fixed::ZERO));
        let north = Angle::between(o, (Fixed::ZERO, Fixed::from_int(10)));
        let west = Angle::between(o, (Fixed::from_int(-10), Fixed::ZERO));
        assert_eq!(east, Angle::ZERO);
        assert!((north.to_degrees() - 90.0).abs() < 0.01);
        assert!((west.to_degrees() - 180.0).abs() < 0.01);
    }

    #[test]
    fn test_sine_table() {
        assert!((Angle::ANGLE_90.sine().to_f64() - 1.0).abs() < 0.001);
        assert!((Angle::ANGLE_270.sine().to_f64() + 1.0).abs() < 0.001);
        assert!(Angle::ZERO.sine().to_f64().abs() < 0.001);
        assert!((Angle::ZERO.cosine().to_f64() - 1.0).abs() < 0.001);
    }

    proptest! {
        #[test]
        fn prop_sine_stays_in_unit_range(raw in any::<u32>()) {
            let s = Angle::from_raw(raw).sine();
            prop_assert!(s >= -Fixed::ONE && s <= Fixed::ONE);
        }

        #[test]
        fn prop_fixed_mul_commutes(a in -30_000i32..30_000, b in -30_000i32..30_000) {
            let (a, b) = (Fixed::from_raw(a << 4), Fixed::from_raw(b << 4));
            prop_assert_eq!(a.fixed_mul(b), b.fixed_mul(a));
        }
    }
}
