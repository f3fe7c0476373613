use fixed::types::I32F32;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Fixed-point length in document units.
///
/// Values are quantized to thousandths of a unit so that repeated layout passes over the
/// same input produce bit-identical geometry.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Length(I32F32);

impl Length {
    pub const ZERO: Length = Length(I32F32::from_bits(0));

    pub fn from_f32(value: f32) -> Length {
        if !value.is_finite() {
            return Length::ZERO;
        }
        let milli = (value as f64 * 1000.0).round();
        let milli = milli.clamp(i64::MIN as f64, i64::MAX as f64) as i64;
        Length::from_milli_i64(milli)
    }

    pub fn to_f32(self) -> f32 {
        self.0.to_num()
    }

    pub fn to_milli_i64(self) -> i64 {
        let bits = self.0.to_bits() as i128;
        let denom = 1i128 << 32;
        let scaled = bits * 1000;
        let adj = if scaled >= 0 { denom / 2 } else { -denom / 2 };
        let milli = (scaled + adj) / denom;
        milli.clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }

    pub fn from_milli_i64(milli: i64) -> Length {
        Length::from_milli_i128(milli as i128)
    }

    fn from_milli_i128(milli: i128) -> Length {
        let denom = 1i128 << 32;
        let adj = if milli >= 0 { 500 } else { -500 };
        let bits = (milli * denom + adj) / 1000;
        let bits = bits.clamp(i64::MIN as i128, i64::MAX as i128) as i64;
        Length(I32F32::from_bits(bits))
    }

    pub fn max(self, other: Length) -> Length {
        if self >= other { self } else { other }
    }

    pub fn min(self, other: Length) -> Length {
        if self <= other { self } else { other }
    }

    pub fn is_positive(self) -> bool {
        self.to_milli_i64() > 0
    }

    /// `self * num / denom`, rounded half away from zero.
    pub fn mul_ratio(self, num: i32, denom: i32) -> Length {
        if denom == 0 {
            return Length::ZERO;
        }
        let milli = self.to_milli_i64() as i128;
        Length::from_milli_i128(div_round_i128(milli.saturating_mul(num as i128), denom as i128))
    }
}

fn div_round_i128(num: i128, den: i128) -> i128 {
    if den == 0 {
        return 0;
    }
    let half = den.abs() / 2;
    if (num >= 0) == (den > 0) {
        (num.abs() + half) / den.abs()
    } else {
        -((num.abs() + half) / den.abs())
    }
}

impl std::ops::Add for Length {
    type Output = Length;
    fn add(self, rhs: Length) -> Length {
        Length::from_milli_i128(self.to_milli_i64() as i128 + rhs.to_milli_i64() as i128)
    }
}

impl std::ops::AddAssign for Length {
    fn add_assign(&mut self, rhs: Length) {
        *self = *self + rhs;
    }
}

impl std::ops::Sub for Length {
    type Output = Length;
    fn sub(self, rhs: Length) -> Length {
        Length::from_milli_i128(self.to_milli_i64() as i128 - rhs.to_milli_i64() as i128)
    }
}

impl std::ops::SubAssign for Length {
    fn sub_assign(&mut self, rhs: Length) {
        *self = *self - rhs;
    }
}

impl std::ops::Mul<i32> for Length {
    type Output = Length;
    fn mul(self, rhs: i32) -> Length {
        let milli = self.to_milli_i64() as i128;
        Length::from_milli_i128(milli.saturating_mul(rhs as i128))
    }
}

impl std::ops::Mul<f32> for Length {
    type Output = Length;
    fn mul(self, rhs: f32) -> Length {
        if !rhs.is_finite() {
            return Length::ZERO;
        }
        Length::from_f32(self.to_f32() * rhs)
    }
}

impl std::ops::Div<i32> for Length {
    type Output = Length;
    fn div(self, rhs: i32) -> Length {
        self.mul_ratio(1, rhs)
    }
}

impl std::ops::Neg for Length {
    type Output = Length;
    fn neg(self) -> Length {
        Length::from_milli_i128(-(self.to_milli_i64() as i128))
    }
}

impl std::iter::Sum for Length {
    fn sum<I: Iterator<Item = Length>>(iter: I) -> Length {
        iter.fold(Length::ZERO, |acc, v| acc + v)
    }
}

impl<'a> std::iter::Sum<&'a Length> for Length {
    fn sum<I: Iterator<Item = &'a Length>>(iter: I) -> Length {
        iter.fold(Length::ZERO, |acc, v| acc + *v)
    }
}

impl Serialize for Length {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f32(self.to_f32())
    }
}

impl<'de> Deserialize<'de> for Length {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        f32::deserialize(deserializer).map(Length::from_f32)
    }
}

/// User unit of a document. All geometry is expressed in this unit; font sizes are
/// always typographic points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Pt,
    #[default]
    Mm,
    Inch,
}

impl Unit {
    pub fn points_per_unit(self) -> f32 {
        match self {
            Unit::Pt => 1.0,
            Unit::Mm => 72.0 / 25.4,
            Unit::Inch => 72.0,
        }
    }

    /// Converts a font size in points into this unit.
    pub fn from_points(self, points: f32) -> Length {
        Length::from_f32(points / self.points_per_unit())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: Length,
    pub height: Length,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width: Length::from_f32(width),
            height: Length::from_f32(height),
        }
    }

    // Paper sizes in millimetres.
    pub fn a4() -> Self {
        Self::new(210.0, 297.0)
    }

    pub fn a5() -> Self {
        Self::new(148.0, 210.0)
    }

    pub fn letter() -> Self {
        Self::new(215.9, 279.4)
    }

    pub fn landscape(self) -> Self {
        Self {
            width: self.height,
            height: self.width,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: Length,
    pub y: Length,
    pub width: Length,
    pub height: Length,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    pub top: Length,
    pub right: Length,
    pub bottom: Length,
    pub left: Length,
}

impl Margins {
    pub fn all(value: f32) -> Self {
        let v = Length::from_f32(value);
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };

    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };

    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// 8-bit channels, the form statement palettes are usually written in.
    pub fn rgb8(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
        }
    }
}
