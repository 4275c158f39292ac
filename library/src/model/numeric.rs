//! `Numeric`: a single value type for every number that flows through a script.
//!
//! Nodes operate on `Numeric` pins instead of one pin type per primitive. The tag of
//! the original primitive is kept so that an `Int` coming out of the data model still
//! behaves like an integer (equality, ordering, formatting) after the round trip.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::Sum;
use std::ops::{Add, Mul, Neg, Rem, Sub};

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use super::DataType;

#[derive(Serialize, Deserialize, Clone, Copy, Debug)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Numeric {
    Byte(u8),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
}

impl Numeric {
    /// Returns true if values of `data_type` can be represented as a `Numeric`.
    pub fn is_type_compatible(data_type: &DataType) -> bool {
        matches!(
            data_type,
            DataType::Numeric
                | DataType::Byte
                | DataType::Int
                | DataType::Long
                | DataType::Float
                | DataType::Double
        )
    }

    /// The primitive type this numeric was created from.
    pub fn data_type(&self) -> DataType {
        match self {
            Numeric::Byte(_) => DataType::Byte,
            Numeric::Int(_) => DataType::Int,
            Numeric::Long(_) => DataType::Long,
            Numeric::Float(_) => DataType::Float,
            Numeric::Double(_) => DataType::Double,
        }
    }

    pub fn is_integral(&self) -> bool {
        matches!(self, Numeric::Byte(_) | Numeric::Int(_) | Numeric::Long(_))
    }

    pub fn as_f64(&self) -> f64 {
        match *self {
            Numeric::Byte(v) => v as f64,
            Numeric::Int(v) => v as f64,
            Numeric::Long(v) => v as f64,
            Numeric::Float(v) => v as f64,
            Numeric::Double(v) => v,
        }
    }

    pub fn to_f32(&self) -> f32 {
        self.as_f64() as f32
    }

    /// Rounds half away from zero, saturating at the `i32` bounds.
    pub fn to_i32(&self) -> i32 {
        match *self {
            Numeric::Byte(v) => v as i32,
            Numeric::Int(v) => v,
            Numeric::Long(v) => v.clamp(i32::MIN as i64, i32::MAX as i64) as i32,
            Numeric::Float(_) | Numeric::Double(_) => self.as_f64().round() as i32,
        }
    }

    pub fn to_i64(&self) -> i64 {
        match *self {
            Numeric::Byte(v) => v as i64,
            Numeric::Int(v) => v as i64,
            Numeric::Long(v) => v,
            Numeric::Float(_) | Numeric::Double(_) => self.as_f64().round() as i64,
        }
    }

    /// Clamps into `0..=255`.
    pub fn to_u8(&self) -> u8 {
        match *self {
            Numeric::Byte(v) => v,
            _ => self.as_f64().clamp(0.0, 255.0) as u8,
        }
    }

    /// Converts into the primitive kind named by `data_type`.
    ///
    /// `Numeric` and non-numeric targets keep the current tag.
    pub fn convert_to(&self, data_type: &DataType) -> Numeric {
        match data_type {
            DataType::Byte => Numeric::Byte(self.to_u8()),
            DataType::Int => Numeric::Int(self.to_i32()),
            DataType::Long => Numeric::Long(self.to_i64()),
            DataType::Float => Numeric::Float(self.to_f32()),
            DataType::Double => Numeric::Double(self.as_f64()),
            _ => *self,
        }
    }

    /// Parses any integer or float literal. Integers keep an integral tag.
    pub fn parse(text: &str) -> Option<Numeric> {
        let text = text.trim();
        if let Ok(v) = text.parse::<i64>() {
            return Some(Numeric::integral(v, 1));
        }
        text.parse::<f64>().ok().map(Numeric::Double)
    }

    pub fn parse_or_default(text: &str) -> Numeric {
        Numeric::parse(text).unwrap_or_default()
    }

    /// Division always produces a floating result. Returns `None` when dividing by zero.
    pub fn checked_div(self, rhs: Numeric) -> Option<Numeric> {
        if rhs.as_f64() == 0.0 {
            return None;
        }
        let value = self.as_f64() / rhs.as_f64();
        if self.is_wide() || rhs.is_wide() {
            Some(Numeric::Double(value))
        } else {
            Some(Numeric::Float(value as f32))
        }
    }

    pub fn abs(self) -> Numeric {
        if self < Numeric::Int(0) { -self } else { self }
    }

    fn integral_value(&self) -> Option<i64> {
        match *self {
            Numeric::Byte(v) => Some(v as i64),
            Numeric::Int(v) => Some(v as i64),
            Numeric::Long(v) => Some(v),
            _ => None,
        }
    }

    fn integral_rank(&self) -> u8 {
        match self {
            Numeric::Byte(_) => 0,
            Numeric::Int(_) => 1,
            _ => 2,
        }
    }

    fn is_wide(&self) -> bool {
        matches!(self, Numeric::Long(_) | Numeric::Double(_))
    }

    /// Builds the narrowest integral numeric of at least `rank` that holds `value`.
    fn integral(value: i64, rank: u8) -> Numeric {
        if rank == 0 {
            if let Ok(v) = u8::try_from(value) {
                return Numeric::Byte(v);
            }
        }
        if rank <= 1 {
            if let Ok(v) = i32::try_from(value) {
                return Numeric::Int(v);
            }
        }
        Numeric::Long(value)
    }

    fn combine(
        self,
        rhs: Numeric,
        int_op: fn(i64, i64) -> Option<i64>,
        float_op: fn(f64, f64) -> f64,
    ) -> Numeric {
        if let (Some(a), Some(b)) = (self.integral_value(), rhs.integral_value()) {
            let rank = self.integral_rank().max(rhs.integral_rank());
            return match int_op(a, b) {
                Some(v) => Numeric::integral(v, rank),
                None => Numeric::Double(float_op(a as f64, b as f64)),
            };
        }

        let value = float_op(self.as_f64(), rhs.as_f64());
        if matches!(self, Numeric::Double(_)) || matches!(rhs, Numeric::Double(_)) {
            Numeric::Double(value)
        } else {
            Numeric::Float(value as f32)
        }
    }
}

impl Default for Numeric {
    fn default() -> Self {
        Numeric::Int(0)
    }
}

impl PartialEq for Numeric {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Numeric {}

impl PartialOrd for Numeric {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Mixed integer/float pairs compare exactly, so equality stays transitive past 2^53.
impl Ord for Numeric {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.integral_value(), other.integral_value()) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(a), None) => cmp_integer_to_float(a, other.as_f64()),
            (None, Some(b)) => cmp_integer_to_float(b, self.as_f64()).reverse(),
            (None, None) => OrderedFloat(self.as_f64()).cmp(&OrderedFloat(other.as_f64())),
        }
    }
}

// NaN sorts above every number, as in `OrderedFloat`.
fn cmp_integer_to_float(integer: i64, float: f64) -> Ordering {
    const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;
    if float.is_nan() || float >= TWO_POW_63 {
        return Ordering::Less;
    }
    if float < -TWO_POW_63 {
        return Ordering::Greater;
    }
    let whole = float.trunc();
    match integer.cmp(&(whole as i64)) {
        Ordering::Equal => 0.0f64.partial_cmp(&(float - whole)).unwrap_or(Ordering::Equal),
        unequal => unequal,
    }
}

impl Hash for Numeric {
    fn hash<H: Hasher>(&self, state: &mut H) {
        OrderedFloat(self.as_f64()).hash(state);
    }
}

impl fmt::Display for Numeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Numeric::Byte(v) => write!(f, "{}", v),
            Numeric::Int(v) => write!(f, "{}", v),
            Numeric::Long(v) => write!(f, "{}", v),
            Numeric::Float(v) => write!(f, "{}", v),
            Numeric::Double(v) => write!(f, "{}", v),
        }
    }
}

impl Add for Numeric {
    type Output = Numeric;

    fn add(self, rhs: Numeric) -> Numeric {
        self.combine(rhs, i64::checked_add, |a, b| a + b)
    }
}

impl Sub for Numeric {
    type Output = Numeric;

    fn sub(self, rhs: Numeric) -> Numeric {
        self.combine(rhs, i64::checked_sub, |a, b| a - b)
    }
}

impl Mul for Numeric {
    type Output = Numeric;

    fn mul(self, rhs: Numeric) -> Numeric {
        self.combine(rhs, i64::checked_mul, |a, b| a * b)
    }
}

impl Rem for Numeric {
    type Output = Numeric;

    /// Integral remainder by zero falls back to the float result (NaN).
    fn rem(self, rhs: Numeric) -> Numeric {
        self.combine(rhs, i64::checked_rem, |a, b| a % b)
    }
}

impl Neg for Numeric {
    type Output = Numeric;

    fn neg(self) -> Numeric {
        match self {
            Numeric::Byte(v) => Numeric::Int(-(v as i32)),
            Numeric::Int(v) => v
                .checked_neg()
                .map(Numeric::Int)
                .unwrap_or(Numeric::Long(-(v as i64))),
            Numeric::Long(v) => v
                .checked_neg()
                .map(Numeric::Long)
                .unwrap_or(Numeric::Double(-(v as f64))),
            Numeric::Float(v) => Numeric::Float(-v),
            Numeric::Double(v) => Numeric::Double(-v),
        }
    }
}

impl Sum for Numeric {
    fn sum<I: Iterator<Item = Numeric>>(iter: I) -> Numeric {
        iter.fold(Numeric::default(), |acc, v| acc + v)
    }
}

impl From<u8> for Numeric {
    fn from(value: u8) -> Self {
        Numeric::Byte(value)
    }
}

impl From<i32> for Numeric {
    fn from(value: i32) -> Self {
        Numeric::Int(value)
    }
}

impl From<i64> for Numeric {
    fn from(value: i64) -> Self {
        Numeric::Long(value)
    }
}

impl From<f32> for Numeric {
    fn from(value: f32) -> Self {
        Numeric::Float(value)
    }
}

impl From<f64> for Numeric {
    fn from(value: f64) -> Self {
        Numeric::Double(value)
    }
}
