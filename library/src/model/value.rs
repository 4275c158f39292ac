//! Values carried by pins.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::reflect::ObjectRef;
use super::{DataType, Numeric};

/// RGBA color.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Builds a color from hue (degrees), saturation and lightness (0-100).
    pub fn from_hsl(h: f32, s: f32, l: f32) -> Self {
        let s = (s / 100.0).clamp(0.0, 1.0);
        let l = (l / 100.0).clamp(0.0, 1.0);
        let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
        let hp = (h.rem_euclid(360.0)) / 60.0;
        let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
        let (r1, g1, b1) = match hp as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        let m = l - c / 2.0;
        let channel = |v: f32| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
        Color::rgba(channel(r1), channel(g1), channel(b1), 255)
    }

    /// Linear interpolation between two colors, `t` in `0..=1`.
    pub fn lerp(self, other: Color, t: f32) -> Color {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Color::rgba(
            mix(self.r, other.r),
            mix(self.g, other.g),
            mix(self.b, other.b),
            mix(self.a, other.a),
        )
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.a, self.r, self.g, self.b)
    }
}

/// A plugin-defined value kind.
///
/// Plugins register the kind name with the `NodeTypeStore`; pins declared as
/// `DataType::Extension(kind)` only accept values whose `kind()` matches.
pub trait ExtensionValue: Any + Send + Sync + fmt::Debug {
    fn kind(&self) -> &str;

    fn as_any(&self) -> &dyn Any;

    fn eq_dyn(&self, other: &dyn ExtensionValue) -> bool;

    fn display(&self) -> String {
        format!("{:?}", self)
    }
}

pub type ExtensionRef = Arc<dyn ExtensionValue>;

/// The value held by a pin.
#[derive(Clone, Debug, Default)]
pub enum Value {
    /// No value. Only reference types (`Text` excluded) may hold it.
    #[default]
    Null,
    Number(Numeric),
    Boolean(bool),
    Text(String),
    Color(Color),
    Object(ObjectRef),
    Extension(ExtensionRef),
}

impl Value {
    /// The default value of a declared type.
    pub fn default_for(data_type: &DataType) -> Value {
        match data_type {
            DataType::Numeric | DataType::Int => Value::Number(Numeric::Int(0)),
            DataType::Byte => Value::Number(Numeric::Byte(0)),
            DataType::Long => Value::Number(Numeric::Long(0)),
            DataType::Float => Value::Number(Numeric::Float(0.0)),
            DataType::Double => Value::Number(Numeric::Double(0.0)),
            DataType::Boolean => Value::Boolean(false),
            DataType::Text => Value::Text(String::new()),
            DataType::Color => Value::Color(Color::default()),
            DataType::Any | DataType::Object(_) | DataType::Extension(_) => Value::Null,
        }
    }

    /// Concrete type of the value, `None` for `Null`.
    pub fn runtime_type(&self) -> Option<DataType> {
        match self {
            Value::Null => None,
            Value::Number(n) => Some(n.data_type()),
            Value::Boolean(_) => Some(DataType::Boolean),
            Value::Text(_) => Some(DataType::Text),
            Value::Color(_) => Some(DataType::Color),
            Value::Object(o) => Some(DataType::Object(o.type_name().to_string())),
            Value::Extension(e) => Some(DataType::Extension(e.kind().to_string())),
        }
    }

    /// Display name of the runtime type, used in errors.
    pub fn type_label(&self) -> DataType {
        self.runtime_type().unwrap_or(DataType::Any)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Can this value be stored in a pin declared as `data_type`.
    pub fn is_assignable_to(&self, data_type: &DataType) -> bool {
        match self.runtime_type() {
            None => !data_type.is_value_type(),
            Some(runtime) => data_type.is_assignable_from(&runtime),
        }
    }

    /// Converts a value crossing a connection into the target pin's type.
    ///
    /// Numbers are converted between primitive kinds, `Null` becomes the default of
    /// value types. Anything else is returned unchanged.
    pub fn coerce_to(&self, data_type: &DataType) -> Value {
        match (self, data_type) {
            (Value::Null, t) if t.is_value_type() || *t == DataType::Text => Value::default_for(t),
            (Value::Number(n), t) if t.is_numeric() => Value::Number(n.convert_to(t)),
            _ => self.clone(),
        }
    }

    pub fn as_numeric(&self) -> Option<Numeric> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<Color> {
        match self {
            Value::Color(c) => Some(*c),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Downcasts an extension value to its concrete plugin type.
    pub fn as_extension<T: ExtensionValue>(&self) -> Option<&T> {
        match self {
            Value::Extension(e) => e.as_any().downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Color(a), Value::Color(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            (Value::Extension(a), Value::Extension(b)) => a.eq_dyn(b.as_ref()),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Number(n) => write!(f, "{}", n),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Text(s) => write!(f, "{}", s),
            Value::Color(c) => write!(f, "{}", c),
            Value::Object(o) => write!(f, "{}", o.type_name()),
            Value::Extension(e) => write!(f, "{}", e.display()),
        }
    }
}

impl From<Numeric> for Value {
    fn from(value: Numeric) -> Self {
        Value::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(Numeric::Int(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(Numeric::Double(value))
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Number(Numeric::Float(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<Color> for Value {
    fn from(value: Color) -> Self {
        Value::Color(value)
    }
}
