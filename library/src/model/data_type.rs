//! Declared types of pins and values.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Data type of a pin or a value.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(tag = "type", content = "name", rename_all = "lowercase")]
pub enum DataType {
    /// Accepts any value (generic pin).
    Any,
    /// Any number, see `Numeric`.
    Numeric,
    Byte,
    Int,
    Long,
    Float,
    Double,
    Boolean,
    Text,
    /// RGBA color.
    Color,
    /// A reflected data-model object, identified by its type name.
    Object(String),
    /// A plugin-defined value kind.
    Extension(String),
}

impl DataType {
    /// Value types never hold `Null`; their default is substituted instead.
    pub fn is_value_type(&self) -> bool {
        matches!(
            self,
            DataType::Numeric
                | DataType::Byte
                | DataType::Int
                | DataType::Long
                | DataType::Float
                | DataType::Double
                | DataType::Boolean
                | DataType::Color
        )
    }

    pub fn is_numeric(&self) -> bool {
        super::Numeric::is_type_compatible(self)
    }

    /// Plain assignability: can a value whose runtime type is `source` be stored
    /// in a slot declared as `self`.
    pub fn is_assignable_from(&self, source: &DataType) -> bool {
        self == source || *self == DataType::Any || (*self == DataType::Numeric && source.is_numeric())
    }

    /// Name used in logs and errors.
    pub fn name(&self) -> String {
        match self {
            DataType::Object(name) | DataType::Extension(name) => name.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DataType::Any => "Any",
            DataType::Numeric => "Numeric",
            DataType::Byte => "Byte",
            DataType::Int => "Int",
            DataType::Long => "Long",
            DataType::Float => "Float",
            DataType::Double => "Double",
            DataType::Boolean => "Boolean",
            DataType::Text => "Text",
            DataType::Color => "Color",
            DataType::Object(name) => return write!(f, "Object<{}>", name),
            DataType::Extension(kind) => return write!(f, "Extension<{}>", kind),
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_types() {
        assert!(DataType::Int.is_value_type());
        assert!(DataType::Color.is_value_type());
        assert!(!DataType::Text.is_value_type());
        assert!(!DataType::Object("Weather".into()).is_value_type());
        assert!(!DataType::Any.is_value_type());
    }

    #[test]
    fn test_assignability() {
        assert!(DataType::Numeric.is_assignable_from(&DataType::Byte));
        assert!(DataType::Any.is_assignable_from(&DataType::Text));
        assert!(!DataType::Int.is_assignable_from(&DataType::Float));
        assert!(!DataType::Text.is_assignable_from(&DataType::Any));
    }

    #[test]
    fn test_display() {
        assert_eq!(DataType::Numeric.to_string(), "Numeric");
        assert_eq!(DataType::Object("Cpu".into()).to_string(), "Object<Cpu>");
        assert_eq!(DataType::Extension("gradient".into()).name(), "gradient");
    }
}
