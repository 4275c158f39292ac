//! Compile-time reflection for data-model objects.
//!
//! Data-model types describe their public fields once through `Reflectable::descriptor`.
//! `ObjectOutputPins` turns that description into one output pin per eligible field and
//! reads values through the captured accessors, so nothing is looked up per frame.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::{DataType, Value};

/// A data-model type whose fields can be exposed as output pins.
pub trait Reflectable: Any + Send + Sync + fmt::Debug {
    /// Runtime type identity, matches `TypeDescriptor::name`.
    fn type_name(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;

    fn descriptor() -> TypeDescriptor
    where
        Self: Sized;
}

pub type ObjectRef = Arc<dyn Reflectable>;

/// A field read, downcasting through the declaring type.
pub type Accessor = Arc<dyn Fn(&dyn Reflectable) -> Value + Send + Sync>;

/// A single public field of a reflected type.
#[derive(Clone)]
pub struct FieldInfo {
    pub name: &'static str,
    pub data_type: DataType,
    /// Excluded from pin generation.
    pub ignored: bool,
    accessor: Accessor,
}

impl FieldInfo {
    pub fn new<T, F>(name: &'static str, data_type: DataType, read: F) -> Self
    where
        T: Reflectable,
        F: Fn(&T) -> Value + Send + Sync + 'static,
    {
        let accessor: Accessor = Arc::new(move |item: &dyn Reflectable| {
            match item.as_any().downcast_ref::<T>() {
                Some(item) => read(item),
                None => Value::Null,
            }
        });
        Self {
            name,
            data_type,
            ignored: false,
            accessor,
        }
    }

    pub fn ignored(mut self) -> Self {
        self.ignored = true;
        self
    }

    pub fn accessor(&self) -> Accessor {
        self.accessor.clone()
    }

    pub fn read(&self, item: &dyn Reflectable) -> Value {
        (self.accessor)(item)
    }
}

impl fmt::Debug for FieldInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldInfo")
            .field("name", &self.name)
            .field("data_type", &self.data_type)
            .field("ignored", &self.ignored)
            .finish()
    }
}

/// Shape of a type as seen by `ObjectOutputPins`.
#[derive(Clone, Debug)]
pub enum TypeShape {
    /// Value-like types (numbers, booleans, text, colors): exposed as one pin.
    Value(DataType),
    /// Class-like types: one pin per eligible field, in declaration order.
    Object(Vec<FieldInfo>),
}

#[derive(Clone, Debug)]
pub struct TypeDescriptor {
    pub name: String,
    pub shape: TypeShape,
}

impl TypeDescriptor {
    pub fn value(data_type: DataType) -> Self {
        Self {
            name: data_type.name(),
            shape: TypeShape::Value(data_type),
        }
    }

    pub fn object(name: impl Into<String>, fields: Vec<FieldInfo>) -> Self {
        Self {
            name: name.into(),
            shape: TypeShape::Object(fields),
        }
    }

    pub fn of<T: Reflectable>() -> Self {
        T::descriptor()
    }

    /// The `DataType` of values described by this descriptor.
    pub fn data_type(&self) -> DataType {
        match &self.shape {
            TypeShape::Value(t) => t.clone(),
            TypeShape::Object(_) => DataType::Object(self.name.clone()),
        }
    }
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.data_type() == other.data_type()
    }
}

/// Turns a field identifier into a display label: `cpu_load` and `cpuLoad` both
/// become "Cpu load", acronyms are kept ("HTTPStatus" → "HTTP status").
pub fn humanize(identifier: &str) -> String {
    let chars: Vec<char> = identifier.chars().collect();
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c == '-' || c == ' ' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower) {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }

    let mut out = String::new();
    for (i, word) in words.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let is_acronym = word.chars().count() > 1 && word.chars().all(|c| !c.is_lowercase());
        if is_acronym {
            out.push_str(word);
        } else if i == 0 {
            let mut chars = word.chars();
            if let Some(first) = chars.next() {
                out.extend(first.to_uppercase());
                out.push_str(&chars.as_str().to_lowercase());
            }
        } else {
            out.push_str(&word.to_lowercase());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Numeric;

    #[derive(Debug)]
    struct Sensor {
        reading: i32,
    }

    impl Reflectable for Sensor {
        fn type_name(&self) -> &'static str {
            "Sensor"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn descriptor() -> TypeDescriptor {
            TypeDescriptor::object(
                "Sensor",
                vec![FieldInfo::new("reading", DataType::Int, |s: &Sensor| {
                    Value::from(s.reading)
                })],
            )
        }
    }

    #[derive(Debug)]
    struct Other;

    impl Reflectable for Other {
        fn type_name(&self) -> &'static str {
            "Other"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn descriptor() -> TypeDescriptor {
            TypeDescriptor::object("Other", vec![])
        }
    }

    #[test]
    fn test_humanize() {
        assert_eq!(humanize("cpu_load"), "Cpu load");
        assert_eq!(humanize("currentTemperature"), "Current temperature");
        assert_eq!(humanize("HTTPStatus"), "HTTP status");
        assert_eq!(humanize("Name"), "Name");
        assert_eq!(humanize("fan2Speed"), "Fan2 speed");
    }

    #[test]
    fn test_accessor_reads_through_declaring_type() {
        let descriptor = TypeDescriptor::of::<Sensor>();
        assert_eq!(descriptor.data_type(), DataType::Object("Sensor".into()));
        let TypeShape::Object(fields) = &descriptor.shape else {
            panic!("expected an object shape");
        };
        let value = fields[0].read(&Sensor { reading: 12 });
        assert_eq!(value, Value::Number(Numeric::Int(12)));
        // A foreign object never reaches the typed closure.
        assert!(fields[0].read(&Other).is_null());
    }
}
