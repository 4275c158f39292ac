//! Value model shared by pins, nodes and the registry.

pub mod data_type;
pub mod numeric;
pub mod reflect;
pub mod value;

pub use data_type::DataType;
pub use numeric::Numeric;
pub use reflect::{humanize, Accessor, FieldInfo, ObjectRef, Reflectable, TypeDescriptor, TypeShape};
pub use value::{Color, ExtensionRef, ExtensionValue, Value};
