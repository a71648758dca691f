//! Data models for the GenericTicketConnector.
//!
//! This module contains the typed objects exchanged with OTRS
//! (tickets, articles, dynamic fields, attachments) and the mapping
//! between them and their XML elements.

use crate::error::OtrsError;
use crate::xml::Element;

/// Generates the name-keyed accessors of an object's scalar schema.
///
/// Each entry maps a struct field to its XML tag. `int` fields are
/// `Option<i64>` coerced with `parse_int`, `text` fields are
/// `Option<String>` holding the raw text and read back autocast.
/// Serialization follows the order given here.
macro_rules! named_fields {
    (@parse int, $tag:literal, $raw:expr) => {
        $crate::models::value::parse_int($tag, $raw)?
    };
    (@parse text, $tag:literal, $raw:expr) => {
        $crate::models::value::parse_text($raw)
    };
    (@get int, $value:expr) => {
        $value.map($crate::models::FieldValue::Integer)
    };
    (@get text, $value:expr) => {
        $value.as_deref().map($crate::models::FieldValue::autocast)
    };
    (@json int, $value:expr) => {
        $value.map($crate::models::FieldValue::Integer)
    };
    (@json text, $value:expr) => {
        $value.clone().map($crate::models::FieldValue::Text)
    };
    (@push int, $element:expr, $tag:literal, $value:expr) => {
        $crate::models::value::push_int($element, $tag, $value)
    };
    (@push text, $element:expr, $tag:literal, $value:expr) => {
        $crate::models::value::push_text($element, $tag, &$value)
    };
    ($ty:ident { $( $field:ident : $kind:ident = $tag:literal ),* $(,)? }) => {
        impl $ty {
            /// XML names of the schema fields, in serialization order.
            pub const FIELD_NAMES: &'static [&'static str] = &[$($tag),*];

            /// Coerces and stores a schema field. Returns `false` for unknown names.
            fn set_named(&mut self, name: &str, raw: &str) -> Result<bool, $crate::error::OtrsError> {
                match name {
                    $( $tag => { self.$field = named_fields!(@parse $kind, $tag, raw); } )*
                    _ => return Ok(false),
                }
                Ok(true)
            }

            /// Stores a field read from XML.
            ///
            /// Unknown names and numeric fields holding text land in `extra`
            /// with their raw value instead of failing the whole object.
            fn set_unmarshalled(&mut self, name: &str, raw: &str) {
                match self.set_named(name, raw) {
                    Ok(true) => {}
                    Ok(false) => self.extra.set(name, raw),
                    Err(err) => {
                        tracing::warn!(error = %err, "Keeping unparsable value as extra field");
                        self.extra.set(name, raw);
                    }
                }
            }

            fn get_named(&self, name: &str) -> Option<$crate::models::FieldValue> {
                match name {
                    $( $tag => named_fields!(@get $kind, self.$field), )*
                    _ => None,
                }
            }

            fn push_named(&self, element: &mut $crate::xml::Element) {
                $( named_fields!(@push $kind, element, $tag, self.$field); )*
            }

            fn serialize_named<M: serde::ser::SerializeMap>(&self, map: &mut M) -> Result<(), M::Error> {
                $(
                    if let Some(value) = named_fields!(@json $kind, self.$field) {
                        map.serialize_entry($tag, &value)?;
                    }
                )*
                Ok(())
            }
        }
    };
}

mod article;
mod attachment;
mod dynamic_field;
mod ticket;
pub(crate) mod value;

pub use article::*;
pub use attachment::*;
pub use dynamic_field::*;
pub use ticket::*;
pub use value::{ExtraFields, FieldValue};

/// An object with a fixed XML element representation.
pub trait XmlObject: Sized {
    /// Name of the element this object maps to.
    const XML_NAME: &'static str;

    /// Builds the object from its element.
    ///
    /// # Errors
    ///
    /// Returns `OtrsError::InvalidField` when a numeric field holds text.
    fn from_element(element: &Element) -> Result<Self, OtrsError>;

    /// Builds the element for this object. Unset fields are omitted.
    fn to_element(&self) -> Element;

    /// Parses an XML document whose root is this object's element.
    fn from_xml(xml: &str) -> Result<Self, OtrsError> {
        let element = Element::parse(xml)?;
        Self::from_element(&element)
    }

    /// Serializes this object to an XML string.
    fn to_xml(&self) -> Result<String, OtrsError> {
        self.to_element().write_to_string()
    }
}

/// Fails unless `element` is named `expected`.
pub(crate) fn expect_name(element: &Element, expected: &str) -> Result<(), OtrsError> {
    if element.name == expected {
        Ok(())
    } else {
        Err(OtrsError::malformed(format!(
            "expected <{}> element, got <{}>",
            expected, element.name
        )))
    }
}
