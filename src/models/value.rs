//! Field values and string-to-integer coercion.
//!
//! Everything on the wire is text. Numeric schema fields are coerced
//! strictly through [`parse_int`]. Text schema fields and elements outside
//! the schema keep their raw text and are read through
//! [`FieldValue::autocast`], so `"9"` reads as `9` but writes back as `"9"`.

use std::fmt;

use serde::Serialize;

use crate::error::OtrsError;
use crate::xml::Element;

/// A scalar value of an OTRS object field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Numeric field or numeric-looking text.
    Integer(i64),
    /// Anything else.
    Text(String),
}

impl FieldValue {
    /// Converts raw text to an integer when it looks like one.
    ///
    /// ```
    /// use otrs::models::FieldValue;
    ///
    /// assert_eq!(FieldValue::autocast("43"), FieldValue::Integer(43));
    /// assert_eq!(FieldValue::autocast("3 normal"), FieldValue::Text("3 normal".into()));
    /// ```
    pub fn autocast(raw: &str) -> Self {
        match raw.trim().parse::<i64>() {
            Ok(n) => FieldValue::Integer(n),
            Err(_) => FieldValue::Text(raw.to_string()),
        }
    }

    /// Returns the integer, if this is one.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(n) => Some(*n),
            FieldValue::Text(_) => None,
        }
    }

    /// Returns the text, if this is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Integer(_) => None,
            FieldValue::Text(s) => Some(s),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Integer(n) => write!(f, "{}", n),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

/// Coerces a numeric field. Blank input means "unset".
pub(crate) fn parse_int(field: &str, raw: &str) -> Result<Option<i64>, OtrsError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<i64>()
        .map(Some)
        .map_err(|_| OtrsError::invalid_field(field, raw))
}

/// Normalizes a text field. Empty input means "unset".
pub(crate) fn parse_text(raw: &str) -> Option<String> {
    if raw.is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}

/// Appends `<name>value</name>` when the value is set.
pub(crate) fn push_int(element: &mut Element, name: &str, value: Option<i64>) {
    if let Some(value) = value {
        element.push(Element::with_text(name, value.to_string()));
    }
}

/// Appends `<name>value</name>` when the value is set.
pub(crate) fn push_text(element: &mut Element, name: &str, value: &Option<String>) {
    if let Some(value) = value {
        element.push(Element::with_text(name, value.as_str()));
    }
}

/// Scalar children that are not part of an object's named schema.
///
/// Values are stored as received and kept in document order, so an
/// unmarshalled object writes them back unchanged. Reads autocast.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtraFields(Vec<(String, String)>);

impl ExtraFields {
    /// Sets a field, replacing an existing value with the same name.
    pub fn set(&mut self, name: &str, value: impl ToString) {
        let value = value.to_string();
        match self.0.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1 = value,
            None => self.0.push((name.to_string(), value)),
        }
    }

    /// Returns the value of a field, autocast.
    pub fn get(&self, name: &str) -> Option<FieldValue> {
        self.raw(name).map(FieldValue::autocast)
    }

    /// Returns the value of a field as received.
    pub fn raw(&self, name: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    /// Removes a field.
    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        let index = self.0.iter().position(|(k, _)| k == name)?;
        Some(FieldValue::autocast(&self.0.remove(index).1))
    }

    /// Iterates over fields in insertion order, autocast.
    pub fn iter(&self) -> impl Iterator<Item = (&str, FieldValue)> + '_ {
        self.0.iter().map(|(k, v)| (k.as_str(), FieldValue::autocast(v)))
    }

    /// Returns true if no extra fields are present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn write_into(&self, element: &mut Element) {
        for (name, value) in &self.0 {
            element.push(Element::with_text(name.as_str(), value.as_str()));
        }
    }
}
