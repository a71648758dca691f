//! Dynamic field model.

use serde::Serialize;

use super::{expect_name, XmlObject};
use crate::error::OtrsError;
use crate::xml::Element;

/// A custom field value attached to a ticket or article.
///
/// Multiselect fields carry several `Value` elements; single-value
/// fields carry one. An empty `<Value/>` reads as `""`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DynamicField {
    /// Field name as configured in OTRS.
    pub name: String,
    /// Values in document order.
    #[serde(rename = "Value")]
    pub values: Vec<String>,
}

impl DynamicField {
    /// Creates a single-value dynamic field.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: vec![value.into()],
        }
    }

    /// Creates a multi-value dynamic field.
    pub fn multi<I, V>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the first value.
    pub fn value(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }
}

impl XmlObject for DynamicField {
    const XML_NAME: &'static str = "DynamicField";

    fn from_element(element: &Element) -> Result<Self, OtrsError> {
        expect_name(element, Self::XML_NAME)?;
        let name = element
            .child_text("Name")
            .ok_or_else(|| OtrsError::malformed("DynamicField without Name"))?
            .to_string();
        let values = element
            .children_named("Value")
            .map(|v| v.text.clone().unwrap_or_default())
            .collect();
        Ok(Self { name, values })
    }

    fn to_element(&self) -> Element {
        let mut element = Element::new(Self::XML_NAME);
        element.push(Element::with_text("Name", self.name.as_str()));
        for value in &self.values {
            element.push(Element::with_text("Value", value.as_str()));
        }
        element
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_single_value() {
        let field = DynamicField::from_xml(
            "<DynamicField><Name>ProcessID</Name><Value>P1</Value></DynamicField>",
        )
        .unwrap();
        assert_eq!(field, DynamicField::new("ProcessID", "P1"));
        assert_eq!(field.value(), Some("P1"));
    }

    #[test]
    fn test_multiselect_values() {
        let field = DynamicField::from_xml(
            "<DynamicField><Name>Tags</Name><Value>a</Value><Value>b</Value></DynamicField>",
        )
        .unwrap();
        assert_eq!(field.values, vec!["a", "b"]);
    }

    #[test]
    fn test_empty_value_is_kept() {
        let field =
            DynamicField::from_xml("<DynamicField><Name>Unset</Name><Value/></DynamicField>").unwrap();
        assert_eq!(field.values, vec![""]);
        assert_eq!(field.value(), Some(""));
        assert_eq!(
            field.to_xml().unwrap(),
            "<DynamicField><Name>Unset</Name><Value></Value></DynamicField>"
        );
    }

    #[test]
    fn test_multiselect_keeps_empty_positions() {
        let field = DynamicField::from_xml(
            "<DynamicField><Name>Tags</Name><Value>a</Value><Value></Value><Value>c</Value></DynamicField>",
        )
        .unwrap();
        assert_eq!(field.values, vec!["a", "", "c"]);
    }

    #[test]
    fn test_missing_name_is_malformed() {
        let err = DynamicField::from_xml("<DynamicField><Value>x</Value></DynamicField>").unwrap_err();
        assert!(matches!(err, OtrsError::MalformedResponse(_)));
    }

    #[test]
    fn test_to_xml() {
        let field = DynamicField::multi("Tags", ["a", "b"]);
        assert_eq!(
            field.to_xml().unwrap(),
            "<DynamicField><Name>Tags</Name><Value>a</Value><Value>b</Value></DynamicField>"
        );
    }
}
