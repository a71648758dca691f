//! Minimal XML element tree over `quick-xml`.
//!
//! SOAP responses are small, so they are read fully into an [`Element`]
//! tree and then walked by name. Namespace prefixes are dropped on parse:
//! `<soapenv:Body>` becomes an element named `Body`. Names are written
//! back exactly as given, so request envelopes keep their prefixes.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::OtrsError;

/// An XML element with its text content and child elements.
///
/// Mixed content is not modelled: whitespace between child elements is
/// discarded and any other text is concatenated into `text`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Element name (local name when parsed).
    pub name: String,

    /// Attributes in document order.
    pub attributes: Vec<(String, String)>,

    /// Unescaped text content, `None` for empty elements.
    pub text: Option<String>,

    /// Child elements in document order.
    pub children: Vec<Element>,
}

impl Element {
    /// Creates an empty element.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Creates a leaf element holding `text`.
    pub fn with_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// Adds an attribute.
    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    /// Appends a child element.
    pub fn push(&mut self, child: Element) {
        self.children.push(child);
    }

    /// Returns the first child with the given name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Returns all children with the given name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Returns the text of the first child with the given name.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).and_then(|c| c.text.as_deref())
    }

    /// Parses a document and returns its root element.
    pub fn parse(xml: &str) -> Result<Element, OtrsError> {
        let mut reader = Reader::from_str(xml);
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event()? {
                Event::Start(start) => {
                    stack.push(Self::open(&start)?);
                }
                Event::Empty(start) => {
                    let element = Self::open(&start)?;
                    Self::attach(&mut stack, &mut root, element);
                }
                Event::End(_) => {
                    let mut element = stack
                        .pop()
                        .ok_or_else(|| OtrsError::malformed("unbalanced closing tag"))?;
                    if !element.children.is_empty()
                        && element.text.as_deref().is_some_and(|t| t.trim().is_empty())
                    {
                        element.text = None;
                    }
                    Self::attach(&mut stack, &mut root, element);
                }
                Event::Text(text) => {
                    if let Some(current) = stack.last_mut() {
                        let text = text.unescape()?;
                        current.text.get_or_insert_with(String::new).push_str(&text);
                    }
                }
                Event::CData(cdata) => {
                    if let Some(current) = stack.last_mut() {
                        let text = String::from_utf8(cdata.into_inner().into_owned())
                            .map_err(|_| OtrsError::malformed("CDATA is not valid UTF-8"))?;
                        current.text.get_or_insert_with(String::new).push_str(&text);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(OtrsError::malformed("document ended inside an element"));
        }
        root.ok_or_else(|| OtrsError::malformed("document has no root element"))
    }

    fn open(start: &BytesStart<'_>) -> Result<Element, OtrsError> {
        let name = utf8(start.local_name().as_ref())?;
        let mut element = Element::new(name);
        for attr in start.attributes() {
            let attr = attr.map_err(|e| OtrsError::malformed(e.to_string()))?;
            let key = utf8(attr.key.as_ref())?;
            let value = attr.unescape_value()?.into_owned();
            element.attributes.push((key, value));
        }
        Ok(element)
    }

    fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
        match stack.last_mut() {
            Some(parent) => parent.children.push(element),
            None => {
                if root.is_none() {
                    *root = Some(element);
                }
            }
        }
    }

    /// Serializes the element (without XML declaration).
    pub fn write_to_string(&self) -> Result<String, OtrsError> {
        let mut writer = Writer::new(Vec::new());
        self.write(&mut writer)?;
        String::from_utf8(writer.into_inner())
            .map_err(|_| OtrsError::malformed("serialized XML is not valid UTF-8"))
    }

    fn write(&self, writer: &mut Writer<Vec<u8>>) -> Result<(), OtrsError> {
        let start = BytesStart::new(self.name.as_str()).with_attributes(
            self.attributes
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str())),
        );

        if self.text.is_none() && self.children.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;
        if let Some(text) = &self.text {
            writer.write_event(Event::Text(BytesText::new(text)))?;
        }
        for child in &self.children {
            child.write(writer)?;
        }
        writer.write_event(Event::End(BytesEnd::new(self.name.as_str())))?;
        Ok(())
    }
}

fn utf8(bytes: &[u8]) -> Result<String, OtrsError> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|_| OtrsError::malformed("element name is not valid UTF-8"))
}
