//! SOAP 1.1 envelope construction and response unpacking.
//!
//! A request is `Envelope/Body/tic:<Operation>` with the arguments as
//! child elements. A response is `Envelope/Body/<Operation>Response`,
//! a `Fault`, or a response whose first child is an OTRS `Error`.

use crate::error::OtrsError;
use crate::models::XmlObject;
use crate::xml::Element;

/// SOAP 1.1 envelope namespace.
pub const SOAP_ENV_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// Namespace of the GenericTicketConnector operations.
pub const TICKET_CONNECTOR_NS: &str = "http://www.otrs.org/TicketConnector/";

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// A GenericTicketConnector operation call under construction.
///
/// Arguments are written in the order they are added.
#[derive(Debug, Clone)]
pub struct SoapRequest {
    operation: String,
    payload: Vec<Element>,
}

impl SoapRequest {
    /// Starts a call to `operation`, e.g. `"TicketGet"`.
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            payload: Vec::new(),
        }
    }

    /// Returns the operation name.
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Adds a scalar argument `<name>value</name>`.
    pub fn arg(mut self, name: &str, value: impl ToString) -> Self {
        self.payload.push(Element::with_text(name, value.to_string()));
        self
    }

    /// Adds a scalar argument when a value is present.
    pub fn arg_opt<V: ToString>(self, name: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.arg(name, value),
            None => self,
        }
    }

    /// Adds `<name>1</name>` when `enabled`; OTRS treats absence as false.
    pub fn flag(self, name: &str, enabled: bool) -> Self {
        if enabled {
            self.arg(name, 1)
        } else {
            self
        }
    }

    /// Adds an object as its own element (`<Ticket>`, `<Article>`, ...).
    pub fn object<T: XmlObject>(mut self, object: &T) -> Self {
        self.payload.push(object.to_element());
        self
    }

    /// Adds several objects of the same kind.
    pub fn objects<'a, T, I>(self, objects: I) -> Self
    where
        T: XmlObject + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        objects.into_iter().fold(self, |req, object| req.object(object))
    }

    /// Adds a prebuilt element.
    pub fn element(mut self, element: Element) -> Self {
        self.payload.push(element);
        self
    }

    /// Returns the payload elements added so far.
    pub fn payload(&self) -> &[Element] {
        &self.payload
    }

    /// Builds the envelope element.
    pub fn to_envelope(&self) -> Element {
        let mut call = Element::new(format!("tic:{}", self.operation));
        call.children = self.payload.clone();

        let mut body = Element::new("soapenv:Body");
        body.push(call);

        let mut envelope = Element::new("soapenv:Envelope")
            .attr("xmlns:soapenv", SOAP_ENV_NS)
            .attr("xmlns:tic", TICKET_CONNECTOR_NS);
        envelope.push(Element::new("soapenv:Header"));
        envelope.push(body);
        envelope
    }

    /// Serializes the envelope with an XML declaration.
    pub fn to_xml(&self) -> Result<String, OtrsError> {
        Ok(format!(
            "{}{}",
            XML_DECLARATION,
            self.to_envelope().write_to_string()?
        ))
    }
}

/// Unpacks a response envelope and returns the `<Operation>Response` element.
///
/// # Errors
///
/// - `OtrsError::SoapFault` if the body holds a `Fault`
/// - `OtrsError::Remote` if the response's first child is an `Error`
/// - `OtrsError::MalformedResponse` if the envelope is not shaped as expected
pub fn parse_response(operation: &str, xml: &str) -> Result<Element, OtrsError> {
    let body = envelope_body(Element::parse(xml)?)?;

    if let Some(fault) = body.child("Fault") {
        return Err(fault_error(fault));
    }

    let expected = format!("{}Response", operation);
    let response = body
        .children
        .into_iter()
        .next()
        .ok_or_else(|| OtrsError::malformed("empty SOAP body"))?;
    if response.name != expected {
        return Err(OtrsError::malformed(format!(
            "expected <{}>, got <{}>",
            expected, response.name
        )));
    }

    if let Some(first) = response.children.first() {
        if first.name == "Error" {
            return Err(OtrsError::Remote {
                code: first.child_text("ErrorCode").unwrap_or_default().to_string(),
                message: first
                    .child_text("ErrorMessage")
                    .unwrap_or_default()
                    .to_string(),
            });
        }
    }

    Ok(response)
}

/// Extracts a SOAP fault from a document, if it is one.
///
/// Used on non-2xx HTTP responses, where SOAP servers report faults.
pub fn parse_fault(xml: &str) -> Option<OtrsError> {
    let body = envelope_body(Element::parse(xml).ok()?).ok()?;
    body.child("Fault").map(fault_error)
}

fn envelope_body(mut envelope: Element) -> Result<Element, OtrsError> {
    if envelope.name != "Envelope" {
        return Err(OtrsError::malformed(format!(
            "expected SOAP Envelope, got <{}>",
            envelope.name
        )));
    }
    let index = envelope
        .children
        .iter()
        .position(|c| c.name == "Body")
        .ok_or_else(|| OtrsError::malformed("SOAP Envelope without Body"))?;
    Ok(envelope.children.swap_remove(index))
}

fn fault_error(fault: &Element) -> OtrsError {
    OtrsError::SoapFault {
        code: fault.child_text("faultcode").unwrap_or_default().to_string(),
        message: fault.child_text("faultstring").unwrap_or_default().to_string(),
    }
}
