//! Attachment model.
//!
//! Attachments travel base64-encoded in `Content`. They are sent at the
//! top level of `TicketCreate`/`TicketUpdate` and come back nested in
//! `Article` elements when `TicketGet` is asked for them.

use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::ser::{Serialize, SerializeMap, Serializer};

use super::{expect_name, ExtraFields, FieldValue, XmlObject};
use crate::error::OtrsError;
use crate::xml::Element;

/// Content type used when none is given.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A file attached to an article.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attachment {
    /// Base64-encoded file content.
    pub content: Option<String>,
    /// MIME type, optionally with a charset parameter.
    pub content_type: Option<String>,
    /// File name.
    pub filename: Option<String>,
    /// Human-readable size, e.g. `"3 KBytes"`.
    pub filesize: Option<String>,
    /// Size in bytes.
    pub filesize_raw: Option<i64>,
    /// Content-ID for inline parts.
    pub content_id: Option<String>,
    /// Alternative content marker.
    pub content_alternative: Option<String>,
    /// `inline` or `attachment`.
    pub disposition: Option<String>,
    /// Unrecognised scalar elements.
    pub extra: ExtraFields,
}

named_fields!(Attachment {
    content: text = "Content",
    content_type: text = "ContentType",
    filename: text = "Filename",
    filesize: text = "Filesize",
    filesize_raw: int = "FilesizeRaw",
    content_id: text = "ContentID",
    content_alternative: text = "ContentAlternative",
    disposition: text = "Disposition",
});

impl Attachment {
    /// Builds an attachment from raw bytes.
    pub fn from_bytes(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        bytes: &[u8],
    ) -> Self {
        Self {
            content: Some(STANDARD.encode(bytes)),
            content_type: Some(content_type.into()),
            filename: Some(filename.into()),
            ..Default::default()
        }
    }

    /// Reads a file into an attachment.
    ///
    /// The filename is the final path component; the content type falls
    /// back to [`DEFAULT_CONTENT_TYPE`].
    ///
    /// # Errors
    ///
    /// Returns `OtrsError::Io` if the file cannot be read and
    /// `OtrsError::Validation` if the path has no file name.
    pub fn from_file(path: impl AsRef<Path>, content_type: Option<&str>) -> Result<Self, OtrsError> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| OtrsError::validation(format!("{} has no file name", path.display())))?
            .to_string();
        let bytes = std::fs::read(path)?;

        tracing::debug!(filename = %filename, size = bytes.len(), "Read attachment");

        Ok(Self::from_bytes(
            filename,
            content_type.unwrap_or(DEFAULT_CONTENT_TYPE),
            &bytes,
        ))
    }

    /// Decodes the base64 content. Missing content decodes to nothing.
    pub fn decoded_content(&self) -> Result<Vec<u8>, OtrsError> {
        match &self.content {
            Some(content) => {
                // OTRS wraps long base64 payloads across lines.
                let compact: String = content.split_whitespace().collect();
                Ok(STANDARD.decode(compact)?)
            }
            None => Ok(Vec::new()),
        }
    }

    /// Sets a field by XML name with coercion.
    pub fn set(&mut self, name: &str, raw: &str) -> Result<(), OtrsError> {
        if !self.set_named(name, raw)? {
            self.extra.set(name, raw);
        }
        Ok(())
    }

    /// Returns a field by XML name.
    pub fn get(&self, name: &str) -> Option<FieldValue> {
        self.get_named(name).or_else(|| self.extra.get(name))
    }
}

impl XmlObject for Attachment {
    const XML_NAME: &'static str = "Attachment";

    fn from_element(element: &Element) -> Result<Self, OtrsError> {
        expect_name(element, Self::XML_NAME)?;
        let mut attachment = Attachment::default();
        for child in &element.children {
            if let Some(text) = &child.text {
                attachment.set_unmarshalled(&child.name, text);
            }
        }
        Ok(attachment)
    }

    fn to_element(&self) -> Element {
        let mut element = Element::new(Self::XML_NAME);
        self.push_named(&mut element);
        self.extra.write_into(&mut element);
        element
    }
}

impl Serialize for Attachment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        self.serialize_named(&mut map)?;
        for (name, value) in self.extra.iter() {
            map.serialize_entry(name, &value)?;
        }
        map.end()
    }
}
