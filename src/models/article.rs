//! Article model.
//!
//! An article is a single message within a ticket: the body of the
//! initial request, an agent reply, an internal note.

use serde::ser::{Serialize, SerializeMap, Serializer};

use super::{expect_name, Attachment, DynamicField, ExtraFields, FieldValue, XmlObject};
use crate::error::OtrsError;
use crate::xml::Element;

/// A message within a ticket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Article {
    /// Unique article ID.
    pub article_id: Option<i64>,
    /// ID of the owning ticket.
    pub ticket_id: Option<i64>,
    /// Article type ID (OTRS 5 and earlier).
    pub article_type_id: Option<i64>,
    /// Article type, e.g. `note-internal` (OTRS 5 and earlier).
    pub article_type: Option<String>,
    /// Sender type ID.
    pub sender_type_id: Option<i64>,
    /// Sender type: `agent`, `system` or `customer`.
    pub sender_type: Option<String>,
    /// Communication channel, e.g. `Email` (OTRS 6 and later).
    pub communication_channel: Option<String>,
    /// 1 when customers can see the article (OTRS 6 and later).
    pub is_visible_for_customer: Option<i64>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub cc: Option<String>,
    pub reply_to: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
    /// Full content type, e.g. `text/plain; charset=utf8`.
    pub content_type: Option<String>,
    pub charset: Option<String>,
    pub mime_type: Option<String>,
    /// History entry type recorded on create, e.g. `NewTicket`.
    pub history_type: Option<String>,
    pub history_comment: Option<String>,
    pub auto_response_type: Option<String>,
    /// Accounted time. Kept as text because OTRS allows decimals.
    pub time_unit: Option<String>,
    /// 1 to suppress agent notifications.
    pub no_agent_notify: Option<i64>,
    pub incoming_time: Option<i64>,
    pub created: Option<String>,
    pub change_time: Option<String>,
    /// Attachments, present when requested in `TicketGet`.
    pub attachments: Vec<Attachment>,
    /// Article dynamic fields.
    pub dynamic_fields: Vec<DynamicField>,
    /// Unrecognised scalar elements.
    pub extra: ExtraFields,
    /// Unrecognised elements with children, kept verbatim.
    pub nested: Vec<Element>,
}

named_fields!(Article {
    article_id: int = "ArticleID",
    ticket_id: int = "TicketID",
    article_type_id: int = "ArticleTypeID",
    article_type: text = "ArticleType",
    sender_type_id: int = "SenderTypeID",
    sender_type: text = "SenderType",
    communication_channel: text = "CommunicationChannel",
    is_visible_for_customer: int = "IsVisibleForCustomer",
    from: text = "From",
    to: text = "To",
    cc: text = "Cc",
    reply_to: text = "ReplyTo",
    subject: text = "Subject",
    body: text = "Body",
    content_type: text = "ContentType",
    charset: text = "Charset",
    mime_type: text = "MimeType",
    history_type: text = "HistoryType",
    history_comment: text = "HistoryComment",
    auto_response_type: text = "AutoResponseType",
    time_unit: text = "TimeUnit",
    no_agent_notify: int = "NoAgentNotify",
    incoming_time: int = "IncomingTime",
    created: text = "Created",
    change_time: text = "ChangeTime",
});

impl Article {
    /// Creates a plain-text article with the given subject and body.
    ///
    /// Charset and MIME type default to `utf8` and `text/plain`, which is
    /// what `TicketCreate` needs at minimum besides subject and body.
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: Some(subject.into()),
            body: Some(body.into()),
            charset: Some("utf8".to_string()),
            mime_type: Some("text/plain".to_string()),
            ..Default::default()
        }
    }

    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    pub fn with_article_type(mut self, article_type: impl Into<String>) -> Self {
        self.article_type = Some(article_type.into());
        self
    }

    pub fn with_sender_type(mut self, sender_type: impl Into<String>) -> Self {
        self.sender_type = Some(sender_type.into());
        self
    }

    pub fn with_time_unit(mut self, time_unit: impl Into<String>) -> Self {
        self.time_unit = Some(time_unit.into());
        self
    }

    /// Sets a field by XML name with coercion.
    ///
    /// Numeric schema fields reject non-numeric text; unknown names are
    /// kept as extra fields.
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

impl XmlObject for Article {
    const XML_NAME: &'static str = "Article";

    fn from_element(element: &Element) -> Result<Self, OtrsError> {
        expect_name(element, Self::XML_NAME)?;
        let mut article = Article::default();
        for child in &element.children {
            match child.name.as_str() {
                "Attachment" => article.attachments.push(Attachment::from_element(child)?),
                "DynamicField" => article.dynamic_fields.push(DynamicField::from_element(child)?),
                _ if !child.children.is_empty() => article.nested.push(child.clone()),
                _ => {
                    if let Some(text) = &child.text {
                        article.set_unmarshalled(&child.name, text);
                    }
                }
            }
        }
        Ok(article)
    }

    fn to_element(&self) -> Element {
        let mut element = Element::new(Self::XML_NAME);
        self.push_named(&mut element);
        self.extra.write_into(&mut element);
        for nested in &self.nested {
            element.push(nested.clone());
        }
        for field in &self.dynamic_fields {
            element.push(field.to_element());
        }
        for attachment in &self.attachments {
            element.push(attachment.to_element());
        }
        element
    }
}

impl Serialize for Article {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        self.serialize_named(&mut map)?;
        for (name, value) in self.extra.iter() {
            map.serialize_entry(name, &value)?;
        }
        if !self.dynamic_fields.is_empty() {
            map.serialize_entry("DynamicField", &self.dynamic_fields)?;
        }
        if !self.attachments.is_empty() {
            map.serialize_entry("Attachment", &self.attachments)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE_ARTICLE: &str = r#"<Article>
        <ArticleID>118</ArticleID>
        <TicketID>32</TicketID>
        <ArticleType>email-external</ArticleType>
        <SenderType>customer</SenderType>
        <From>foo@bar.tld</From>
        <Subject>Printer on fire</Subject>
        <Body>It is on fire.</Body>
        <Charset>utf-8</Charset>
        <MimeType>text/plain</MimeType>
        <IncomingTime>1400234702</IncomingTime>
        <Cc/>
        <Attachment>
            <Content>aGVsbG8=</Content>
            <ContentType>text/plain</ContentType>
            <Filename>hello.txt</Filename>
        </Attachment>
    </Article>"#;

    #[test]
    fn test_article_from_xml() {
        let article = Article::from_xml(SAMPLE_ARTICLE).unwrap();
        assert_eq!(article.article_id, Some(118));
        assert_eq!(article.ticket_id, Some(32));
        assert_eq!(article.incoming_time, Some(1400234702));
        assert_eq!(article.subject.as_deref(), Some("Printer on fire"));
        assert_eq!(article.cc, None);
        assert_eq!(article.attachments.len(), 1);
        assert_eq!(article.attachments[0].decoded_content().unwrap(), b"hello");
    }

    #[test]
    fn test_article_new_defaults() {
        let article = Article::new("UnitTest", "bla");
        let names: Vec<_> = article
            .to_element()
            .children
            .iter()
            .map(|c| c.name.clone())
            .collect();
        assert_eq!(names, vec!["Subject", "Body", "Charset", "MimeType"]);
    }

    #[test]
    fn test_article_set_coerces_numeric_fields() {
        let mut article = Article::default();
        article.set("NoAgentNotify", "1").unwrap();
        article.set("TimeUnit", "1.5").unwrap();
        assert_eq!(article.no_agent_notify, Some(1));
        assert_eq!(article.get("TimeUnit"), Some(FieldValue::from("1.5")));
        assert!(article.set("ArticleID", "one").is_err());
    }

    #[test]
    fn test_article_from_xml_is_lenient_with_unexpected_content() {
        let xml = "<Article><ArticleID>118</ArticleID><IncomingTime>soon</IncomingTime>\
                   <Flags><Seen>1</Seen></Flags></Article>";
        let article = Article::from_xml(xml).unwrap();
        assert_eq!(article.article_id, Some(118));
        assert_eq!(article.incoming_time, None);
        assert_eq!(article.get("IncomingTime"), Some(FieldValue::from("soon")));
        assert_eq!(article.nested.len(), 1);

        let element = article.to_element();
        assert_eq!(element.child_text("IncomingTime"), Some("soon"));
        assert_eq!(element.child("Flags").and_then(|f| f.child_text("Seen")), Some("1"));
    }

    #[test]
    fn test_article_round_trip() {
        let article = Article::from_xml(SAMPLE_ARTICLE).unwrap();
        let reparsed = Article::from_xml(&article.to_xml().unwrap()).unwrap();
        assert_eq!(reparsed, article);
    }

    #[test]
    fn test_article_json_uses_xml_names() {
        let article = Article::new("Hi", "There");
        let json = serde_json::to_value(&article).unwrap();
        assert_eq!(json["Subject"], "Hi");
        assert_eq!(json["MimeType"], "text/plain");
        assert!(json.get("ArticleID").is_none());
    }
}
