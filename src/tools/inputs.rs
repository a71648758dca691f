//! Tool input parameter structs for MCP tools.
//!
//! This module defines the input types for each MCP tool, with
//! JSON Schema derivation for MCP tool discovery.
//!
//! # Input Sanitization
//!
//! All input structs implement `sanitize()` which trims whitespace
//! from string fields. This should be called before processing input.

use rmcp::schemars::{self, JsonSchema};
use serde::Deserialize;

use crate::connector::{TicketChanges, TicketSearch, TicketSelector};
use crate::models::{Article, Ticket};

/// Helper function to trim an optional string.
fn trim_option(s: &Option<String>) -> Option<String> {
    s.as_ref().map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Input parameters for the get_ticket tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetTicketInput {
    /// The numeric ticket ID (not the ticket number).
    pub ticket_id: i64,

    /// Include all articles (messages) of the ticket.
    #[serde(default)]
    pub include_articles: Option<bool>,

    /// Include dynamic field values.
    #[serde(default)]
    pub include_dynamic_fields: Option<bool>,
}

/// Input parameters for the search_tickets tool.
///
/// All fields are optional - use them to filter the results.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SearchTicketsInput {
    /// Title match; `%` is a wildcard (e.g., "%printer%").
    #[serde(default)]
    pub title: Option<String>,

    /// Queue name (e.g., "Support").
    #[serde(default)]
    pub queue: Option<String>,

    /// State name (e.g., "new", "open", "closed successful").
    #[serde(default)]
    pub state: Option<String>,

    /// State category: "new", "open", "closed", "pending reminder", ...
    #[serde(default)]
    pub state_type: Option<String>,

    /// Priority name (e.g., "3 normal").
    #[serde(default)]
    pub priority: Option<String>,

    /// Customer ID.
    #[serde(default)]
    pub customer_id: Option<String>,

    /// Customer user login.
    #[serde(default)]
    pub customer_user_login: Option<String>,

    /// Maximum number of ticket IDs to return (default: 50, max: 500).
    #[serde(default)]
    pub limit: Option<u32>,
}

impl SearchTicketsInput {
    /// Sanitizes input by trimming whitespace from all string fields.
    #[must_use]
    pub fn sanitize(self) -> Self {
        Self {
            title: trim_option(&self.title),
            queue: trim_option(&self.queue),
            state: trim_option(&self.state),
            state_type: trim_option(&self.state_type),
            priority: trim_option(&self.priority),
            customer_id: trim_option(&self.customer_id),
            customer_user_login: trim_option(&self.customer_user_login),
            limit: self.limit,
        }
    }

    /// Builds the connector search from the given filters.
    pub fn to_search(&self) -> TicketSearch {
        let mut search = TicketSearch::new();
        if let Some(title) = &self.title {
            search = search.with_title(title.as_str());
        }
        if let Some(queue) = &self.queue {
            search = search.with_queue(queue.as_str());
        }
        if let Some(state) = &self.state {
            search = search.with_state(state.as_str());
        }
        if let Some(state_type) = &self.state_type {
            search = search.with_state_type(state_type.as_str());
        }
        if let Some(priority) = &self.priority {
            search = search.with_priority(priority.as_str());
        }
        if let Some(customer_id) = &self.customer_id {
            search = search.with_customer_id(customer_id.as_str());
        }
        if let Some(login) = &self.customer_user_login {
            search = search.with_customer_user_login(login.as_str());
        }
        search.with_limit(self.limit.unwrap_or(50).min(500))
    }
}

/// Input parameters for the create_ticket tool.
///
/// Title, queue, state, priority, customer user, subject and body are
/// required by OTRS to open a ticket.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CreateTicketInput {
    /// Ticket title.
    pub title: String,

    /// Queue name (e.g., "Support").
    pub queue: String,

    /// Initial state (e.g., "new").
    pub state: String,

    /// Priority name (e.g., "3 normal").
    pub priority: String,

    /// Customer user login or email address.
    pub customer_user: String,

    /// Ticket type name, if ticket types are enabled.
    #[serde(default)]
    pub ticket_type: Option<String>,

    /// Subject of the first article.
    pub subject: String,

    /// Body of the first article (plain text).
    pub body: String,
}

impl CreateTicketInput {
    /// Sanitizes input by trimming whitespace from all string fields.
    ///
    /// The article body is left untouched.
    #[must_use]
    pub fn sanitize(self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            queue: self.queue.trim().to_string(),
            state: self.state.trim().to_string(),
            priority: self.priority.trim().to_string(),
            customer_user: self.customer_user.trim().to_string(),
            ticket_type: trim_option(&self.ticket_type),
            subject: self.subject.trim().to_string(),
            body: self.body,
        }
    }

    /// Returns the name of the first empty required field, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        [
            ("title", &self.title),
            ("queue", &self.queue),
            ("state", &self.state),
            ("priority", &self.priority),
            ("customer_user", &self.customer_user),
            ("subject", &self.subject),
            ("body", &self.body),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
    }

    /// Builds the ticket and its first article.
    pub fn to_objects(&self) -> (Ticket, Article) {
        let mut ticket = Ticket::new()
            .with_title(self.title.as_str())
            .with_queue(self.queue.as_str())
            .with_state(self.state.as_str())
            .with_priority(self.priority.as_str())
            .with_customer_user(self.customer_user.as_str());
        if let Some(ticket_type) = &self.ticket_type {
            ticket = ticket.with_type(ticket_type.as_str());
        }
        let article = Article::new(self.subject.as_str(), self.body.as_str());
        (ticket, article)
    }
}

/// Input parameters for the update_ticket tool.
///
/// Exactly one of `ticket_id` and `ticket_number` identifies the ticket.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct UpdateTicketInput {
    /// The numeric ticket ID.
    #[serde(default)]
    pub ticket_id: Option<i64>,

    /// The ticket number.
    #[serde(default)]
    pub ticket_number: Option<String>,

    /// New title.
    #[serde(default)]
    pub title: Option<String>,

    /// New queue name.
    #[serde(default)]
    pub queue: Option<String>,

    /// New state name.
    #[serde(default)]
    pub state: Option<String>,

    /// New priority name.
    #[serde(default)]
    pub priority: Option<String>,

    /// New owner login.
    #[serde(default)]
    pub owner: Option<String>,

    /// Subject of an article to add.
    #[serde(default)]
    pub note_subject: Option<String>,

    /// Body of an article to add; required to add an article.
    #[serde(default)]
    pub note_body: Option<String>,
}

impl UpdateTicketInput {
    /// Sanitizes input by trimming whitespace from all string fields.
    ///
    /// The note body is only checked for emptiness.
    #[must_use]
    pub fn sanitize(self) -> Self {
        Self {
            ticket_id: self.ticket_id,
            ticket_number: trim_option(&self.ticket_number),
            title: trim_option(&self.title),
            queue: trim_option(&self.queue),
            state: trim_option(&self.state),
            priority: trim_option(&self.priority),
            owner: trim_option(&self.owner),
            note_subject: trim_option(&self.note_subject),
            note_body: self.note_body.filter(|b| !b.trim().is_empty()),
        }
    }

    /// Resolves which ticket to update.
    pub fn selector(&self) -> Result<TicketSelector, String> {
        match (self.ticket_id, &self.ticket_number) {
            (Some(id), None) => Ok(TicketSelector::Id(id)),
            (None, Some(number)) => Ok(TicketSelector::Number(number.clone())),
            (Some(_), Some(_)) => Err("Provide either ticket_id or ticket_number, not both.".to_string()),
            (None, None) => Err("Either ticket_id or ticket_number is required.".to_string()),
        }
    }

    /// Returns true if at least one field would be changed.
    pub fn has_updates(&self) -> bool {
        self.title.is_some()
            || self.queue.is_some()
            || self.state.is_some()
            || self.priority.is_some()
            || self.owner.is_some()
            || self.note_body.is_some()
    }

    /// Builds the change set.
    pub fn to_changes(&self) -> TicketChanges {
        let mut ticket = Ticket::new();
        ticket.title = self.title.clone();
        ticket.queue = self.queue.clone();
        ticket.state = self.state.clone();
        ticket.priority = self.priority.clone();
        ticket.owner = self.owner.clone();

        let mut changes = TicketChanges::new().with_ticket(ticket);
        if let Some(body) = &self.note_body {
            let subject = self.note_subject.as_deref().unwrap_or("Note");
            changes = changes.with_article(Article::new(subject, body.as_str()).with_article_type("note-internal"));
        }
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_ticket_input_minimal() {
        let input: GetTicketInput = serde_json::from_str(r#"{"ticket_id": 32}"#).unwrap();
        assert_eq!(input.ticket_id, 32);
        assert!(input.include_articles.is_none());
    }

    #[test]
    fn test_search_tickets_input_sanitize() {
        let json = r#"{"queue": "  Support ", "state_type": "   ", "limit": 10}"#;
        let input: SearchTicketsInput = serde_json::from_str(json).unwrap();
        let input = input.sanitize();
        assert_eq!(input.queue.as_deref(), Some("Support"));
        assert!(input.state_type.is_none());
        assert!(!input.to_search().is_empty());
    }

    #[test]
    fn test_create_ticket_input_missing_field() {
        let json = r#"{
            "title": "Problem test",
            "queue": "Support",
            "state": "new",
            "priority": "3 normal",
            "customer_user": "foo@example.com",
            "subject": "  ",
            "body": "bla"
        }"#;
        let input: CreateTicketInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.sanitize().missing_field(), Some("subject"));
    }

    #[test]
    fn test_create_ticket_input_to_objects() {
        let json = r#"{
            "title": "Problem test",
            "queue": "Support",
            "state": "new",
            "priority": "3 normal",
            "customer_user": "foo@example.com",
            "ticket_type": "Divers",
            "subject": "UnitTest",
            "body": "bla"
        }"#;
        let input: CreateTicketInput = serde_json::from_str(json).unwrap();
        assert!(input.missing_field().is_none());
        let (ticket, article) = input.to_objects();
        assert_eq!(ticket.type_name.as_deref(), Some("Divers"));
        assert_eq!(ticket.customer_user.as_deref(), Some("foo@example.com"));
        assert_eq!(article.subject.as_deref(), Some("UnitTest"));
    }

    #[test]
    fn test_update_ticket_input_selector() {
        let input: UpdateTicketInput = serde_json::from_str(r#"{"ticket_id": 32}"#).unwrap();
        assert_eq!(input.selector(), Ok(TicketSelector::Id(32)));

        let input: UpdateTicketInput =
            serde_json::from_str(r#"{"ticket_number": " 515422152827 "}"#).unwrap();
        assert_eq!(
            input.sanitize().selector(),
            Ok(TicketSelector::Number("515422152827".to_string()))
        );

        let input: UpdateTicketInput = serde_json::from_str("{}").unwrap();
        assert!(input.selector().is_err());

        let input: UpdateTicketInput =
            serde_json::from_str(r#"{"ticket_id": 1, "ticket_number": "2"}"#).unwrap();
        assert!(input.selector().is_err());
    }

    #[test]
    fn test_update_ticket_input_has_updates() {
        let input: UpdateTicketInput = serde_json::from_str(r#"{"ticket_id": 32}"#).unwrap();
        assert!(!input.has_updates());

        let input: UpdateTicketInput =
            serde_json::from_str(r#"{"ticket_id": 32, "title": "Foubar"}"#).unwrap();
        assert!(input.has_updates());
        assert!(!input.to_changes().is_empty());
    }

    #[test]
    fn test_update_ticket_input_note() {
        let input: UpdateTicketInput =
            serde_json::from_str(r#"{"ticket_id": 32, "note_body": "called the customer"}"#).unwrap();
        let changes = input.sanitize().to_changes();
        let article = changes.article.unwrap();
        assert_eq!(article.subject.as_deref(), Some("Note"));
        assert_eq!(article.article_type.as_deref(), Some("note-internal"));
    }
}
