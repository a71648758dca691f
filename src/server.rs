//! MCP server implementation for OTRS.
//!
//! This module defines the `OtrsServer` struct that implements the MCP
//! `ServerHandler` trait, exposing GenericTicketConnector operations as tools.

use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ServerHandler,
};

use crate::connector::{GenericTicketConnector, TicketGetOptions, TicketRef};
use crate::error::OtrsError;
use crate::models::Ticket;
use crate::tools::{CreateTicketInput, GetTicketInput, SearchTicketsInput, UpdateTicketInput};

/// The OTRS MCP server.
#[derive(Clone)]
pub struct OtrsServer {
    /// Connector for webservice operations.
    connector: GenericTicketConnector,
    /// Tool router for MCP tool dispatch.
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl OtrsServer {
    /// Creates a new server instance around an authenticated connector.
    pub fn new(connector: GenericTicketConnector) -> Self {
        Self {
            connector,
            tool_router: Self::tool_router(),
        }
    }

    /// Returns "pong"; used to check the server is up.
    #[tool(description = "Test connectivity to the OTRS MCP server. Returns 'pong' if the server is running correctly.")]
    fn ping(&self) -> String {
        tracing::debug!("ping tool called");
        "pong".to_string()
    }

    #[tool(description = "Get a single OTRS ticket by its numeric ticket ID. Optionally include articles (messages) and dynamic fields. Returns the ticket as JSON.")]
    async fn get_ticket(
        &self,
        Parameters(input): Parameters<GetTicketInput>,
    ) -> Result<String, String> {
        tracing::debug!(ticket_id = input.ticket_id, "get_ticket tool called");

        let mut options = TicketGetOptions::default();
        if input.include_articles.unwrap_or(false) {
            options = options.with_articles();
        }
        if input.include_dynamic_fields.unwrap_or(false) {
            options = options.with_dynamic_fields();
        }

        let ticket = self
            .connector
            .ticket_get(input.ticket_id, options)
            .await
            .map_err(|e| self.tool_error(&e, &format!("Failed to get ticket {}", input.ticket_id)))?;

        format_ticket(ticket).map_err(|e| self.tool_error(&e, "Failed to render ticket"))
    }

    #[tool(description = "Search OTRS tickets by title, queue, state, state type, priority or customer. Returns matching ticket IDs.")]
    async fn search_tickets(
        &self,
        Parameters(input): Parameters<SearchTicketsInput>,
    ) -> Result<String, String> {
        let input = input.sanitize();
        tracing::debug!(?input, "search_tickets tool called");

        let ids = self
            .connector
            .ticket_search(&input.to_search())
            .await
            .map_err(|e| self.tool_error(&e, "Failed to search tickets"))?;

        Ok(format_ticket_ids(&ids))
    }

    #[tool(description = "Create a new OTRS ticket with a first plain-text article. Title, queue, state, priority, customer_user, subject and body are required.")]
    async fn create_ticket(
        &self,
        Parameters(input): Parameters<CreateTicketInput>,
    ) -> Result<String, String> {
        let input = input.sanitize();
        tracing::debug!(title = %input.title, queue = %input.queue, "create_ticket tool called");

        if let Some(field) = input.missing_field() {
            return Err(format!("{} is required and cannot be empty.", field));
        }

        let (ticket, article) = input.to_objects();
        let created = self
            .connector
            .ticket_create(&ticket, &article, &[], &[])
            .await
            .map_err(|e| self.tool_error(&e, "Failed to create ticket"))?;

        Ok(format_ticket_ref("Created", &created))
    }

    #[tool(description = "Update an OTRS ticket's title, queue, state, priority or owner, and/or add an internal note. Identify the ticket by ticket_id or ticket_number.")]
    async fn update_ticket(
        &self,
        Parameters(input): Parameters<UpdateTicketInput>,
    ) -> Result<String, String> {
        let input = input.sanitize();
        tracing::debug!(
            ticket_id = ?input.ticket_id,
            ticket_number = ?input.ticket_number,
            "update_ticket tool called"
        );

        let selector = input.selector()?;
        if !input.has_updates() {
            return Err(
                "At least one field must be provided for update (title, queue, state, priority, owner, or note_body).".to_string()
            );
        }

        let updated = self
            .connector
            .ticket_update(selector.clone(), &input.to_changes())
            .await
            .map_err(|e| self.tool_error(&e, &format!("Failed to update ticket {}", selector)))?;

        Ok(format_ticket_ref("Updated", &updated))
    }

    /// Logs a sanitized error and turns it into a tool error message.
    fn tool_error(&self, error: &OtrsError, context: &str) -> String {
        let sanitized = error.sanitized_display(self.connector.secret_for_sanitization());
        tracing::error!(error = %sanitized, "{}", context);
        format!("{}: {}", context, sanitized)
    }
}

#[tool_handler]
impl ServerHandler for OtrsServer {
    /// Returns server information for the MCP initialize handshake.
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "This server provides access to OTRS tickets through the GenericTicketConnector. \
                 Use search_tickets to find ticket IDs, get_ticket for details, \
                 create_ticket to open a ticket and update_ticket to change it or add a note. \
                 Start with 'ping' to verify connectivity."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

// ============================================================================
// Response formatting helpers
// ============================================================================

/// Maximum length for article bodies before truncation.
const MAX_BODY_LENGTH: usize = 2000;

/// Truncates a string to at most `max_chars` characters.
///
/// If truncated, appends "... [truncated]" to indicate the content was cut.
fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(15);
    let mut end = text
        .char_indices()
        .nth(keep)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    // Prefer a word boundary.
    if let Some(space) = text[..end].rfind(char::is_whitespace) {
        end = space;
    }
    format!("{}... [truncated]", &text[..end])
}

/// Renders a ticket as pretty JSON with long article bodies truncated.
fn format_ticket(mut ticket: Ticket) -> Result<String, OtrsError> {
    for article in &mut ticket.articles {
        if let Some(body) = &article.body {
            article.body = Some(truncate_text(body, MAX_BODY_LENGTH));
        }
        for attachment in &mut article.attachments {
            attachment.content = None;
        }
    }
    Ok(serde_json::to_string_pretty(&ticket)?)
}

fn format_ticket_ids(ids: &[i64]) -> String {
    if ids.is_empty() {
        return "No tickets found matching the criteria.".to_string();
    }
    let list = ids.iter().map(i64::to_string).collect::<Vec<_>>().join(", ");
    format!("Found {} ticket(s): {}", ids.len(), list)
}

fn format_ticket_ref(verb: &str, ticket: &TicketRef) -> String {
    let mut output = format!(
        "{} ticket #{} (ID {})",
        verb, ticket.ticket_number, ticket.ticket_id
    );
    if let Some(article_id) = ticket.article_id {
        output.push_str(&format!(", article ID {}", article_id));
    }
    output
}
