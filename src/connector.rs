//! HTTP client for the OTRS GenericTicketConnector web service.
//!
//! This module provides [`GenericTicketConnector`], which wraps each
//! operation in a SOAP envelope, posts it to the webservice endpoint and
//! unmarshals the response into typed objects.
//!
//! # Authentication
//!
//! Every operation except `SessionCreate` is authenticated in its body:
//! with `SessionID` once [`GenericTicketConnector::session_create`] has
//! succeeded, otherwise with the login and password given to
//! [`GenericTicketConnector::register_credentials`].
//!
//! When OTRS rejects the session (`<Operation>.AuthFail`, typically after
//! `SessionMaxIdleTime`) and credentials are registered, the session is
//! dropped and the call is sent once more with the credentials.
//!
//! # Security
//!
//! The password is never logged. Error bodies are sanitized before they
//! are returned.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use url::Url;

use crate::config::{Config, DEFAULT_TIMEOUT_SECS, DEFAULT_WEBSERVICE};
use crate::error::OtrsError;
use crate::models::value::parse_int;
use crate::models::{Article, Attachment, DynamicField, Ticket, XmlObject};
use crate::soap::{self, SoapRequest};
use crate::xml::Element;

/// Path of the generic interface below the server URL.
const GENERIC_INTERFACE_PATH: &str = "/otrs/nph-genericinterface.pl/Webservice";

/// Content type for SOAP 1.1 requests.
const SOAP_CONTENT_TYPE: &str = "text/xml; charset=utf-8";

/// Maximum length for HTTP error response bodies.
const MAX_ERROR_BODY_LEN: usize = 500;

#[derive(Clone)]
struct Credentials {
    /// `UserLogin` for agents, `CustomerUserLogin` for customers.
    login_field: &'static str,
    login: String,
    /// SECURITY: Never log this value!
    password: String,
}

/// Client for one GenericTicketConnector webservice.
///
/// Clones share the session.
///
/// # Example
///
/// ```ignore
/// let mut connector = GenericTicketConnector::new("https://otrs.example.com", "GenericTicketConnector")?;
/// connector.session_create("agent", "secret").await?;
///
/// let ticket = connector.ticket_get(32, TicketGetOptions::default()).await?;
/// println!("{:?}", ticket.title);
/// ```
#[derive(Clone)]
pub struct GenericTicketConnector {
    /// The underlying HTTP client (cloning is cheap).
    http: Client,

    /// Full webservice URL.
    endpoint: String,

    timeout: Duration,

    credentials: Option<Credentials>,

    session_id: Arc<Mutex<Option<String>>>,
}

impl fmt::Debug for GenericTicketConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenericTicketConnector")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .field("login", &self.credentials.as_ref().map(|c| c.login.as_str()))
            .field("has_session", &self.lock_session().is_some())
            .finish()
    }
}

impl GenericTicketConnector {
    /// Creates an unauthenticated connector for `server` and `webservice`.
    ///
    /// # Errors
    ///
    /// Returns `OtrsError::Config` if the resulting endpoint is not a valid
    /// URL and `OtrsError::HttpClient` if the HTTP client fails to build.
    pub fn new(server: &str, webservice: &str) -> Result<Self, OtrsError> {
        Self::with_timeout(server, webservice, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Like [`new`](Self::new) with a custom request timeout.
    pub fn with_timeout(server: &str, webservice: &str, timeout: Duration) -> Result<Self, OtrsError> {
        let endpoint = Self::endpoint_url(server, webservice)?;
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(OtrsError::HttpClient)?;

        Ok(Self {
            http,
            endpoint,
            timeout,
            credentials: None,
            session_id: Arc::new(Mutex::new(None)),
        })
    }

    /// Creates a connector from configuration, with its credentials registered.
    pub fn from_config(config: &Config) -> Result<Self, OtrsError> {
        let mut connector = Self::with_timeout(&config.server, &config.webservice, config.timeout)?;
        connector.register_credentials(&config.login, &config.password);
        Ok(connector)
    }

    /// Builds `{server}/otrs/nph-genericinterface.pl/Webservice/{webservice}`.
    fn endpoint_url(server: &str, webservice: &str) -> Result<String, OtrsError> {
        let webservice = if webservice.trim().is_empty() {
            DEFAULT_WEBSERVICE
        } else {
            webservice.trim()
        };
        let endpoint = format!(
            "{}{}/{}",
            server.trim().trim_end_matches('/'),
            GENERIC_INTERFACE_PATH,
            urlencoding::encode(webservice)
        );
        Url::parse(&endpoint)
            .map_err(|e| OtrsError::invalid_config(format!("invalid OTRS endpoint: {}", e)))?;
        Ok(endpoint)
    }

    /// Returns the webservice URL requests are posted to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns the current session ID, if a session was created.
    pub fn session_id(&self) -> Option<String> {
        self.lock_session().clone()
    }

    /// Uses an existing session ID for subsequent requests.
    pub fn set_session_id(&mut self, session_id: impl Into<String>) {
        *self.lock_session() = Some(session_id.into());
    }

    /// Drops the session; later requests fall back to credentials.
    pub fn clear_session(&mut self) {
        *self.lock_session() = None;
    }

    fn lock_session(&self) -> MutexGuard<'_, Option<String>> {
        self.session_id.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers agent credentials sent with every request that has no session.
    pub fn register_credentials(&mut self, login: &str, password: &str) {
        self.credentials = Some(Credentials {
            login_field: "UserLogin",
            login: login.to_string(),
            password: password.to_string(),
        });
    }

    /// Registers customer-user credentials instead of agent credentials.
    pub fn register_customer_credentials(&mut self, customer_login: &str, password: &str) {
        self.credentials = Some(Credentials {
            login_field: "CustomerUserLogin",
            login: customer_login.to_string(),
            password: password.to_string(),
        });
    }

    /// Returns the registered password for sanitization purposes.
    ///
    /// This should ONLY be used for sanitizing error messages, never for logging.
    pub(crate) fn secret_for_sanitization(&self) -> &str {
        self.credentials
            .as_ref()
            .map(|c| c.password.as_str())
            .unwrap_or_default()
    }

    /// Creates an agent session and uses it for subsequent requests.
    ///
    /// # Returns
    ///
    /// The session ID (32 characters on a stock OTRS).
    ///
    /// # Errors
    ///
    /// Returns `OtrsError::Remote` with code `SessionCreate.AuthFail` if
    /// the login is refused.
    pub async fn session_create(&mut self, user_login: &str, password: &str) -> Result<String, OtrsError> {
        self.create_session("UserLogin", user_login, password).await
    }

    /// Creates a customer-user session and uses it for subsequent requests.
    pub async fn customer_session_create(
        &mut self,
        customer_user_login: &str,
        password: &str,
    ) -> Result<String, OtrsError> {
        self.create_session("CustomerUserLogin", customer_user_login, password)
            .await
    }

    async fn create_session(
        &mut self,
        login_field: &str,
        login: &str,
        password: &str,
    ) -> Result<String, OtrsError> {
        let request = SoapRequest::new("SessionCreate")
            .arg(login_field, login)
            .arg("Password", password);

        let response = self.call(request, password).await?;
        let session_id = response
            .child_text("SessionID")
            .map(str::to_string)
            .ok_or_else(|| OtrsError::malformed("SessionCreateResponse without SessionID"))?;

        tracing::info!(login = %login, "Created OTRS session");
        *self.lock_session() = Some(session_id.clone());
        Ok(session_id)
    }

    /// Retrieves a single ticket.
    ///
    /// # Arguments
    ///
    /// * `ticket_id` - The ticket ID (not the ticket number)
    /// * `options` - Which related data to include
    pub async fn ticket_get(&self, ticket_id: i64, options: TicketGetOptions) -> Result<Ticket, OtrsError> {
        let mut tickets = self.ticket_get_many(&[ticket_id], options).await?;
        if tickets.is_empty() {
            return Err(OtrsError::malformed("TicketGetResponse without Ticket"));
        }
        Ok(tickets.swap_remove(0))
    }

    /// Retrieves several tickets in one call.
    pub async fn ticket_get_many(
        &self,
        ticket_ids: &[i64],
        options: TicketGetOptions,
    ) -> Result<Vec<Ticket>, OtrsError> {
        if ticket_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids = ticket_ids
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(",");

        let request = SoapRequest::new("TicketGet")
            .arg("TicketID", ids)
            .flag("AllArticles", options.all_articles)
            .flag("DynamicFields", options.dynamic_fields)
            .flag("Attachments", options.attachments);

        let response = self.call_authenticated(request).await?;
        response
            .children_named(Ticket::XML_NAME)
            .map(Ticket::from_element)
            .collect()
    }

    /// Searches tickets and returns the matching ticket IDs.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let ids = connector
    ///     .ticket_search(&TicketSearch::new().with_customer_id("9").with_state_type("open"))
    ///     .await?;
    /// ```
    pub async fn ticket_search(&self, search: &TicketSearch) -> Result<Vec<i64>, OtrsError> {
        let request = search
            .filters
            .iter()
            .cloned()
            .fold(SoapRequest::new("TicketSearch"), SoapRequest::element);

        let response = self.call_authenticated(request).await?;
        response
            .children_named("TicketID")
            .filter_map(|e| e.text.as_deref())
            .filter_map(|raw| parse_int("TicketID", raw).transpose())
            .collect()
    }

    /// Creates a ticket with its first article.
    ///
    /// # Returns
    ///
    /// The new ticket's ID and number, and the ID of the created article.
    pub async fn ticket_create(
        &self,
        ticket: &Ticket,
        article: &Article,
        dynamic_fields: &[DynamicField],
        attachments: &[Attachment],
    ) -> Result<TicketRef, OtrsError> {
        let request = SoapRequest::new("TicketCreate")
            .object(ticket)
            .object(article)
            .objects(dynamic_fields)
            .objects(attachments);

        tracing::debug!(title = ?ticket.title, queue = ?ticket.queue, "Creating ticket");

        let response = self.call_authenticated(request).await?;
        let created = TicketRef::from_response(&response)?;
        tracing::info!(ticket_id = created.ticket_id, ticket_number = %created.ticket_number, "Ticket created");
        Ok(created)
    }

    /// Updates a ticket's attributes and/or adds an article.
    ///
    /// # Errors
    ///
    /// Returns `OtrsError::Validation` if `changes` contains nothing to
    /// update, or attachments without an article to hold them.
    pub async fn ticket_update(
        &self,
        selector: TicketSelector,
        changes: &TicketChanges,
    ) -> Result<TicketRef, OtrsError> {
        changes.validate()?;

        let request = selector.apply(SoapRequest::new("TicketUpdate"));
        let mut request = match &changes.ticket {
            Some(ticket) if !ticket.is_empty() => request.object(ticket),
            _ => request,
        };
        if let Some(article) = &changes.article {
            request = request.object(article);
        }
        let request = request
            .objects(&changes.dynamic_fields)
            .objects(&changes.attachments);

        tracing::debug!(selector = %selector, "Updating ticket");

        let response = self.call_authenticated(request).await?;
        TicketRef::from_response(&response)
    }

    /// Returns `request` with authentication elements in front of its payload.
    ///
    /// Uses `session_id` when given, the registered credentials otherwise.
    fn authenticated(&self, request: &SoapRequest, session_id: Option<&str>) -> Result<SoapRequest, OtrsError> {
        let auth = SoapRequest::new(request.operation());
        let auth = match (session_id, &self.credentials) {
            (Some(session_id), _) => auth.arg("SessionID", session_id),
            (None, Some(credentials)) => auth
                .arg(credentials.login_field, &credentials.login)
                .arg("Password", &credentials.password),
            (None, None) => return Err(OtrsError::NotAuthenticated),
        };
        Ok(request.payload().iter().cloned().fold(auth, SoapRequest::element))
    }

    /// Authenticates and posts a request.
    ///
    /// A session refused with `AuthFail` is dropped and the request is
    /// sent once more with the registered credentials.
    async fn call_authenticated(&self, request: SoapRequest) -> Result<Element, OtrsError> {
        let secret = self.secret_for_sanitization();
        let session_id = self.session_id();

        let result = self
            .call(self.authenticated(&request, session_id.as_deref())?, secret)
            .await;

        match result {
            Err(err) if err.is_auth_failure() && session_id.is_some() && self.credentials.is_some() => {
                tracing::warn!(
                    operation = %request.operation(),
                    error = %err.sanitized_display(secret),
                    "OTRS session rejected, falling back to credentials"
                );
                {
                    let mut current = self.lock_session();
                    if *current == session_id {
                        *current = None;
                    }
                }
                self.call(self.authenticated(&request, None)?, secret).await
            }
            result => result,
        }
    }

    /// Posts a request and returns the unpacked `<Operation>Response`.
    ///
    /// `secret` is redacted from any error body.
    async fn call(&self, request: SoapRequest, secret: &str) -> Result<Element, OtrsError> {
        let operation = request.operation().to_string();
        let body = request.to_xml()?;

        tracing::debug!(operation = %operation, endpoint = %self.endpoint, "Calling OTRS operation");

        let response = self
            .http
            .post(&self.endpoint)
            .header(CONTENT_TYPE, SOAP_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    return OtrsError::timeout(self.timeout, operation.as_str());
                }
                OtrsError::Http(e)
            })?;

        let status = response.status();
        let text = response.text().await.map_err(OtrsError::Http)?;

        if !status.is_success() {
            return Err(Self::http_error(status, &text, secret));
        }

        tracing::trace!(operation = %operation, body = %OtrsError::sanitize_message(&text, secret), "OTRS response");

        soap::parse_response(&operation, &text).map_err(|e| e.redacted(secret))
    }

    /// Converts a non-success HTTP response into an error.
    ///
    /// SOAP servers report faults with HTTP 500, so a parsable fault wins
    /// over the status code.
    fn http_error(status: StatusCode, body: &str, secret: &str) -> OtrsError {
        if let Some(fault) = soap::parse_fault(body) {
            return fault.redacted(secret);
        }

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => OtrsError::Authentication,
            _ => {
                tracing::warn!(status = %status, "OTRS returned an HTTP error");
                let body = OtrsError::sanitize_message(body, secret);
                let body = if body.chars().count() > MAX_ERROR_BODY_LEN {
                    format!(
                        "{}...[truncated]",
                        body.chars().take(MAX_ERROR_BODY_LEN).collect::<String>()
                    )
                } else {
                    body
                };
                OtrsError::HttpStatus { status, body }
            }
        }
    }
}

/// Related data to include in `TicketGet`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TicketGetOptions {
    /// Include all articles.
    pub all_articles: bool,
    /// Include dynamic fields.
    pub dynamic_fields: bool,
    /// Include article attachments (needs `all_articles`).
    pub attachments: bool,
}

impl TicketGetOptions {
    pub fn with_articles(mut self) -> Self {
        self.all_articles = true;
        self
    }

    pub fn with_dynamic_fields(mut self) -> Self {
        self.dynamic_fields = true;
        self
    }

    /// Includes attachments, and therefore articles.
    pub fn with_attachments(mut self) -> Self {
        self.all_articles = true;
        self.attachments = true;
        self
    }
}

/// Sort direction for [`TicketSearch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Ascending.
    Up,
    /// Descending.
    Down,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Up => f.write_str("Up"),
            SortOrder::Down => f.write_str("Down"),
        }
    }
}

/// Filters for `TicketSearch`.
///
/// Repeating a filter (e.g. two states) sends it twice, which OTRS
/// reads as "any of".
#[derive(Debug, Clone, Default)]
pub struct TicketSearch {
    filters: Vec<Element>,
}

impl TicketSearch {
    /// Creates an empty search (matches every ticket the user can see).
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an arbitrary `<name>value</name>` filter.
    pub fn filter(mut self, name: &str, value: impl ToString) -> Self {
        self.filters.push(Element::with_text(name, value.to_string()));
        self
    }

    /// Title match; `%` is a wildcard.
    pub fn with_title(self, title: impl Into<String>) -> Self {
        self.filter("Title", title.into())
    }

    pub fn with_ticket_number(self, number: impl ToString) -> Self {
        self.filter("TicketNumber", number)
    }

    pub fn with_queue(self, queue: impl Into<String>) -> Self {
        self.filter("Queues", queue.into())
    }

    pub fn with_queue_id(self, queue_id: i64) -> Self {
        self.filter("QueueIDs", queue_id)
    }

    pub fn with_state(self, state: impl Into<String>) -> Self {
        self.filter("States", state.into())
    }

    /// State category, e.g. `open` or `closed`.
    pub fn with_state_type(self, state_type: impl Into<String>) -> Self {
        self.filter("StateType", state_type.into())
    }

    pub fn with_priority(self, priority: impl Into<String>) -> Self {
        self.filter("Priorities", priority.into())
    }

    pub fn with_type(self, type_name: impl Into<String>) -> Self {
        self.filter("Types", type_name.into())
    }

    /// Customer ID; numeric IDs may be passed as integers.
    pub fn with_customer_id(self, customer_id: impl ToString) -> Self {
        self.filter("CustomerID", customer_id)
    }

    pub fn with_customer_user_login(self, login: impl Into<String>) -> Self {
        self.filter("CustomerUserLogin", login.into())
    }

    pub fn with_owner_id(self, owner_id: i64) -> Self {
        self.filter("OwnerIDs", owner_id)
    }

    /// Tickets created after a `YYYY-MM-DD HH:MM:SS` timestamp.
    pub fn with_created_after(self, date: impl Into<String>) -> Self {
        self.filter("TicketCreateTimeNewerDate", date.into())
    }

    /// Tickets created before a `YYYY-MM-DD HH:MM:SS` timestamp.
    pub fn with_created_before(self, date: impl Into<String>) -> Self {
        self.filter("TicketCreateTimeOlderDate", date.into())
    }

    /// Matches a dynamic field value exactly.
    pub fn with_dynamic_field(mut self, name: &str, value: impl Into<String>) -> Self {
        let mut element = Element::new(format!("DynamicField_{}", name));
        element.push(Element::with_text("Equals", value.into()));
        self.filters.push(element);
        self
    }

    pub fn with_limit(self, limit: u32) -> Self {
        self.filter("Limit", limit)
    }

    /// Sort field, e.g. `Age`, `Priority`, `TicketNumber`.
    pub fn with_sort_by(self, field: impl Into<String>, order: SortOrder) -> Self {
        self.filter("SortBy", field.into()).filter("OrderBy", order)
    }

    /// Returns true if no filters were added.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

/// Identifies the ticket a `TicketUpdate` applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketSelector {
    /// By ticket ID.
    Id(i64),
    /// By ticket number.
    Number(String),
}

impl TicketSelector {
    fn apply(&self, request: SoapRequest) -> SoapRequest {
        match self {
            TicketSelector::Id(id) => request.arg("TicketID", id),
            TicketSelector::Number(number) => request.arg("TicketNumber", number),
        }
    }
}

impl fmt::Display for TicketSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TicketSelector::Id(id) => write!(f, "ID {}", id),
            TicketSelector::Number(number) => write!(f, "#{}", number),
        }
    }
}

/// What a `TicketUpdate` changes.
#[derive(Debug, Clone, Default)]
pub struct TicketChanges {
    /// Ticket attributes to change; unset fields are left alone.
    pub ticket: Option<Ticket>,
    /// Article to add.
    pub article: Option<Article>,
    /// Dynamic field values to set.
    pub dynamic_fields: Vec<DynamicField>,
    /// Attachments for `article`.
    pub attachments: Vec<Attachment>,
}

impl TicketChanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ticket(mut self, ticket: Ticket) -> Self {
        self.ticket = Some(ticket);
        self
    }

    pub fn with_article(mut self, article: Article) -> Self {
        self.article = Some(article);
        self
    }

    pub fn with_dynamic_field(mut self, field: DynamicField) -> Self {
        self.dynamic_fields.push(field);
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Returns true if applying these changes would change nothing.
    pub fn is_empty(&self) -> bool {
        self.ticket.as_ref().is_none_or(Ticket::is_empty)
            && self.article.is_none()
            && self.dynamic_fields.is_empty()
    }

    fn validate(&self) -> Result<(), OtrsError> {
        if !self.attachments.is_empty() && self.article.is_none() {
            return Err(OtrsError::validation(
                "attachments can only be added together with an article",
            ));
        }
        if self.is_empty() {
            return Err(OtrsError::validation(
                "nothing to update: set ticket fields, an article or dynamic fields",
            ));
        }
        Ok(())
    }
}

/// Identity of a created or updated ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TicketRef {
    /// Ticket ID.
    #[serde(rename = "TicketID")]
    pub ticket_id: i64,
    /// Ticket number.
    pub ticket_number: String,
    /// ID of the article created by the call, if any.
    #[serde(rename = "ArticleID", skip_serializing_if = "Option::is_none")]
    pub article_id: Option<i64>,
}

impl TicketRef {
    fn from_response(response: &Element) -> Result<Self, OtrsError> {
        let ticket_id = response
            .child_text("TicketID")
            .map(|raw| parse_int("TicketID", raw))
            .transpose()?
            .flatten()
            .ok_or_else(|| OtrsError::malformed(format!("<{}> without TicketID", response.name)))?;
        let ticket_number = response
            .child_text("TicketNumber")
            .filter(|n| !n.is_empty())
            .ok_or_else(|| OtrsError::malformed(format!("<{}> without TicketNumber", response.name)))?
            .to_string();
        let article_id = response
            .child_text("ArticleID")
            .map(|raw| parse_int("ArticleID", raw))
            .transpose()?
            .flatten();

        Ok(Self {
            ticket_id,
            ticket_number,
            article_id,
        })
    }
}
