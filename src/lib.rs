//! # otrs
//!
//! A client for the OTRS "GenericTicketConnector" SOAP web service, and an
//! MCP server that exposes it as tools.
//!
//! ## Features
//!
//! - **Sessions**: create an agent or customer session, or authenticate
//!   every request with registered credentials
//! - **Tickets**: get, search, create and update tickets
//! - **Marshalling**: typed [`Ticket`](models::Ticket) and
//!   [`Article`](models::Article) objects mapped to and from the
//!   connector's XML, with numeric fields coerced from text and unset
//!   fields left out of requests
//! - **Security**: the password is never logged or exposed in error messages
//!
//! ## Architecture
//!
//! - [`config`] - Configuration loading from environment variables
//! - [`error`] - Error types with password sanitization
//! - [`xml`] - Small element tree over `quick-xml`
//! - [`models`] - Ticket, article, dynamic field and attachment objects
//! - [`soap`] - SOAP envelope construction and response unpacking
//! - [`connector`] - HTTP client for the webservice operations
//! - [`server`] - MCP server implementation with tool routing
//! - [`tools`] - Tool input parameter structs
//!
//! ## Configuration
//!
//! - `OTRS_SERVER`: Base URL of your OTRS instance
//! - `OTRS_LOGIN` / `OTRS_PASSWORD`: Agent credentials
//! - `OTRS_WEBSERVICE`: Webservice name (default `GenericTicketConnector`)
//! - `OTRS_TIMEOUT_SECS`: Request timeout (default 30)
//! - `RUST_LOG`: Log level (e.g., `otrs=debug`)
//!
//! ## Example
//!
//! ```ignore
//! use otrs::connector::{GenericTicketConnector, TicketGetOptions, TicketSearch};
//! use otrs::models::{Article, Ticket};
//!
//! async fn example() -> Result<(), otrs::error::OtrsError> {
//!     let mut connector = GenericTicketConnector::new("https://otrs.example.com", "GenericTicketConnector")?;
//!     connector.session_create("agent", "secret").await?;
//!
//!     let ticket = Ticket::new()
//!         .with_title("Problem test")
//!         .with_queue("Support")
//!         .with_state("new")
//!         .with_priority("3 normal")
//!         .with_customer_user("foo@example.com");
//!     let created = connector
//!         .ticket_create(&ticket, &Article::new("UnitTest", "bla"), &[], &[])
//!         .await?;
//!
//!     let ticket = connector.ticket_get(created.ticket_id, TicketGetOptions::default()).await?;
//!     let open = connector.ticket_search(&TicketSearch::new().with_state_type("open")).await?;
//!     println!("{:?} / {} open", ticket.title, open.len());
//!     Ok(())
//! }
//! ```

#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod connector;
pub mod error;
pub mod models;
pub mod server;
pub mod soap;
pub mod tools;
pub mod xml;
