//! MCP tool implementations for the OTRS server.
//!
//! This module contains the input types and helper functions for
//! MCP tools that expose GenericTicketConnector operations.

mod inputs;

pub use inputs::*;
