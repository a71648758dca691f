//! Configuration management for the OTRS client.
//!
//! This module handles loading configuration from environment variables,
//! with validation to ensure all required values are present.

use std::env;
use std::fmt;
use std::time::Duration;

use url::Url;

use crate::error::OtrsError;

/// Webservice name used when `OTRS_WEBSERVICE` is not set.
pub const DEFAULT_WEBSERVICE: &str = "GenericTicketConnector";

/// Request timeout used when `OTRS_TIMEOUT_SECS` is not set.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for connecting to an OTRS GenericTicketConnector.
///
/// The password is stored but never logged; the `Debug` output redacts it.
#[derive(Clone)]
pub struct Config {
    /// Base URL of the OTRS server (e.g., `https://otrs.example.com`).
    pub server: String,

    /// Name of the configured web service.
    pub webservice: String,

    /// Agent login.
    pub login: String,

    /// Agent password.
    /// This value must never be logged or included in error messages.
    pub password: String,

    /// HTTP request timeout.
    pub timeout: Duration,
}

impl Config {
    /// Creates a configuration with the default webservice name and timeout.
    pub fn new(
        server: impl Into<String>,
        login: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, OtrsError> {
        Ok(Config {
            server: Self::validate_server(server.into())?,
            webservice: DEFAULT_WEBSERVICE.to_string(),
            login: login.into(),
            password: password.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Overrides the webservice name.
    pub fn with_webservice(mut self, webservice: impl Into<String>) -> Self {
        self.webservice = webservice.into();
        self
    }

    /// Loads configuration from environment variables.
    ///
    /// # Required Environment Variables
    ///
    /// - `OTRS_SERVER`: base URL of the OTRS instance
    /// - `OTRS_LOGIN`: agent login
    /// - `OTRS_PASSWORD`: agent password
    ///
    /// # Optional Environment Variables
    ///
    /// - `OTRS_WEBSERVICE`: webservice name (default `GenericTicketConnector`)
    /// - `OTRS_TIMEOUT_SECS`: request timeout in seconds (default 30)
    ///
    /// # Errors
    ///
    /// Returns `OtrsError::Config` if any required variable is missing
    /// or if values fail validation.
    pub fn from_env() -> Result<Self, OtrsError> {
        let server = Self::get_required_env("OTRS_SERVER")?;
        let login = Self::get_required_env("OTRS_LOGIN")?;
        let password = Self::get_required_env("OTRS_PASSWORD")?;

        let mut config = Config::new(server, login, password)?;

        if let Some(webservice) = Self::get_optional_env("OTRS_WEBSERVICE") {
            config.webservice = webservice;
        }
        if let Some(secs) = Self::get_optional_env("OTRS_TIMEOUT_SECS") {
            config.timeout = Self::parse_timeout(&secs)?;
        }

        Ok(config)
    }

    /// Gets a required environment variable, returning an error if missing or empty.
    fn get_required_env(name: &str) -> Result<String, OtrsError> {
        Self::get_optional_env(name).ok_or_else(|| OtrsError::missing_env(name))
    }

    fn get_optional_env(name: &str) -> Option<String> {
        env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    /// Validates and normalizes the server URL.
    fn validate_server(url: String) -> Result<String, OtrsError> {
        let url = url.trim().trim_end_matches('/').to_string();

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(OtrsError::invalid_config(
                "OTRS_SERVER must start with http:// or https://",
            ));
        }

        let parsed = Url::parse(&url)
            .map_err(|e| OtrsError::invalid_config(format!("OTRS_SERVER is not a valid URL: {}", e)))?;
        if parsed.host().is_none() {
            return Err(OtrsError::invalid_config("OTRS_SERVER has no host"));
        }

        Ok(url)
    }

    fn parse_timeout(raw: &str) -> Result<Duration, OtrsError> {
        match raw.parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
            _ => Err(OtrsError::invalid_config(
                "OTRS_TIMEOUT_SECS must be a positive integer",
            )),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("server", &self.server)
            .field("webservice", &self.webservice)
            .field("login", &self.login)
            .field("password", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_server_removes_trailing_slash() {
        let result = Config::validate_server("https://otrs.example.com/".to_string()).unwrap();
        assert_eq!(result, "https://otrs.example.com");
    }

    #[test]
    fn test_validate_server_requires_scheme() {
        assert!(Config::validate_server("otrs.example.com".to_string()).is_err());
    }

    #[test]
    fn test_validate_server_rejects_garbage() {
        assert!(Config::validate_server("https://".to_string()).is_err());
    }

    #[test]
    fn test_new_uses_defaults() {
        let config = Config::new("http://localhost:8080", "agent", "pw").unwrap();
        assert_eq!(config.webservice, DEFAULT_WEBSERVICE);
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn test_with_webservice() {
        let config = Config::new("http://localhost", "agent", "pw")
            .unwrap()
            .with_webservice("TicketConnectorSOAP");
        assert_eq!(config.webservice, "TicketConnectorSOAP");
    }

    #[test]
    fn test_parse_timeout() {
        assert_eq!(Config::parse_timeout("5").unwrap(), Duration::from_secs(5));
        assert!(Config::parse_timeout("0").is_err());
        assert!(Config::parse_timeout("soon").is_err());
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = Config::new("https://otrs.example.com", "agent", "s3cr3t-pass").unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("s3cr3t-pass"));
        assert!(debug.contains("[REDACTED]"));
    }
}
