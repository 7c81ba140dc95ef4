//! Model gateway error types

use thiserror::Error;

/// Shown when a failure carries no description of its own
pub const FALLBACK_ERROR_TEXT: &str = "Error occurred. Please try again";

/// Gateway error with classification
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct GatewayError {
    pub kind: GatewayErrorKind,
    pub message: String,
}

impl GatewayError {
    pub fn new(kind: GatewayErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Network, message)
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::RateLimit, message)
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::ServerError, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Auth, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::InvalidRequest, message)
    }

    pub fn policy(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Policy, message)
    }

    pub fn empty_response() -> Self {
        Self::new(GatewayErrorKind::EmptyResponse, "Model returned an empty response")
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Unknown, message)
    }

    /// Text for the ERROR message appended to history
    pub fn display_text(&self) -> String {
        let trimmed = self.message.trim();
        if trimmed.is_empty() {
            FALLBACK_ERROR_TEXT.to_string()
        } else {
            trimmed.to_string()
        }
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayErrorKind {
    /// Network issues, timeouts
    Network,
    /// Rate limited (429)
    RateLimit,
    /// Server error (5xx)
    ServerError,
    /// Authentication failed (401, 403)
    Auth,
    /// Bad request (400)
    InvalidRequest,
    /// Prompt or reply blocked by safety settings
    Policy,
    /// Reply carried no text
    EmptyResponse,
    Unknown,
}

impl GatewayErrorKind {
    /// Whether sending the same turn again could succeed
    ///
    /// Nothing retries automatically; this only informs logging and callers.
    pub fn is_transient(self) -> bool {
        matches!(self, Self::Network | Self::RateLimit | Self::ServerError)
    }
}
