//! # Client Error Types
//!
//! Error types for everything that leaves the process: HTTP calls, storage,
//! configuration and session handling.
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Client Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │   Transport     │  │     Auth        │  │     Server Reply        │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Network        │  │  Unauthorized   │  │  Validation (fields)    │ │
//! │  │                 │  │  MalformedToken │  │  Forbidden              │ │
//! │  │                 │  │  NotAuthent.    │  │  Http                   │ │
//! │  │                 │  │  Superseded     │  │  MalformedResponse      │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │     Local       │  │     Cart        │  │     Environment         │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Invalid        │  │  Cart           │  │  Storage                │ │
//! │  │  (form rules)   │  │  EmptyCart      │  │  Config                 │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Auth failures are absorbed by the session manager (it clears itself);
//! everything else reaches the caller, which shows `user_message()`.

use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;
use till_core::{CoreError, TokenError, ValidationError};

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// The request never produced an HTTP response.
    #[error("Network error: {0}")]
    Network(String),

    // =========================================================================
    // Auth Errors
    // =========================================================================
    /// The server rejected the bearer token or the credentials (HTTP 401).
    #[error("Unauthorized")]
    Unauthorized,

    /// The token could not be decoded into an identity.
    #[error("Malformed token: {0}")]
    MalformedToken(#[from] TokenError),

    /// The signed-in role may not perform this action (HTTP 403 or local gate).
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The operation needs a signed-in session.
    #[error("Not signed in")]
    NotAuthenticated,

    /// A later login, verify or logout started before this one finished.
    #[error("Superseded by a newer session operation")]
    Superseded,

    // =========================================================================
    // Server Reply Errors
    // =========================================================================
    /// The server rejected the input with a field-level error map.
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        fields: BTreeMap<String, String>,
    },

    /// Any other non-success status.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The response body did not match the expected shape.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    // =========================================================================
    // Local Errors
    // =========================================================================
    /// Input failed a client-side form rule; nothing was sent.
    #[error("{0}")]
    Invalid(#[from] ValidationError),

    /// A cart rule rejected the mutation.
    #[error("{0}")]
    Cart(#[from] CoreError),

    #[error("Cart is empty")]
    EmptyCart,

    // =========================================================================
    // Environment Errors
    // =========================================================================
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::MalformedResponse(err.to_string())
        } else {
            ClientError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::MalformedResponse(err.to_string())
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Storage(err.to_string())
    }
}

impl From<toml::de::Error> for ClientError {
    fn from(err: toml::de::Error) -> Self {
        ClientError::Config(err.to_string())
    }
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        ClientError::Config(format!("invalid URL: {}", err))
    }
}

// =============================================================================
// Server Error Bodies
// =============================================================================

impl ClientError {
    /// Builds the error for a non-success response.
    ///
    /// ## Body Shapes Understood
    /// ```text
    /// {"message": "..."}                         → message
    /// {"error": "..."}                           → message
    /// {"errors": {"email": "taken"}}             → field map
    /// {"errors": {"email": ["taken", "bad"]}}    → field map, joined "; "
    /// ```
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed: Option<Value> = serde_json::from_str(body).ok();
        let message = parsed.as_ref().and_then(server_message);

        match status {
            401 => ClientError::Unauthorized,
            403 => ClientError::Forbidden(
                message.unwrap_or_else(|| "Access denied".to_string()),
            ),
            400 | 422 => match parsed.as_ref().and_then(field_errors) {
                Some(fields) => ClientError::Validation {
                    message: message.unwrap_or_else(|| "Invalid input".to_string()),
                    fields,
                },
                None => ClientError::Http {
                    status,
                    message: message.unwrap_or_else(|| default_status_message(status)),
                },
            },
            _ => ClientError::Http {
                status,
                message: message.unwrap_or_else(|| default_status_message(status)),
            },
        }
    }

    /// The message to show next to the form or in a notification.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Network(_) => {
                "Unable to reach the server. Please check your connection.".to_string()
            }
            ClientError::Unauthorized => {
                "Your session has expired or the credentials are invalid. Please log in again."
                    .to_string()
            }
            ClientError::MalformedToken(_) => {
                "The server issued an unreadable session. Please log in again.".to_string()
            }
            ClientError::Forbidden(_) => {
                "You do not have permission to do that.".to_string()
            }
            ClientError::NotAuthenticated => "Please log in first.".to_string(),
            ClientError::Superseded => {
                "Another sign-in attempt replaced this one.".to_string()
            }
            ClientError::Validation { message, fields } => {
                if fields.is_empty() {
                    message.clone()
                } else {
                    fields
                        .iter()
                        .map(|(field, msg)| format!("{}: {}", field, msg))
                        .collect::<Vec<_>>()
                        .join("; ")
                }
            }
            ClientError::Http { message, .. } => message.clone(),
            ClientError::MalformedResponse(_) => {
                "The server sent an unexpected response.".to_string()
            }
            ClientError::Invalid(err) => err.to_string(),
            ClientError::Cart(err) => err.to_string(),
            ClientError::EmptyCart => "Your cart is empty.".to_string(),
            ClientError::Storage(_) => "Local storage is unavailable.".to_string(),
            ClientError::Config(msg) => format!("Configuration problem: {}", msg),
        }
    }

    /// True for failures that mean the session is no longer valid.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            ClientError::Unauthorized | ClientError::MalformedToken(_)
        )
    }

    /// True if repeating the same request later may succeed. Nothing is
    /// retried automatically; this only informs the caller.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Network(_) => true,
            ClientError::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

fn server_message(body: &Value) -> Option<String> {
    ["message", "error", "msg"]
        .iter()
        .find_map(|key| body.get(key).and_then(Value::as_str))
        .map(str::to_string)
}

fn field_errors(body: &Value) -> Option<BTreeMap<String, String>> {
    let errors = body.get("errors")?.as_object()?;
    let fields: BTreeMap<String, String> = errors
        .iter()
        .filter_map(|(field, value)| {
            let msg = match value {
                Value::String(s) => s.clone(),
                Value::Array(items) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join("; "),
                _ => return None,
            };
            Some((field.clone(), msg))
        })
        .collect();

    if fields.is_empty() {
        None
    } else {
        Some(fields)
    }
}

fn default_status_message(status: u16) -> String {
    match status {
        404 => "The requested resource was not found.".to_string(),
        500..=599 => "The server encountered an error. Please try again later.".to_string(),
        _ => format!("Request failed with status {}", status),
    }
}
