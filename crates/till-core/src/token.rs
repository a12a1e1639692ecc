//! # Bearer Token Identity
//!
//! Decodes the identity carried inside the session token.
//!
//! ## Trust Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Token Decoding                                   │
//! │                                                                         │
//! │   header.payload.signature                                              │
//! │     │       │        │                                                  │
//! │     │       │        └── NOT checked here: the server already accepted  │
//! │     │       │            this token on login or verify                  │
//! │     │       ▼                                                           │
//! │     │   base64url ──► JSON ──► Claims { sub: {id, role}, name, exp }    │
//! │     ▼                                    │                              │
//! │   decode_header (must be a JOSE header)  ▼                              │
//! │                                       Identity                          │
//! │                                                                         │
//! │   Any step failing ──► TokenError ──► session is cleared                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{TokenError, ValidationError};

// =============================================================================
// Role
// =============================================================================

/// Employee role. Anything else in a token is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Cashier,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Manager, Role::Cashier];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Cashier => "cashier",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "role".to_string(),
                allowed: Role::ALL.iter().map(|r| r.as_str().to_string()).collect(),
            })
    }
}

// =============================================================================
// Claims
// =============================================================================

/// The identity object the backend puts in the token subject.
#[derive(Debug, Deserialize)]
struct Subject {
    id: i64,
    role: Role,
    #[serde(default)]
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: Subject,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    exp: Option<i64>,
}

/// Who the current session belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub subject_id: i64,
    pub display_name: String,
    pub role: Role,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Identity {
    /// True once `now` has reached the token's `exp`. Tokens without
    /// `exp` never expire client-side.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }

    pub fn has_role(&self, allowed: &[Role]) -> bool {
        allowed.contains(&self.role)
    }
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        let display_name = claims
            .sub
            .username
            .filter(|s| !s.trim().is_empty())
            .or(claims.name.filter(|s| !s.trim().is_empty()))
            .unwrap_or_else(|| format!("employee #{}", claims.sub.id));

        Identity {
            subject_id: claims.sub.id,
            display_name,
            role: claims.sub.role,
            expires_at: claims.exp.and_then(|exp| DateTime::from_timestamp(exp, 0)),
        }
    }
}

// =============================================================================
// Decoding
// =============================================================================

/// Decodes the identity from a bearer token without verifying its
/// signature.
///
/// ```rust
/// use till_core::token::decode_identity;
///
/// assert!(decode_identity("not-a-token").is_err());
/// ```
pub fn decode_identity(token: &str) -> Result<Identity, TokenError> {
    jsonwebtoken::decode_header(token).map_err(|e| TokenError::Malformed(e.to_string()))?;

    let mut segments = token.split('.');
    let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
        (Some(_), Some(payload), Some(_), None) => payload,
        _ => {
            return Err(TokenError::Malformed(
                "expected three dot-separated segments".to_string(),
            ))
        }
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| TokenError::Encoding(e.to_string()))?;

    let claims: Claims =
        serde_json::from_slice(&bytes).map_err(|e| TokenError::Claims(e.to_string()))?;

    Ok(claims.into())
}

// =============================================================================
// Unit Tests
// =============================================================================
