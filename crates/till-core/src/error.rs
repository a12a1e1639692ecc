//! # Error Types
//!
//! Domain-specific error types for till-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  till-core errors (this file)                                          │
//! │  ├── CoreError        - Cart and business rule violations              │
//! │  ├── ValidationError  - Form/input validation failures                 │
//! │  └── TokenError       - Bearer token cannot be decoded                 │
//! │                                                                         │
//! │  till-client errors (separate crate)                                   │
//! │  └── ClientError      - Network, HTTP status, storage, session         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ClientError → user message        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Cart and business rule errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Cart has reached the maximum number of distinct lines.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Merged quantity for a line would exceed the maximum.
    ///
    /// ## When This Occurs
    /// ```text
    /// Cart: item 7, quantity 9990
    ///      │
    ///      ▼
    /// add_item(item 7, quantity 20)
    ///      │
    ///      ▼
    /// QuantityTooLarge { id: 7, requested: 10010, max: 9999 }
    /// ```
    #[error("Quantity {requested} for item {id} exceeds maximum allowed ({max})")]
    QuantityTooLarge { id: i64, requested: i64, max: i64 },

    /// The cart total would not fit in i64 cents.
    #[error("Cart total is too large")]
    TotalOverflow,

    /// Persisted cart contents violate cart invariants.
    #[error("Stored cart is invalid: {0}")]
    CorruptCart(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These mirror the field messages a form would show next to an input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid email, invalid phone number).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    /// Returns the name of the offending field.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooShort { field, .. }
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::MustNotBeNegative { field }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::NotAllowed { field, .. } => field,
        }
    }
}

// =============================================================================
// Token Error
// =============================================================================

/// Bearer token decoding failures.
///
/// Any of these is treated like a failed server verification: the session
/// is cleared.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Token is not three dot-separated segments with a valid JOSE header.
    #[error("token is not a well-formed JWT: {0}")]
    Malformed(String),

    /// Payload segment is not valid base64url.
    #[error("token payload is not valid base64: {0}")]
    Encoding(String),

    /// Payload does not match the identity schema.
    #[error("token claims do not match the identity schema: {0}")]
    Claims(String),
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
