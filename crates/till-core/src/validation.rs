//! # Validation Module
//!
//! Form validation rules for the till client.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Client (THIS MODULE)                                          │
//! │  ├── Required fields, lengths, formats                                  │
//! │  └── Runs before any request is sent                                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: POS backend                                                   │
//! │  ├── Uniqueness (username, email, SKU)                                  │
//! │  ├── Stock levels                                                       │
//! │  └── Returns {errors: {field: [msg]}} on failure                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use till_core::validation::{validate_email, validate_quantity};
//!
//! validate_email("cashier@shop.co.ke").unwrap();
//! validate_quantity(5).unwrap();
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::token::Role;
use crate::MAX_ITEM_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Minimum password length on both the login and signup forms.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Symbols a signup password must draw at least one character from.
pub const PASSWORD_SYMBOLS: &str = "@$!%*?&";

/// Largest page size the audit log endpoint accepts.
pub const MAX_PER_PAGE: u32 = 100;

// =============================================================================
// Identity Validators
// =============================================================================

/// Validates an email address.
///
/// ## Rules
/// - exactly one `@`, non-empty local part
/// - domain contains a dot, no empty labels
/// - no whitespace
///
/// ```rust
/// use till_core::validation::validate_email;
///
/// assert!(validate_email("a@b.com").is_ok());
/// assert!(validate_email("a@b").is_err());
/// assert!(validate_email("").is_err());
/// ```
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::Required {
            field: "email".to_string(),
        });
    }

    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: reason.to_string(),
    };

    if email.chars().any(char::is_whitespace) {
        return Err(invalid("must not contain spaces"));
    }

    let (local, domain) = email
        .split_once('@')
        .ok_or_else(|| invalid("missing @"))?;

    if local.is_empty() || domain.contains('@') {
        return Err(invalid("must look like name@example.com"));
    }

    if !domain.contains('.') || domain.split('.').any(str::is_empty) {
        return Err(invalid("domain must look like example.com"));
    }

    Ok(())
}

/// Validates a signup username: 3-20 characters of letters, digits and `_`.
pub fn validate_username(username: &str) -> ValidationResult<()> {
    let username = username.trim();

    if username.is_empty() {
        return Err(ValidationError::Required {
            field: "username".to_string(),
        });
    }

    let len = username.chars().count();
    if len < 3 {
        return Err(ValidationError::TooShort {
            field: "username".to_string(),
            min: 3,
        });
    }
    if len > 20 {
        return Err(ValidationError::TooLong {
            field: "username".to_string(),
            max: 20,
        });
    }

    if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ValidationError::InvalidFormat {
            field: "username".to_string(),
            reason: "may contain only letters, numbers, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a new account password.
///
/// ## Rules
/// ```text
/// length     >= 8
/// lowercase  at least one a-z
/// uppercase  at least one A-Z
/// digit      at least one 0-9
/// symbol     at least one of @$!%*?&
/// ```
///
/// ```rust
/// use till_core::validation::validate_signup_password;
///
/// assert!(validate_signup_password("Str0ng!pass").is_ok());
/// assert!(validate_signup_password("weakpassword").is_err());
/// ```
pub fn validate_signup_password(password: &str) -> ValidationResult<()> {
    if password.is_empty() {
        return Err(ValidationError::Required {
            field: "password".to_string(),
        });
    }

    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: MIN_PASSWORD_LEN,
        });
    }

    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_symbol = password.chars().any(|c| PASSWORD_SYMBOLS.contains(c));

    if !(has_lower && has_upper && has_digit && has_symbol) {
        return Err(ValidationError::InvalidFormat {
            field: "password".to_string(),
            reason: format!(
                "must include uppercase, lowercase, a number and one of {}",
                PASSWORD_SYMBOLS
            ),
        });
    }

    Ok(())
}

/// Self-registration may only create cashier or manager accounts.
pub fn validate_signup_role(role: Role) -> ValidationResult<()> {
    match role {
        Role::Cashier | Role::Manager => Ok(()),
        Role::Admin => Err(ValidationError::NotAllowed {
            field: "role".to_string(),
            allowed: vec!["cashier".to_string(), "manager".to_string()],
        }),
    }
}

// =============================================================================
// Catalog Validators
// =============================================================================

/// Validates a product name: required, at most 200 characters.
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Prices may be zero (giveaways) but never negative.
pub fn validate_price(price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: "price".to_string(),
        });
    }
    Ok(())
}

/// Validates a cart line quantity.
///
/// ```rust
/// use till_core::validation::validate_quantity;
///
/// assert!(validate_quantity(1).is_ok());
/// assert!(validate_quantity(0).is_err());
/// assert!(validate_quantity(10_000).is_err());
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

// =============================================================================
// Contact Validators
// =============================================================================

/// Validates a phone number: 9-15 digits, optionally prefixed with `+`.
///
/// Spaces and dashes are not accepted; M-Pesa expects the bare number.
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    let phone = phone.trim();

    if phone.is_empty() {
        return Err(ValidationError::Required {
            field: "phone".to_string(),
        });
    }

    let digits = phone.strip_prefix('+').unwrap_or(phone);

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must contain only digits and an optional leading +".to_string(),
        });
    }

    if !(9..=15).contains(&digits.len()) {
        return Err(ValidationError::OutOfRange {
            field: "phone".to_string(),
            min: 9,
            max: 15,
        });
    }

    Ok(())
}

// =============================================================================
// Paging
// =============================================================================

/// Validates audit log paging: page >= 1, 1 <= per_page <= 100.
pub fn validate_pagination(page: u32, per_page: u32) -> ValidationResult<()> {
    if page == 0 {
        return Err(ValidationError::MustBePositive {
            field: "page".to_string(),
        });
    }

    if per_page == 0 || per_page > MAX_PER_PAGE {
        return Err(ValidationError::OutOfRange {
            field: "per_page".to_string(),
            min: 1,
            max: i64::from(MAX_PER_PAGE),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("cashier@shop.co.ke").is_ok());
        assert!(validate_email("  a@b.com  ").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@b.com").is_err());
        assert!(validate_email("a@@b.com").is_err());
        assert!(validate_email("a@b..com").is_err());
        assert!(validate_email("a b@c.com").is_err());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("jane_doe").is_ok());
        assert!(validate_username("abc").is_ok());
        assert!(matches!(
            validate_username("ab"),
            Err(ValidationError::TooShort { min: 3, .. })
        ));
        assert!(matches!(
            validate_username(&"a".repeat(21)),
            Err(ValidationError::TooLong { max: 20, .. })
        ));
        assert!(validate_username("jane-doe").is_err());
    }

    #[test]
    fn test_validate_signup_password() {
        assert!(validate_signup_password("Str0ng!pass").is_ok());
        assert!(validate_signup_password("S0!a").is_err());
        assert!(validate_signup_password("alllowercase1!").is_err());
        assert!(validate_signup_password("ALLUPPERCASE1!").is_err());
        assert!(validate_signup_password("NoDigitsHere!").is_err());
        assert!(validate_signup_password("NoSymbol123").is_err());
    }

    #[test]
    fn test_signup_role_excludes_admin() {
        assert!(validate_signup_role(Role::Cashier).is_ok());
        assert!(validate_signup_role(Role::Manager).is_ok());
        assert!(matches!(
            validate_signup_role(Role::Admin),
            Err(ValidationError::NotAllowed { .. })
        ));
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_ITEM_QUANTITY).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-3).is_err());
        assert!(validate_quantity(MAX_ITEM_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_price() {
        assert!(validate_price(Money::zero()).is_ok());
        assert!(validate_price(Money::from_cents(150)).is_ok());
        assert!(validate_price(Money::from_cents(-1)).is_err());
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("254712345678").is_ok());
        assert!(validate_phone("+254712345678").is_ok());
        assert!(validate_phone("0712345678").is_ok());
        assert!(validate_phone("").is_err());
        assert!(validate_phone("+").is_err());
        assert!(validate_phone("12345").is_err());
        assert!(validate_phone("0712 345 678").is_err());
        assert!(validate_phone("1234567890123456").is_err());
    }

    #[test]
    fn test_validate_pagination() {
        assert!(validate_pagination(1, 10).is_ok());
        assert!(validate_pagination(3, 100).is_ok());
        assert!(validate_pagination(0, 10).is_err());
        assert!(validate_pagination(1, 0).is_err());
        assert!(validate_pagination(1, 101).is_err());
    }
}
