//! # Domain Types
//!
//! Wire types for the POS REST API.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Auth                 Catalog              Sales                        │
//! │  ────                 ───────              ─────                        │
//! │  Credentials          Product              CheckoutReceipt              │
//! │  SignupRequest        NewProduct           SalesReportQuery             │
//! │  SignupReceipt        InventorySummary     SalesPoint                   │
//! │                                            MpesaPaymentRequest          │
//! │  Customers            Admin                                             │
//! │  ─────────            ─────                                             │
//! │  Customer             DashboardStats                                    │
//! │  NewCustomer          AuditLogPage / AuditLogEntry                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Request types carry a `validate()` that runs the same rules the forms
//! enforce before anything is sent.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::money::{self, Money};
use crate::token::Role;
use crate::validation::{self, ValidationResult};

// =============================================================================
// Auth
// =============================================================================

/// Login credentials.
///
/// Serialized with the backend's field names (`username`, `password`).
/// `Debug` never prints the secret.
#[derive(Clone, Serialize)]
pub struct Credentials {
    /// Username or email address.
    #[serde(rename = "username")]
    pub identifier: String,

    #[serde(rename = "password")]
    pub secret: String,
}

impl Credentials {
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Credentials {
            identifier: identifier.into(),
            secret: secret.into(),
        }
    }

    /// Validates the login form.
    ///
    /// ## Rules
    /// - identifier required; checked as an email when it contains `@`
    /// - secret at least 8 characters
    pub fn validate(&self) -> ValidationResult<()> {
        let identifier = self.identifier.trim();
        if identifier.is_empty() {
            return Err(ValidationError::Required {
                field: "identifier".to_string(),
            });
        }
        if identifier.contains('@') {
            validation::validate_email(identifier)?;
        }
        if self.secret.is_empty() {
            return Err(ValidationError::Required {
                field: "password".to_string(),
            });
        }
        if self.secret.chars().count() < validation::MIN_PASSWORD_LEN {
            return Err(ValidationError::TooShort {
                field: "password".to_string(),
                min: validation::MIN_PASSWORD_LEN,
            });
        }
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Login response. The backend has used both `token` and `access_token`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(alias = "access_token")]
    pub token: String,
}

/// Registration form.
#[derive(Clone, Serialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Role,

    /// Terms checkbox. Checked client-side, never sent.
    #[serde(skip)]
    pub accept_terms: bool,
}

impl SignupRequest {
    /// Validates the registration form.
    ///
    /// ## Rules
    /// ```text
    /// username  3-20 chars, letters/digits/underscore
    /// email     valid address
    /// password  >= 8 chars, lowercase + uppercase + digit + one of @$!%*?&
    /// role      cashier | manager (admins are provisioned server-side)
    /// terms     must be accepted
    /// ```
    pub fn validate(&self) -> ValidationResult<()> {
        validation::validate_username(&self.username)?;
        validation::validate_email(&self.email)?;
        validation::validate_signup_password(&self.password)?;
        validation::validate_signup_role(self.role)?;
        if !self.accept_terms {
            return Err(ValidationError::Required {
                field: "accept_terms".to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for SignupRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignupRequest")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("role", &self.role)
            .field("accept_terms", &self.accept_terms)
            .finish()
    }
}

/// The account created by a successful signup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredUser {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    pub role: Role,
}

/// Signup response (HTTP 201).
#[derive(Debug, Clone, Deserialize)]
pub struct SignupReceipt {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub user: Option<RegisteredUser>,
}

// =============================================================================
// Catalog
// =============================================================================

/// A product as listed by `GET /products`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    #[serde(with = "money::decimal")]
    pub price: Money,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub category_id: Option<i64>,
}

impl Product {
    /// Case-insensitive name filter used by the product list search box.
    ///
    /// An empty query matches everything.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim();
        query.is_empty() || self.name.to_lowercase().contains(&query.to_lowercase())
    }
}

/// `GET /products` envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductList {
    #[serde(default)]
    pub products: Vec<Product>,
}

/// New product form.
#[derive(Debug, Clone, Serialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(with = "money::decimal")]
    pub price: Money,
    pub stock: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
}

impl NewProduct {
    /// Validates the new product form: name required, price and stock not
    /// negative.
    pub fn validate(&self) -> ValidationResult<()> {
        validation::validate_product_name(&self.name)?;
        validation::validate_price(self.price)?;
        if self.stock < 0 {
            return Err(ValidationError::MustNotBeNegative {
                field: "stock".to_string(),
            });
        }
        if let Some(category_id) = self.category_id {
            if category_id <= 0 {
                return Err(ValidationError::MustBePositive {
                    field: "category_id".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Product summary returned after creation. The server generates the SKU.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedProduct {
    pub id: i64,
    pub name: String,
    #[serde(with = "money::decimal")]
    pub price: Money,
    #[serde(default)]
    pub sku: Option<String>,
}

/// `POST /products` response.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductCreated {
    #[serde(default)]
    pub message: Option<String>,
    pub product: CreatedProduct,
}

/// A product below its critical stock level.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CriticalItem {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(alias = "stock_quantity")]
    pub stock_level: i64,
}

/// `GET /inventory-monitoring` response.
#[derive(Debug, Clone, Deserialize)]
pub struct InventorySummary {
    #[serde(default)]
    pub total_products: Option<i64>,
    #[serde(default)]
    pub critical_stock: Option<i64>,
    #[serde(default)]
    pub critical_items: Vec<CriticalItem>,
}

// =============================================================================
// Sales
// =============================================================================

/// `POST /checkout` response.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutReceipt {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub transaction_id: Option<i64>,
}

/// Date range for the sales report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SalesReportQuery {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl SalesReportQuery {
    pub fn new(start_date: DateTime<Utc>, end_date: DateTime<Utc>) -> Self {
        SalesReportQuery {
            start_date,
            end_date,
        }
    }

    /// The start must not be after the end.
    pub fn validate(&self) -> ValidationResult<()> {
        if self.start_date > self.end_date {
            return Err(ValidationError::InvalidFormat {
                field: "start_date".to_string(),
                reason: "must not be after end_date".to_string(),
            });
        }
        Ok(())
    }

    /// Query string pairs in RFC 3339.
    pub fn to_query(&self) -> Vec<(String, String)> {
        vec![
            ("start_date".to_string(), self.start_date.to_rfc3339()),
            ("end_date".to_string(), self.end_date.to_rfc3339()),
        ]
    }
}

/// One bucket of the sales report.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SalesPoint {
    /// ISO-8601 timestamp as produced by the server (zone may be absent).
    pub timestamp: String,
    #[serde(with = "money::decimal")]
    pub total_sales: Money,
    pub transaction_count: i64,
}

/// `GET /reports/sales` envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct SalesReport {
    #[serde(default)]
    pub report: Vec<SalesPoint>,
}

impl SalesReport {
    /// Sum of all buckets.
    pub fn total_sales(&self) -> Money {
        self.report.iter().map(|p| p.total_sales).sum()
    }

    pub fn transaction_count(&self) -> i64 {
        self.report.iter().map(|p| p.transaction_count).sum()
    }
}

/// M-Pesa STK push initiation.
#[derive(Debug, Clone, Serialize)]
pub struct MpesaPaymentRequest {
    pub phone: String,
    #[serde(with = "money::decimal")]
    pub amount: Money,
    #[serde(rename = "transactionId")]
    pub transaction_id: String,
}

impl MpesaPaymentRequest {
    pub fn validate(&self) -> ValidationResult<()> {
        validation::validate_phone(&self.phone)?;
        if !self.amount.is_positive() {
            return Err(ValidationError::MustBePositive {
                field: "amount".to_string(),
            });
        }
        if self.transaction_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "transactionId".to_string(),
            });
        }
        Ok(())
    }
}

/// Generic `{message}` acknowledgement.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiMessage {
    #[serde(default)]
    pub message: Option<String>,
}

// =============================================================================
// Customers
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// `GET /customers` envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomerList {
    #[serde(default)]
    pub customers: Vec<Customer>,
}

/// New customer form. All fields are required by the server.
#[derive(Debug, Clone, Serialize)]
pub struct NewCustomer {
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl NewCustomer {
    pub fn validate(&self) -> ValidationResult<()> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "name".to_string(),
            });
        }
        validation::validate_email(&self.email)?;
        validation::validate_phone(&self.phone)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedCustomer {
    pub id: i64,
    pub name: String,
}

/// `POST /addcustomer` response.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomerCreated {
    #[serde(default)]
    pub message: Option<String>,
    pub customer: CreatedCustomer,
}

// =============================================================================
// Admin
// =============================================================================

/// `GET /admin/dashboard` aggregate figures.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    #[serde(default, with = "money::decimal")]
    pub total_sales: Money,
    #[serde(default)]
    pub active_products: i64,
    #[serde(default)]
    pub critical_inventory: i64,
    #[serde(default)]
    pub recent_customers: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuditLogEntry {
    pub id: i64,
    pub user_id: i64,
    pub action: String,
    pub timestamp: String,
    #[serde(default)]
    pub details: serde_json::Value,
}

/// `GET /audit-logs` page.
#[derive(Debug, Clone, Deserialize)]
pub struct AuditLogPage {
    #[serde(default)]
    pub logs: Vec<AuditLogEntry>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub per_page: Option<u32>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub pages: Option<u32>,
}

// =============================================================================
// Unit Tests
// =============================================================================
