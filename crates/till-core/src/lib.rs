//! # till-core: Pure Domain Logic for the Till POS Client
//!
//! This crate holds everything the client knows about its domain that does
//! not need a network or a disk: money arithmetic, wire types, form
//! validation, the cart state machine and identity decoding.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Till Client Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                      till-cli (terminal)                        │   │
//! │  │    login ──► products ──► cart add ──► checkout ──► pay         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    till-client (I/O)                            │   │
//! │  │    SessionManager • CartManager • ApiClient • storage           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ till-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   cart    │  │   token   │  │   │
//! │  │   │  Product  │  │   Money   │  │   Cart    │  │  Identity │  │   │
//! │  │   │  Customer │  │  decimal  │  │ LineItem  │  │   Role    │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO NETWORK • NO CLOCK • PURE FUNCTIONS              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Wire types for the REST API (Product, Customer, reports...)
//! - [`money`] - Money type with integer arithmetic
//! - [`cart`] - Cart line items and the merge-by-id state machine
//! - [`token`] - Bearer token claims and the decoded [`Identity`]
//! - [`error`] - Domain error types
//! - [`validation`] - Form validation rules
//!
//! ## Example Usage
//!
//! ```rust
//! use till_core::cart::{Cart, LineItem};
//! use till_core::money::Money;
//!
//! let mut cart = Cart::new();
//! cart.add_item(LineItem::new(1, "Sugar 1kg", Money::from_cents(1000), 2)).unwrap();
//! cart.add_item(LineItem::new(1, "Sugar 1kg", Money::from_cents(1000), 3)).unwrap();
//!
//! assert_eq!(cart.items().len(), 1);
//! assert_eq!(cart.total().cents(), 5000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod error;
pub mod money;
pub mod token;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, LineItem};
pub use error::{CoreError, TokenError, ValidationError};
pub use money::Money;
pub use token::{decode_identity, Identity, Role};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct line items allowed in a single cart.
///
/// ## Business Reason
/// Prevents runaway carts and keeps checkout payloads a reasonable size.
pub const MAX_CART_ITEMS: usize = 200;

/// Maximum quantity of a single line item, after merging.
///
/// ## Business Reason
/// Catches fat-finger entries (typing 10000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 9_999;
