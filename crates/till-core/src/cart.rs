//! # Cart
//!
//! The line items selected for purchase and the rules for combining them.
//!
//! ## Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Cart Operations                                  │
//! │                                                                         │
//! │  Intent                  Effect on items                                │
//! │  ──────                  ───────────────                                │
//! │                                                                         │
//! │  add_item(id present) ─► items[i].quantity += item.quantity             │
//! │                                                                         │
//! │  add_item(id absent) ──► items.push(item)                               │
//! │                                                                         │
//! │  remove_item(id) ──────► items.retain(|i| i.id != id)   (absent: no-op) │
//! │                                                                         │
//! │  clear() ──────────────► items.clear()                                  │
//! │                                                                         │
//! │  total() ──────────────► Σ price × quantity   (never cached)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A rejected `add_item` leaves the cart exactly as it was.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::{self, Money};
use crate::validation;
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

/// One product entry in the cart.
///
/// Serialized with the same field names the checkout endpoint and the
/// persisted cart use: `{id, name, price, quantity}`, price as a decimal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Product id on the server.
    pub id: i64,

    /// Display name at the time the item was added.
    pub name: String,

    /// Unit price at the time the item was added.
    #[serde(with = "money::decimal")]
    pub price: Money,

    pub quantity: i64,
}

impl LineItem {
    pub fn new(id: i64, name: impl Into<String>, price: Money, quantity: i64) -> Self {
        LineItem {
            id,
            name: name.into(),
            price,
            quantity,
        }
    }

    /// Unit price × quantity.
    pub fn line_total(&self) -> Money {
        self.price.multiply_quantity(self.quantity)
    }

    fn validate(&self) -> CoreResult<()> {
        validation::validate_quantity(self.quantity)?;
        validation::validate_product_name(&self.name)?;
        validation::validate_price(self.price)?;
        Ok(())
    }
}

/// The shopping cart.
///
/// ## Invariants
/// - Items are unique by `id` (adding the same id increases quantity)
/// - Every quantity is in `1..=MAX_ITEM_QUANTITY`
/// - At most `MAX_CART_ITEMS` distinct lines
/// - Insertion order is preserved
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    items: Vec<LineItem>,
}

impl Cart {
    /// Creates an empty cart.
    pub fn new() -> Self {
        Cart { items: Vec::new() }
    }

    /// Rebuilds a cart from previously persisted items.
    ///
    /// Fails with [`CoreError::CorruptCart`] if the items break any cart
    /// invariant. The caller decides what to do with a corrupt cart.
    pub fn from_items(items: Vec<LineItem>) -> CoreResult<Self> {
        if items.len() > MAX_CART_ITEMS {
            return Err(CoreError::CorruptCart(format!(
                "{} lines exceeds the maximum of {}",
                items.len(),
                MAX_CART_ITEMS
            )));
        }

        for (index, item) in items.iter().enumerate() {
            item.validate()
                .map_err(|e| CoreError::CorruptCart(format!("item {}: {}", item.id, e)))?;

            if items[..index].iter().any(|other| other.id == item.id) {
                return Err(CoreError::CorruptCart(format!(
                    "duplicate item id {}",
                    item.id
                )));
            }
        }

        if checked_total(&items).is_none() {
            return Err(CoreError::CorruptCart("total overflows".to_string()));
        }

        Ok(Cart { items })
    }

    /// Adds an item, or merges its quantity into the existing line with the
    /// same id.
    ///
    /// On merge the existing name and price are kept.
    ///
    /// ## Errors
    /// - `Validation` for a non-positive quantity, empty name or negative price
    /// - `QuantityTooLarge` if the merged quantity exceeds `MAX_ITEM_QUANTITY`
    /// - `CartTooLarge` if a new line would exceed `MAX_CART_ITEMS`
    /// - `TotalOverflow` if the new total would not fit in i64 cents
    pub fn add_item(&mut self, item: LineItem) -> CoreResult<()> {
        item.validate()?;

        let existing = self.items.iter().position(|i| i.id == item.id);
        let unit_price = match existing {
            Some(index) => {
                let current = &self.items[index];
                let merged = current.quantity + item.quantity;
                if merged > MAX_ITEM_QUANTITY {
                    return Err(CoreError::QuantityTooLarge {
                        id: item.id,
                        requested: merged,
                        max: MAX_ITEM_QUANTITY,
                    });
                }
                current.price
            }
            None => {
                if self.items.len() >= MAX_CART_ITEMS {
                    return Err(CoreError::CartTooLarge {
                        max: MAX_CART_ITEMS,
                    });
                }
                item.price
            }
        };

        unit_price
            .checked_multiply_quantity(item.quantity)
            .and_then(|added| self.total().checked_add(added))
            .ok_or(CoreError::TotalOverflow)?;

        match existing {
            Some(index) => self.items[index].quantity += item.quantity,
            None => self.items.push(item),
        }
        Ok(())
    }

    /// Takes back the quantities in `submitted` from the matching lines,
    /// dropping lines that reach zero. Ids not in the cart are ignored.
    ///
    /// Used after checkout so that items added while the sale was in flight
    /// stay in the cart.
    pub fn deduct(&mut self, submitted: &[LineItem]) {
        for sold in submitted {
            if let Some(line) = self.items.iter_mut().find(|i| i.id == sold.id) {
                line.quantity -= sold.quantity.min(line.quantity);
            }
        }
        self.items.retain(|i| i.quantity > 0);
    }

    /// Removes the line with `id`. Returns whether anything was removed.
    pub fn remove_item(&mut self, id: i64) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.id != id);
        self.items.len() != before
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Sum of every line total.
    ///
    /// Never overflows: `add_item` and `from_items` reject carts whose total
    /// does not fit.
    pub fn total(&self) -> Money {
        self.items.iter().map(LineItem::line_total).sum()
    }

    /// Total number of units across all lines.
    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

fn checked_total(items: &[LineItem]) -> Option<Money> {
    items.iter().try_fold(Money::zero(), |total, item| {
        total.checked_add(item.price.checked_multiply_quantity(item.quantity)?)
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
