//! # Cart Manager
//!
//! Holds the current cart, persists it after every mutation and publishes
//! snapshots to subscribers.
//!
//! ## Mutation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Cart Mutation Flow                                 │
//! │                                                                         │
//! │  add_item / remove_item / deduct / clear                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  lock Mutex<Cart> ──► till_core::Cart rule check ──► rejected? ──► Err  │
//! │       │                                              (nothing changed,  │
//! │       ▼                                               nothing written)  │
//! │  store.put("cart", json)     failure is logged, never returned          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  watch::send(CartSnapshot { items, total })                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Mutations are synchronous and serialized by the mutex; there is no
//! await point inside a mutation.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use till_core::{Cart, LineItem, Money};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::ClientResult;
use crate::storage::{KeyValueStore, CART_KEY};

/// What subscribers see after each mutation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CartSnapshot {
    pub items: Vec<LineItem>,
    pub total: Money,
}

impl From<&Cart> for CartSnapshot {
    fn from(cart: &Cart) -> Self {
        CartSnapshot {
            items: cart.items().to_vec(),
            total: cart.total(),
        }
    }
}

pub struct CartManager {
    cart: Mutex<Cart>,
    store: Arc<dyn KeyValueStore>,
    snapshot_tx: watch::Sender<CartSnapshot>,
}

impl CartManager {
    /// Restores the persisted cart. Missing or corrupt data gives an empty
    /// cart.
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let cart = restore_cart(store.as_ref());
        let (snapshot_tx, _) = watch::channel(CartSnapshot::from(&cart));
        CartManager {
            cart: Mutex::new(cart),
            store,
            snapshot_tx,
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn snapshot(&self) -> CartSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<CartSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn items(&self) -> Vec<LineItem> {
        self.lock().items().to_vec()
    }

    pub fn total(&self) -> Money {
        self.lock().total()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Adds `item`, merging quantities by id.
    pub fn add_item(&self, item: LineItem) -> ClientResult<CartSnapshot> {
        let mut cart = self.lock();
        cart.add_item(item)?;
        Ok(self.commit(&cart))
    }

    /// Removes the line with `id`; absent ids are ignored.
    pub fn remove_item(&self, id: i64) -> CartSnapshot {
        let mut cart = self.lock();
        if !cart.remove_item(id) {
            debug!(id, "Remove ignored, item not in cart");
        }
        self.commit(&cart)
    }

    /// Removes the quantities a completed checkout submitted, keeping
    /// anything added since.
    pub fn deduct(&self, submitted: &[LineItem]) -> CartSnapshot {
        let mut cart = self.lock();
        cart.deduct(submitted);
        self.commit(&cart)
    }

    pub fn clear(&self) -> CartSnapshot {
        let mut cart = self.lock();
        cart.clear();
        self.commit(&cart)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn lock(&self) -> MutexGuard<'_, Cart> {
        self.cart
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Persists and publishes. Called with the cart lock held so writes
    /// land in mutation order.
    fn commit(&self, cart: &Cart) -> CartSnapshot {
        match serde_json::to_string(cart.items()) {
            Ok(json) => {
                if let Err(e) = self.store.put(CART_KEY, &json) {
                    warn!(error = %e, "Failed to persist cart");
                }
            }
            Err(e) => warn!(error = %e, "Failed to serialize cart"),
        }

        let snapshot = CartSnapshot::from(cart);
        self.snapshot_tx.send_replace(snapshot.clone());
        snapshot
    }
}

fn restore_cart(store: &dyn KeyValueStore) -> Cart {
    let raw = match store.get(CART_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Cart::new(),
        Err(e) => {
            warn!(error = %e, "Could not read stored cart, starting empty");
            return Cart::new();
        }
    };

    let items: Vec<LineItem> = match serde_json::from_str(&raw) {
        Ok(items) => items,
        Err(e) => {
            warn!(error = %e, "Stored cart is not valid JSON, starting empty");
            return Cart::new();
        }
    };

    Cart::from_items(items).unwrap_or_else(|e| {
        warn!(error = %e, "Stored cart is corrupt, starting empty");
        Cart::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ClientError, ClientResult};
    use crate::storage::MemoryStore;
    use crate::testing::memory_store;

    fn item(id: i64, name: &str, price_major: i64, quantity: i64) -> LineItem {
        LineItem::new(id, name, Money::from_major(price_major), quantity)
    }

    #[test]
    fn test_merge_scenario() {
        let store = memory_store();
        let cart = CartManager::load(store);

        cart.add_item(item(1, "X", 10, 2)).unwrap();
        let snapshot = cart.add_item(item(1, "X", 10, 3)).unwrap();

        assert_eq!(snapshot.items, vec![item(1, "X", 10, 5)]);
        assert_eq!(snapshot.total, Money::from_major(50));
    }

    #[test]
    fn test_every_mutation_is_persisted() {
        let store = memory_store();
        let cart = CartManager::load(store.clone());

        cart.add_item(item(1, "X", 10, 2)).unwrap();
        cart.add_item(item(2, "Y", 3, 1)).unwrap();
        let stored: Vec<LineItem> =
            serde_json::from_str(&store.get(CART_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(stored.len(), 2);

        cart.remove_item(1);
        let stored: Vec<LineItem> =
            serde_json::from_str(&store.get(CART_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(stored, vec![item(2, "Y", 3, 1)]);

        cart.clear();
        assert_eq!(store.get(CART_KEY).unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_restore_round_trip_preserves_order() {
        let store = memory_store();
        {
            let cart = CartManager::load(store.clone());
            for (id, qty) in [(3, 1), (1, 4), (2, 2)] {
                cart.add_item(item(id, "P", 7, qty)).unwrap();
            }
        }

        let restored = CartManager::load(store);
        let ids: Vec<i64> = restored.items().iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
        assert_eq!(restored.total(), Money::from_major(49));
    }

    #[test]
    fn test_corrupt_storage_gives_empty_cart() {
        for raw in [
            "{not json",
            r#"{"items": []}"#,
            r#"[{"id": 1, "name": "X", "price": 1, "quantity": 0}]"#,
            r#"[
                {"id": 1, "name": "X", "price": 1, "quantity": 1},
                {"id": 1, "name": "X", "price": 1, "quantity": 2}
            ]"#,
        ] {
            let store = Arc::new(MemoryStore::new());
            store.put(CART_KEY, raw).unwrap();
            let cart = CartManager::load(store);
            assert!(cart.is_empty(), "expected empty cart for {}", raw);
            assert_eq!(cart.total(), Money::zero());
        }
    }

    #[test]
    fn test_rejected_add_changes_nothing() {
        let store = memory_store();
        let cart = CartManager::load(store.clone());
        cart.add_item(item(1, "X", 10, 2)).unwrap();
        let persisted = store.get(CART_KEY).unwrap();
        let mut rx = cart.subscribe();

        let result: ClientResult<CartSnapshot> = cart.add_item(item(2, "Y", 10, 0));
        assert!(matches!(result, Err(ClientError::Cart(_))));

        assert_eq!(cart.items(), vec![item(1, "X", 10, 2)]);
        assert_eq!(store.get(CART_KEY).unwrap(), persisted);
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_remove_absent_id_is_noop() {
        let cart = CartManager::load(memory_store());
        cart.add_item(item(1, "X", 10, 2)).unwrap();

        let snapshot = cart.remove_item(99);
        assert_eq!(snapshot.items, vec![item(1, "X", 10, 2)]);
        assert_eq!(snapshot.total, Money::from_major(20));
    }

    #[test]
    fn test_subscribers_see_fresh_totals() {
        let cart = CartManager::load(memory_store());
        let mut rx = cart.subscribe();

        cart.add_item(item(1, "X", 10, 2)).unwrap();
        assert_eq!(rx.borrow_and_update().total, Money::from_major(20));

        cart.add_item(item(2, "Y", 5, 1)).unwrap();
        assert_eq!(rx.borrow_and_update().total, Money::from_major(25));

        cart.clear();
        assert_eq!(*rx.borrow_and_update(), CartSnapshot::default());
    }

    #[test]
    fn test_overflowing_add_is_rejected_and_not_persisted() {
        let store = memory_store();
        let cart = CartManager::load(store.clone());
        let huge = Money::from_cents(1_000_000_000_000_000_000);

        let result = cart.add_item(LineItem::new(1, "X", huge, 10));
        assert!(matches!(
            result,
            Err(ClientError::Cart(till_core::CoreError::TotalOverflow))
        ));
        assert!(cart.is_empty());
        assert_eq!(store.get(CART_KEY).unwrap(), None);

        let reloaded = CartManager::load(store);
        assert!(reloaded.is_empty());
    }

    #[test]
    fn test_stored_cart_with_overflowing_total_loads_empty() {
        let store = Arc::new(MemoryStore::new());
        store
            .put(
                CART_KEY,
                r#"[{"id": 1, "name": "X", "price": 1e16, "quantity": 10}]"#,
            )
            .unwrap();

        let cart = CartManager::load(store);
        assert!(cart.is_empty());
        assert_eq!(cart.snapshot(), CartSnapshot::default());
    }

    #[test]
    fn test_deduct_persists_remaining_items() {
        let store = memory_store();
        let cart = CartManager::load(store.clone());
        cart.add_item(item(1, "X", 10, 2)).unwrap();
        let submitted = cart.items();
        cart.add_item(item(2, "Y", 4, 1)).unwrap();

        let snapshot = cart.deduct(&submitted);
        assert_eq!(snapshot.items, vec![item(2, "Y", 4, 1)]);
        assert_eq!(snapshot.total, Money::from_major(4));
        let stored: Vec<LineItem> =
            serde_json::from_str(&store.get(CART_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(stored, snapshot.items);
    }
}
