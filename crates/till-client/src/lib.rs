//! # till-client: Session, Cart and REST Access for the Till POS Client
//!
//! This crate owns every side effect of the client: HTTP calls to the POS
//! backend, the persisted token and cart, and the state views subscribe to.
//!
//! ## Component Wiring
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              Till                                       │
//! │                                                                         │
//! │   ┌────────────────┐   ┌────────────────┐   ┌────────────────┐          │
//! │   │ SessionManager │   │  CartManager   │   │    Notifier    │          │
//! │   │ watch<Session> │   │ watch<Snapshot>│   │ watch<Option<  │          │
//! │   │                │   │                │   │  Notification>>│          │
//! │   └───┬───────┬────┘   └───────┬────────┘   └────────────────┘          │
//! │       │       │                │                                        │
//! │       │       └──────┬─────────┘                                        │
//! │       ▼              ▼                                                  │
//! │   ┌──────────┐  ┌─────────────────────┐                                 │
//! │   │ApiClient │  │ KeyValueStore       │                                 │
//! │   │+ bearer  │  │ "token" │ "cart"    │                                 │
//! │   └────┬─────┘  └─────────────────────┘                                 │
//! │        ▼                                                                │
//! │   dyn ApiTransport (HttpTransport in production)                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The facade adds the cross-cutting rules: a 401 from any call clears the
//! session, failures post an error notification, and a successful checkout
//! takes the submitted items out of the cart.
//!
//! ## Example
//! ```rust,no_run
//! use till_client::{ClientConfig, Till};
//! use till_core::Credentials;
//!
//! # async fn run() -> till_client::ClientResult<()> {
//! let till = Till::from_config(ClientConfig::load(None)?)?;
//! till.start().await;
//!
//! till.login(&Credentials::new("cashier1", "pw123456")).await?;
//! let products = till.products().await?;
//! till.add_to_cart(&products[0], 2)?;
//! till.checkout().await?;
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::sync::Arc;

use till_core::{
    AuditLogPage, CheckoutReceipt, Credentials, Customer, CustomerCreated, DashboardStats,
    Identity, InventorySummary, LineItem, MpesaPaymentRequest, NewCustomer, NewProduct, Product,
    ProductCreated, Role, SalesReport, SalesReportQuery, SignupReceipt, SignupRequest,
};
use tracing::info;

pub mod api;
pub mod cart;
pub mod config;
pub mod error;
pub mod notify;
pub mod session;
pub mod storage;
pub mod transport;

#[cfg(test)]
mod testing;

pub use api::{ApiClient, DEFAULT_PER_PAGE};
pub use cart::{CartManager, CartSnapshot};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use notify::{Notification, Notifier, Severity};
pub use session::{Session, SessionManager, SessionState};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use transport::{ApiTransport, BearerToken, HttpTransport};

// =============================================================================
// User-Facing Messages
// =============================================================================

pub const MSG_WELCOME: &str = "Welcome back!";
pub const MSG_SIGNUP: &str = "Account created successfully! Please log in.";
pub const MSG_CHECKOUT: &str = "Checkout successful!";
pub const MSG_PAYMENT: &str = "Payment initiated successfully! Check your phone to complete";

// =============================================================================
// Till Facade
// =============================================================================

/// The client's owned state, wired together.
pub struct Till {
    config: ClientConfig,
    api: Arc<ApiClient>,
    session: SessionManager,
    cart: CartManager,
    notifier: Notifier,
}

impl Till {
    /// Wires the managers over any transport and store.
    pub fn new(
        config: ClientConfig,
        transport: Arc<dyn ApiTransport>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        let api = Arc::new(ApiClient::new(transport, config.auth.clone()));
        let session = SessionManager::new(Arc::clone(&api), Arc::clone(&store));
        let cart = CartManager::load(store);
        let notifier = Notifier::new(config.dismiss_after());

        Till {
            config,
            api,
            session,
            cart,
            notifier,
        }
    }

    /// Production wiring: reqwest transport and a file store in the data dir.
    pub fn from_config(config: ClientConfig) -> ClientResult<Self> {
        let transport = Arc::new(HttpTransport::new(&config)?);
        let store = Arc::new(FileStore::open(config.data_dir()?)?);
        info!(api = %config.api.base_url, data_dir = %store.dir().display(), "Till client ready");
        Ok(Self::new(config, transport, store))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn cart(&self) -> &CartManager {
        &self.cart
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Startup: restores the persisted session.
    pub async fn start(&self) -> SessionState {
        self.session.restore().await
    }

    // =========================================================================
    // Session
    // =========================================================================

    pub async fn login(&self, credentials: &Credentials) -> ClientResult<Identity> {
        match self.session.login(credentials).await {
            Ok(identity) => {
                self.notifier.success(MSG_WELCOME);
                Ok(identity)
            }
            Err(e) => {
                self.notifier.error(e.user_message());
                Err(e)
            }
        }
    }

    pub async fn logout(&self) {
        self.session.logout().await;
    }

    pub async fn signup(&self, request: &SignupRequest) -> ClientResult<SignupReceipt> {
        let receipt = self.call(self.api.signup(request)).await?;
        self.notifier.success(MSG_SIGNUP);
        Ok(receipt)
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    pub async fn products(&self) -> ClientResult<Vec<Product>> {
        self.call(async {
            self.require_session()?;
            self.api.products().await
        })
        .await
    }

    pub async fn search_products(&self, query: &str) -> ClientResult<Vec<Product>> {
        self.call(async {
            self.require_session()?;
            self.api.search_products(query).await
        })
        .await
    }

    pub async fn create_product(&self, product: &NewProduct) -> ClientResult<ProductCreated> {
        self.call(async {
            self.require_session()?;
            self.api.create_product(product).await
        })
        .await
    }

    pub async fn inventory(&self) -> ClientResult<InventorySummary> {
        self.call(async {
            self.require_session()?;
            self.api.inventory().await
        })
        .await
    }

    // =========================================================================
    // Cart & Checkout
    // =========================================================================

    /// Adds `quantity` of `product` at its listed price.
    pub fn add_to_cart(&self, product: &Product, quantity: i64) -> ClientResult<CartSnapshot> {
        let item = LineItem::new(product.id, product.name.clone(), product.price, quantity);
        self.cart.add_item(item).map_err(|e| {
            self.notifier.error(e.user_message());
            e
        })
    }

    /// Submits the cart. Once the server accepts the sale, the submitted
    /// quantities leave the cart; lines added meanwhile stay.
    pub async fn checkout(&self) -> ClientResult<CheckoutReceipt> {
        let items = self.cart.items();
        let receipt = self
            .call(async {
                self.require_session()?;
                if items.is_empty() {
                    return Err(ClientError::EmptyCart);
                }
                self.api.checkout(&items).await
            })
            .await?;

        self.cart.deduct(&items);
        info!(transaction_id = ?receipt.transaction_id, "Checkout complete");
        self.notifier.success(MSG_CHECKOUT);
        Ok(receipt)
    }

    pub async fn mpesa_payment(&self, request: &MpesaPaymentRequest) -> ClientResult<()> {
        self.call(async {
            self.require_session()?;
            self.api.mpesa_payment(request).await
        })
        .await?;

        self.notifier.success(MSG_PAYMENT);
        Ok(())
    }

    pub async fn sales_report(&self, query: &SalesReportQuery) -> ClientResult<SalesReport> {
        self.call(async {
            self.require_session()?;
            self.api.sales_report(query).await
        })
        .await
    }

    // =========================================================================
    // Customers
    // =========================================================================

    pub async fn customers(&self) -> ClientResult<Vec<Customer>> {
        self.call(async {
            self.require_session()?;
            self.api.customers().await
        })
        .await
    }

    pub async fn add_customer(&self, customer: &NewCustomer) -> ClientResult<CustomerCreated> {
        self.call(async {
            self.require_session()?;
            self.api.add_customer(customer).await
        })
        .await
    }

    // =========================================================================
    // Admin
    // =========================================================================

    pub async fn dashboard(&self) -> ClientResult<DashboardStats> {
        self.call(async {
            self.session.require_role(&[Role::Admin])?;
            self.api.dashboard().await
        })
        .await
    }

    pub async fn audit_logs(&self, page: u32, per_page: u32) -> ClientResult<AuditLogPage> {
        self.call(async {
            self.session.require_role(&[Role::Admin])?;
            self.api.audit_logs(page, per_page).await
        })
        .await
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn require_session(&self) -> ClientResult<Identity> {
        self.session.require_role(&Role::ALL)
    }

    /// Runs an endpoint call and applies the cross-cutting failure rules.
    async fn call<T, F>(&self, call: F) -> ClientResult<T>
    where
        F: Future<Output = ClientResult<T>>,
    {
        let result = call.await;
        if let Err(e) = &result {
            if matches!(e, ClientError::Unauthorized) {
                self.session.invalidate();
            }
            self.notifier.error(e.user_message());
        }
        result
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
