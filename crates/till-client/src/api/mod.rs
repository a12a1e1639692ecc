//! # Typed REST Endpoints
//!
//! `ApiClient` owns the transport and the outbound credential; each
//! submodule adds the endpoints of one area as `impl ApiClient` blocks.
//!
//! ## Endpoint Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Endpoint Map                                    │
//! │                                                                         │
//! │  auth       POST {login}  GET {verify}  POST {logout}  POST /auth/signup│
//! │  catalog    GET/POST /products          GET /inventory-monitoring       │
//! │  sales      POST /checkout              GET /reports/sales              │
//! │  payments   POST /payments/mpesa                                        │
//! │  customers  GET /customers              POST /addcustomer               │
//! │  admin      GET /admin/dashboard        GET /audit-logs                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Status Mapping
//! 2xx decodes the body; everything else goes through
//! [`ClientError::from_response`] (401 → `Unauthorized`, 403 → `Forbidden`,
//! 400/422 with a field map → `Validation`, the rest → `Http`).

mod admin;
mod auth;
mod catalog;
mod customers;
mod payments;
mod sales;

use std::sync::{Arc, RwLock};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::config::AuthSettings;
use crate::error::{ClientError, ClientResult};
use crate::transport::{ApiRequest, ApiResponse, ApiTransport, BearerToken};

pub use sales::CheckoutRequest;

/// Default page size for the audit log.
pub const DEFAULT_PER_PAGE: u32 = 10;

pub struct ApiClient {
    transport: Arc<dyn ApiTransport>,
    auth_paths: AuthSettings,
    credential: RwLock<Option<BearerToken>>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn ApiTransport>, auth_paths: AuthSettings) -> Self {
        ApiClient {
            transport,
            auth_paths,
            credential: RwLock::new(None),
        }
    }

    // =========================================================================
    // Outbound Credential
    // =========================================================================

    /// Attaches `token` to every subsequent request.
    pub fn install_credential(&self, token: BearerToken) {
        match self.credential.write() {
            Ok(mut guard) => *guard = Some(token),
            Err(poisoned) => *poisoned.into_inner() = Some(token),
        }
    }

    pub fn clear_credential(&self) {
        match self.credential.write() {
            Ok(mut guard) => *guard = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }

    pub fn credential(&self) -> Option<BearerToken> {
        match self.credential.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    // =========================================================================
    // Request Helpers
    // =========================================================================

    /// Sends the request and maps non-2xx statuses to errors.
    pub(crate) async fn execute(&self, mut request: ApiRequest) -> ClientResult<ApiResponse> {
        if request.bearer.is_none() {
            request.bearer = self.credential();
        }

        let method = request.method;
        let path = request.path.clone();
        let response = self.transport.send(request).await?;

        if response.is_success() {
            Ok(response)
        } else {
            let err = ClientError::from_response(response.status, &response.body);
            warn!(%method, path = %path, status = response.status, "Request failed");
            Err(err)
        }
    }

    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Vec<(String, String)>,
    ) -> ClientResult<T> {
        let response = self.execute(ApiRequest::get(path).with_query(query)).await?;
        decode(&response)
    }

    pub(crate) async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        let body = serde_json::to_value(body)?;
        let response = self.execute(ApiRequest::post(path, body)).await?;
        decode(&response)
    }
}

/// Decodes a success body. An empty body decodes as JSON `null`.
fn decode<T: DeserializeOwned>(response: &ApiResponse) -> ClientResult<T> {
    let body = if response.body.trim().is_empty() {
        "null"
    } else {
        response.body.as_str()
    };
    serde_json::from_str(body).map_err(|e| ClientError::MalformedResponse(e.to_string()))
}
