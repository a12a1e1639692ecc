//! # HTTP Transport
//!
//! The seam between typed endpoints and the wire.
//!
//! ## Request Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Request Path                                     │
//! │                                                                         │
//! │  ApiClient::get/post                                                    │
//! │       │  ApiRequest { method, path, query, body, bearer }               │
//! │       ▼                                                                 │
//! │  dyn ApiTransport ──────────────┬──────────────────────────┐            │
//! │       │                         │                          │            │
//! │       ▼                         ▼                          ▼            │
//! │  HttpTransport             ScriptedTransport          (your own)        │
//! │  reqwest + timeout         tests: queued replies                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ApiResponse { status, body }   (status mapping happens in ApiClient)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

// =============================================================================
// Bearer Token
// =============================================================================

/// An opaque bearer credential. `Debug` never prints it.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        BearerToken(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BearerToken(<{} bytes>)", self.0.len())
    }
}

// =============================================================================
// Request / Response
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
        }
    }
}

/// A request relative to the configured base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Overrides the client's installed credential when set.
    pub bearer: Option<BearerToken>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        ApiRequest {
            method: Method::Get,
            path: path.into(),
            query: Vec::new(),
            body: None,
            bearer: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        ApiRequest {
            method: Method::Post,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
            bearer: None,
        }
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn with_bearer(mut self, token: BearerToken) -> Self {
        self.bearer = Some(token);
        self
    }
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        ApiResponse {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one request and returns whatever status came back.
///
/// Implementations only fail for transport problems; HTTP error statuses
/// are returned as responses.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> ClientResult<ApiResponse>;
}

// =============================================================================
// reqwest Implementation
// =============================================================================

pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ClientError::Config(format!("HTTP client: {}", e)))?;

        Ok(HttpTransport {
            client,
            base_url: config.api.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Appends `path` to the base URL, keeping any base path prefix.
    fn endpoint_url(&self, request: &ApiRequest) -> ClientResult<Url> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, request.path))?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }
        Ok(url)
    }
}

#[async_trait]
impl ApiTransport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> ClientResult<ApiResponse> {
        let url = self.endpoint_url(&request)?;
        debug!(method = %request.method, url = %url, "Sending request");

        let mut builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
        };
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        debug!(status, bytes = body.len(), "Received response");
        Ok(ApiResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(base: &str) -> HttpTransport {
        let mut config = ClientConfig::default();
        config.api.base_url = base.to_string();
        HttpTransport::new(&config).unwrap()
    }

    #[test]
    fn test_endpoint_url_keeps_base_path() {
        let t = transport("https://pos.example.com/api/");
        let url = t.endpoint_url(&ApiRequest::get("/products")).unwrap();
        assert_eq!(url.as_str(), "https://pos.example.com/api/products");
    }

    #[test]
    fn test_endpoint_url_encodes_query() {
        let t = transport("http://127.0.0.1:5000");
        let request = ApiRequest::get("/reports/sales").with_query(vec![(
            "start_date".to_string(),
            "2024-03-01T00:00:00+00:00".to_string(),
        )]);
        let url = t.endpoint_url(&request).unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:5000/reports/sales?start_date=2024-03-01T00%3A00%3A00%2B00%3A00"
        );
    }

    #[test]
    fn test_bearer_debug_is_redacted() {
        let token = BearerToken::new("secret.jwt.value");
        let debug = format!("{:?}", token);
        assert!(!debug.contains("secret"));
        assert_eq!(token.as_str(), "secret.jwt.value");
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let mut config = ClientConfig::default();
        config.api.base_url = "mailto:ops@example.com".to_string();
        assert!(HttpTransport::new(&config).is_err());
    }
}
