//! Test doubles shared by the unit tests in this crate.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;
use till_core::Role;
use tokio::sync::oneshot;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::storage::MemoryStore;
use crate::transport::{ApiRequest, ApiResponse, ApiTransport};

enum Reply {
    Ready(ApiResponse),
    Gated(oneshot::Receiver<()>, ApiResponse),
    NetworkDown,
}

/// Replays queued responses in order and records every request.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn reply(&self, status: u16, body: serde_json::Value) {
        self.push(Reply::Ready(ApiResponse::new(status, body.to_string())));
    }

    pub(crate) fn reply_raw(&self, status: u16, body: &str) {
        self.push(Reply::Ready(ApiResponse::new(status, body)));
    }

    /// Queues a reply that is held back until the returned sender fires.
    pub(crate) fn reply_gated(&self, status: u16, body: serde_json::Value) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.push(Reply::Gated(rx, ApiResponse::new(status, body.to_string())));
        tx
    }

    pub(crate) fn fail_network(&self) {
        self.push(Reply::NetworkDown);
    }

    pub(crate) fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn last_request(&self) -> ApiRequest {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no request was sent")
    }

    fn push(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(reply);
    }
}

#[async_trait]
impl ApiTransport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> ClientResult<ApiResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("no scripted reply for {} {}", request.method, request.path));

        match reply {
            Reply::Ready(response) => Ok(response),
            Reply::Gated(gate, response) => {
                let _ = gate.await;
                Ok(response)
            }
            Reply::NetworkDown => Err(ClientError::Network("connection refused".into())),
        }
    }
}

/// Signs a token the way the backend does: identity object as `sub`.
pub(crate) fn mint_token(id: i64, role: Role, username: &str) -> String {
    mint_token_with_exp(id, role, username, 4_102_444_800) // 2100-01-01
}

pub(crate) fn mint_token_with_exp(id: i64, role: Role, username: &str, exp: i64) -> String {
    encode(
        &Header::default(),
        &json!({
            "sub": {"id": id, "role": role.as_str(), "username": username},
            "exp": exp,
        }),
        &EncodingKey::from_secret(b"backend-secret"),
    )
    .unwrap()
}

pub(crate) fn memory_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new())
}

pub(crate) fn test_config() -> ClientConfig {
    let mut config = ClientConfig::default();
    config.notifications.dismiss_after_ms = 50;
    config
}
