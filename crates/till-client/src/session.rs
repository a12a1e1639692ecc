//! # Session Manager
//!
//! Owns the bearer token, the identity decoded from it, and the outbound
//! credential header.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Session States                                   │
//! │                                                                         │
//! │                 no stored token / verify fails / decode fails           │
//! │  ┌───────────┐ ─────────────────────────────────────► ┌─────────────┐   │
//! │  │  UNKNOWN  │                                        │  ANONYMOUS  │   │
//! │  └─────┬─────┘                                        └──┬───────▲──┘   │
//! │        │ stored token verified                 login ok  │       │      │
//! │        ▼                                                 ▼       │      │
//! │  ┌─────────────────────────────────────────────────────────────┐ │      │
//! │  │                     AUTHENTICATED                           │─┘      │
//! │  │            token + identity, header installed               │ logout │
//! │  └─────────────────────────────────────────────────────────────┘ 401    │
//! │                                                                  verify │
//! │                                                                  fails  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Overlapping Calls
//! Every `login`, `verify`, `logout` and `invalidate` takes a ticket from a
//! generation counter when it starts. A completion may commit only if no
//! call that started later has already committed, so the last call to
//! START that actually changes the state wins:
//!
//! ```text
//! t0  verify() starts            ticket 1
//! t1  login() starts             ticket 2
//! t2  login() completes          2 > committed(0) → commit Authenticated(T2)
//! t3  verify() completes         1 < committed(2) → discarded
//! ```
//!
//! A call that fails without committing (a rejected login) supersedes
//! nothing: an overlapping verify still lands.
//!
//! A discarded `login` returns [`ClientError::Superseded`]; a discarded
//! `verify` returns whatever state is current.
//!
//! ## Invariant
//! Token and identity live together in [`Session`] and are only built by
//! decoding the token, so one can never exist without the other.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use till_core::{decode_identity, Credentials, Identity, Role, TokenError};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::error::{ClientError, ClientResult};
use crate::storage::{KeyValueStore, TOKEN_KEY};
use crate::transport::BearerToken;

// =============================================================================
// Session State
// =============================================================================

/// A token together with the identity decoded from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    token: BearerToken,
    identity: Identity,
}

impl Session {
    /// Decodes `token`. Fails if the claims do not match the identity schema.
    pub fn from_token(token: BearerToken) -> Result<Self, TokenError> {
        let identity = decode_identity(token.as_str())?;
        Ok(Session { token, identity })
    }

    pub fn token(&self) -> &BearerToken {
        &self.token
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Nothing checked yet.
    #[default]
    Unknown,
    Anonymous,
    Authenticated(Session),
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::Authenticated(session) => Some(session),
            _ => None,
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.session().map(Session::identity)
    }
}

// =============================================================================
// Session Manager
// =============================================================================

pub struct SessionManager {
    api: Arc<ApiClient>,
    store: Arc<dyn KeyValueStore>,
    state_tx: watch::Sender<SessionState>,
    generation: AtomicU64,
    /// Ticket of the newest call that committed. Held while committing.
    committed: Mutex<u64>,
}

impl SessionManager {
    pub fn new(api: Arc<ApiClient>, store: Arc<dyn KeyValueStore>) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Unknown);
        SessionManager {
            api,
            store,
            state_tx,
            generation: AtomicU64::new(0),
            committed: Mutex::new(0),
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn state(&self) -> SessionState {
        self.state_tx.borrow().clone()
    }

    /// Receives every state transition.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state_tx.borrow().is_authenticated()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.state_tx.borrow().identity().cloned()
    }

    /// The signed-in identity if its role is in `allowed`.
    pub fn require_role(&self, allowed: &[Role]) -> ClientResult<Identity> {
        let identity = self.identity().ok_or(ClientError::NotAuthenticated)?;
        if identity.has_role(allowed) {
            Ok(identity)
        } else {
            Err(ClientError::Forbidden(format!(
                "{} role cannot access this",
                identity.role
            )))
        }
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Startup path: restores the persisted token if the server still
    /// accepts it.
    pub async fn restore(&self) -> SessionState {
        let state = self.verify().await;
        match &state {
            SessionState::Authenticated(session) => info!(
                subject_id = session.identity().subject_id,
                role = %session.identity().role,
                "Session restored"
            ),
            _ => debug!("No session to restore"),
        }
        state
    }

    /// Re-validates the persisted token against the server.
    ///
    /// Any failure (missing, undecodable or expired token, server
    /// rejection, network error) clears the session. Returns the state
    /// after the call.
    pub async fn verify(&self) -> SessionState {
        let ticket = self.begin();

        let token = match self.store.get(TOKEN_KEY) {
            Ok(Some(token)) if !token.trim().is_empty() => BearerToken::new(token),
            Ok(_) => {
                self.commit_cleared(ticket);
                return self.state();
            }
            Err(e) => {
                warn!(error = %e, "Could not read stored token");
                self.commit_cleared(ticket);
                return self.state();
            }
        };

        let session = match Session::from_token(token) {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "Stored token is undecodable, discarding");
                self.commit_cleared(ticket);
                return self.state();
            }
        };

        if session.identity().is_expired(Utc::now()) {
            info!("Stored token has expired, discarding");
            self.commit_cleared(ticket);
            return self.state();
        }

        match self.api.verify(session.token()).await {
            Ok(()) => match self.claim(ticket) {
                Some(mut committed) => {
                    self.api.install_credential(session.token().clone());
                    self.state_tx.send_replace(SessionState::Authenticated(session));
                    *committed = ticket;
                }
                None => debug!(ticket, "Verify superseded, result discarded"),
            },
            Err(e) => {
                warn!(error = %e, "Token verification failed, clearing session");
                self.commit_cleared(ticket);
            }
        }

        self.state()
    }

    /// Exchanges credentials for a session.
    ///
    /// On failure the state is unchanged, except that an undecodable token
    /// from the server clears the session. Persisting the token and
    /// installing the header happen together or not at all.
    pub async fn login(&self, credentials: &Credentials) -> ClientResult<Identity> {
        let ticket = self.begin();

        let token = self.api.login(credentials).await?;

        let session = match Session::from_token(token) {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "Login returned an undecodable token");
                if !self.commit_cleared(ticket) {
                    return Err(ClientError::Superseded);
                }
                return Err(e.into());
            }
        };

        let Some(mut committed) = self.claim(ticket) else {
            debug!(ticket, "Login superseded, result discarded");
            return Err(ClientError::Superseded);
        };

        self.store.put(TOKEN_KEY, session.token().as_str())?;
        self.api.install_credential(session.token().clone());

        let identity = session.identity().clone();
        self.state_tx.send_replace(SessionState::Authenticated(session));
        *committed = ticket;
        drop(committed);

        info!(
            subject_id = identity.subject_id,
            role = %identity.role,
            "Logged in"
        );
        Ok(identity)
    }

    /// Signs out. Local state clears first and unconditionally; the server
    /// is then notified on a best-effort basis.
    pub async fn logout(&self) {
        let ticket = self.begin();

        let token = self
            .state_tx
            .borrow()
            .session()
            .map(|s| s.token().clone())
            .or_else(|| self.api.credential());

        self.commit_cleared(ticket);
        info!("Logged out");

        if let Some(token) = token {
            if let Err(e) = self.api.logout(&token).await {
                warn!(error = %e, "Server-side logout failed");
            }
        }
    }

    /// Drops the session after another call was rejected with 401.
    pub fn invalidate(&self) {
        let ticket = self.begin();
        if self.commit_cleared(ticket) {
            info!("Session invalidated");
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn begin(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Locks the commit slot for `ticket`, unless a call that started
    /// later has already committed. The caller records `ticket` in the
    /// guard once its change is applied.
    fn claim(&self, ticket: u64) -> Option<MutexGuard<'_, u64>> {
        let committed = self
            .committed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        (ticket > *committed).then_some(committed)
    }

    /// Clears token, header and state unless superseded. Returns whether
    /// it did.
    fn commit_cleared(&self, ticket: u64) -> bool {
        let Some(mut committed) = self.claim(ticket) else {
            return false;
        };

        if let Err(e) = self.store.remove(TOKEN_KEY) {
            warn!(error = %e, "Failed to remove stored token");
        }
        self.api.clear_credential();
        self.state_tx.send_replace(SessionState::Anonymous);
        *committed = ticket;
        true
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthSettings;
    use crate::storage::MemoryStore;
    use crate::testing::{memory_store, mint_token, mint_token_with_exp, ScriptedTransport};
    use serde_json::json;

    struct Fixture {
        transport: Arc<ScriptedTransport>,
        store: Arc<MemoryStore>,
        api: Arc<ApiClient>,
        session: SessionManager,
    }

    fn fixture() -> Fixture {
        let transport = ScriptedTransport::new();
        let store = memory_store();
        let api = Arc::new(ApiClient::new(transport.clone(), AuthSettings::default()));
        let session = SessionManager::new(api.clone(), store.clone());
        Fixture {
            transport,
            store,
            api,
            session,
        }
    }

    /// Token present in state iff identity present, and header matches.
    fn assert_consistent(f: &Fixture) {
        match f.session.state() {
            SessionState::Authenticated(s) => {
                assert_eq!(f.api.credential().as_ref(), Some(s.token()));
                assert_eq!(
                    f.store.get(TOKEN_KEY).unwrap().as_deref(),
                    Some(s.token().as_str())
                );
            }
            _ => {
                assert!(f.session.identity().is_none());
                assert!(f.api.credential().is_none());
            }
        }
    }

    #[tokio::test]
    async fn test_login_authenticates_and_persists() {
        let f = fixture();
        let token = mint_token(1, Role::Cashier, "a");
        f.transport.reply(200, json!({"token": token}));

        let identity = f
            .session
            .login(&Credentials::new("a@b.com", "pw123456"))
            .await
            .unwrap();

        assert_eq!(identity.role, Role::Cashier);
        assert!(f.session.is_authenticated());
        assert_eq!(f.store.get(TOKEN_KEY).unwrap(), Some(token.clone()));
        assert_eq!(f.api.credential(), Some(BearerToken::new(token)));
        assert_consistent(&f);
    }

    #[tokio::test]
    async fn test_failed_login_leaves_state_unchanged() {
        let f = fixture();
        f.transport.reply(401, json!({"message": "Invalid credentials"}));

        let err = f
            .session
            .login(&Credentials::new("a@b.com", "wrong-password"))
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Unauthorized));
        assert_eq!(f.session.state(), SessionState::Unknown);
        assert_eq!(f.store.get(TOKEN_KEY).unwrap(), None);
        assert_consistent(&f);
    }

    #[tokio::test]
    async fn test_undecodable_login_token_clears_session() {
        let f = fixture();
        f.transport.reply(200, json!({"token": "T1"}));

        let err = f
            .session
            .login(&Credentials::new("a@b.com", "pw123456"))
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::MalformedToken(_)));
        assert_eq!(f.session.state(), SessionState::Anonymous);
        assert_eq!(f.store.get(TOKEN_KEY).unwrap(), None);
        assert_consistent(&f);
    }

    #[tokio::test]
    async fn test_logout_clears_even_when_server_fails() {
        let f = fixture();
        let token = mint_token(1, Role::Manager, "m");
        f.transport.reply(200, json!({"token": token}));
        f.session
            .login(&Credentials::new("a@b.com", "pw123456"))
            .await
            .unwrap();

        f.transport.fail_network();
        f.session.logout().await;

        assert_eq!(f.session.state(), SessionState::Anonymous);
        assert_eq!(f.store.get(TOKEN_KEY).unwrap(), None);
        assert_consistent(&f);

        let notify = f.transport.last_request();
        assert_eq!(notify.path, "/auth/logout");
        assert_eq!(notify.bearer, Some(BearerToken::new(token)));
    }

    #[tokio::test]
    async fn test_restore_without_token_is_anonymous() {
        let f = fixture();
        assert_eq!(f.session.restore().await, SessionState::Anonymous);
        assert!(f.transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_restore_verifies_stored_token() {
        let f = fixture();
        let token = mint_token(4, Role::Admin, "root");
        f.store.put(TOKEN_KEY, &token).unwrap();
        f.transport.reply(200, json!({"valid": true}));

        let state = f.session.restore().await;
        assert_eq!(state.identity().unwrap().subject_id, 4);
        assert_eq!(f.transport.last_request().path, "/auth/verify");
        assert_consistent(&f);
    }

    #[tokio::test]
    async fn test_restore_rejected_token_is_discarded() {
        let f = fixture();
        f.store
            .put(TOKEN_KEY, &mint_token(4, Role::Admin, "root"))
            .unwrap();
        f.transport.reply(401, json!({"message": "Token has been revoked"}));

        assert_eq!(f.session.restore().await, SessionState::Anonymous);
        assert_eq!(f.store.get(TOKEN_KEY).unwrap(), None);
        assert_consistent(&f);
    }

    #[tokio::test]
    async fn test_restore_garbage_or_expired_token_skips_server() {
        let f = fixture();
        f.store.put(TOKEN_KEY, "not.a.jwt").unwrap();
        assert_eq!(f.session.restore().await, SessionState::Anonymous);

        f.store
            .put(TOKEN_KEY, &mint_token_with_exp(1, Role::Cashier, "c", 1_000))
            .unwrap();
        assert_eq!(f.session.verify().await, SessionState::Anonymous);

        assert!(f.transport.requests().is_empty());
        assert_eq!(f.store.get(TOKEN_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_later_login_wins_over_earlier_login() {
        let f = fixture();
        let slow = mint_token(1, Role::Cashier, "slow");
        let fast = mint_token(2, Role::Manager, "fast");
        let release = f.transport.reply_gated(200, json!({"token": slow}));
        f.transport.reply(200, json!({"token": fast}));

        let creds = Credentials::new("a@b.com", "pw123456");
        let (first, second) = tokio::join!(f.session.login(&creds), async {
            let result = f.session.login(&creds).await;
            let _ = release.send(());
            result
        });

        assert!(matches!(first, Err(ClientError::Superseded)));
        assert_eq!(second.unwrap().subject_id, 2);
        assert_eq!(f.session.identity().unwrap().subject_id, 2);
        assert_eq!(f.store.get(TOKEN_KEY).unwrap(), Some(fast));
        assert_consistent(&f);
    }

    #[tokio::test]
    async fn test_stale_verify_does_not_clobber_login() {
        let f = fixture();
        f.store
            .put(TOKEN_KEY, &mint_token(1, Role::Cashier, "old"))
            .unwrap();
        let release = f.transport.reply_gated(401, json!({"message": "expired"}));
        let fresh = mint_token(2, Role::Cashier, "new");
        f.transport.reply(200, json!({"token": fresh}));

        let creds = Credentials::new("a@b.com", "pw123456");
        let (verified, logged_in) = tokio::join!(f.session.verify(), async {
            let result = f.session.login(&creds).await;
            let _ = release.send(());
            result
        });

        assert!(logged_in.is_ok());
        assert_eq!(verified.identity().unwrap().subject_id, 2);
        assert_eq!(f.store.get(TOKEN_KEY).unwrap(), Some(fresh));
        assert_consistent(&f);
    }

    #[tokio::test]
    async fn test_rejected_login_does_not_cancel_verify() {
        let f = fixture();
        let stored = mint_token(3, Role::Manager, "kept");
        f.store.put(TOKEN_KEY, &stored).unwrap();
        let release = f.transport.reply_gated(200, json!({"valid": true}));
        f.transport.reply(401, json!({"message": "Invalid credentials"}));

        let creds = Credentials::new("a@b.com", "wrong-password");
        let (verified, logged_in) = tokio::join!(f.session.verify(), async {
            let result = f.session.login(&creds).await;
            let _ = release.send(());
            result
        });

        assert!(matches!(logged_in, Err(ClientError::Unauthorized)));
        assert_eq!(verified.identity().unwrap().subject_id, 3);
        assert_eq!(f.session.identity().unwrap().subject_id, 3);
        assert_eq!(f.store.get(TOKEN_KEY).unwrap(), Some(stored));
        assert_consistent(&f);
    }

    #[tokio::test]
    async fn test_earlier_login_finishing_first_is_overwritten() {
        let f = fixture();
        let release_first = f
            .transport
            .reply_gated(200, json!({"token": mint_token(1, Role::Cashier, "first")}));
        let release_second = f
            .transport
            .reply_gated(200, json!({"token": mint_token(2, Role::Cashier, "second")}));

        let creds = Credentials::new("a@b.com", "pw123456");
        let (first, second, ()) = tokio::join!(
            f.session.login(&creds),
            f.session.login(&creds),
            async {
                let _ = release_first.send(());
                while !f.session.is_authenticated() {
                    tokio::task::yield_now().await;
                }
                let _ = release_second.send(());
            }
        );

        assert_eq!(first.unwrap().subject_id, 1);
        assert_eq!(second.unwrap().subject_id, 2);
        assert_eq!(f.session.identity().unwrap().subject_id, 2);
        assert_consistent(&f);
    }

    #[tokio::test]
    async fn test_require_role() {
        let f = fixture();
        assert!(matches!(
            f.session.require_role(&[Role::Admin]),
            Err(ClientError::NotAuthenticated)
        ));

        f.transport
            .reply(200, json!({"token": mint_token(1, Role::Cashier, "c")}));
        f.session
            .login(&Credentials::new("cashier1", "pw123456"))
            .await
            .unwrap();

        assert!(matches!(
            f.session.require_role(&[Role::Admin]),
            Err(ClientError::Forbidden(_))
        ));
        assert!(f.session.require_role(&[Role::Admin, Role::Cashier]).is_ok());
    }

    #[tokio::test]
    async fn test_invalidate_and_subscribe() {
        let f = fixture();
        let mut rx = f.session.subscribe();
        f.transport
            .reply(200, json!({"token": mint_token(1, Role::Cashier, "c")}));
        f.session
            .login(&Credentials::new("cashier1", "pw123456"))
            .await
            .unwrap();
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_authenticated());

        f.session.invalidate();
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), SessionState::Anonymous);
        assert_consistent(&f);
    }
}
