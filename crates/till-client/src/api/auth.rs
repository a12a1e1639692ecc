//! Authentication endpoints.
//!
//! Paths for login, verify and logout come from `[auth]` in the config;
//! signup is always `/auth/signup`.

use serde_json::Value;
use till_core::{Credentials, LoginResponse, SignupReceipt, SignupRequest};
use tracing::debug;

use super::ApiClient;
use crate::error::{ClientError, ClientResult};
use crate::transport::{ApiRequest, BearerToken};

impl ApiClient {
    /// Exchanges credentials for a bearer token.
    pub async fn login(&self, credentials: &Credentials) -> ClientResult<BearerToken> {
        credentials.validate()?;

        let response: LoginResponse = self.post(&self.auth_paths.login_path, credentials).await?;
        if response.token.trim().is_empty() {
            return Err(ClientError::MalformedResponse(
                "login response carried an empty token".into(),
            ));
        }
        debug!(identifier = %credentials.identifier, "Login accepted");
        Ok(BearerToken::new(response.token))
    }

    /// Asks the server whether `token` is still valid.
    pub async fn verify(&self, token: &BearerToken) -> ClientResult<()> {
        let request =
            ApiRequest::get(self.auth_paths.verify_path.as_str()).with_bearer(token.clone());
        self.execute(request).await?;
        Ok(())
    }

    /// Tells the server to invalidate `token`.
    pub async fn logout(&self, token: &BearerToken) -> ClientResult<()> {
        let body = Value::Object(Default::default());
        let request = ApiRequest::post(self.auth_paths.logout_path.as_str(), body)
            .with_bearer(token.clone());
        self.execute(request).await?;
        Ok(())
    }

    /// Registers a new cashier or manager account.
    pub async fn signup(&self, request: &SignupRequest) -> ClientResult<SignupReceipt> {
        request.validate()?;
        self.post("/auth/signup", request).await
    }
}
