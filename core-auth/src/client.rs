//! Authorized client handle returned by the [`Authorizer`](crate::Authorizer).
//!
//! Downstream Docs/Drive clients use it to obtain bearer tokens. Expired
//! access tokens are refreshed in memory; the token file on disk is left
//! untouched.

use crate::error::{AuthError, Result};
use crate::oauth::{OAuthConfig, OAuthFlowManager};
use crate::types::{ClientIdentity, TokenRecord};
use bridge_traits::http::{HttpClient, HttpRequest};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

/// Seconds before expiry at which a cached access token is no longer handed out.
const EXPIRY_BUFFER_SECS: i64 = 300;

/// OAuth client bound to one identity's secrets and its current tokens.
pub struct AuthorizedClient {
    identity: ClientIdentity,
    flow: OAuthFlowManager,
    tokens: Mutex<TokenRecord>,
}

impl AuthorizedClient {
    pub fn new(
        identity: ClientIdentity,
        tokens: TokenRecord,
        http_client: Arc<dyn HttpClient>,
    ) -> Self {
        let flow = OAuthFlowManager::new(OAuthConfig::for_identity(&identity), http_client);
        Self {
            identity,
            flow,
            tokens: Mutex::new(tokens),
        }
    }

    pub fn identity(&self) -> &ClientIdentity {
        &self.identity
    }

    /// Identity name, `None` for the default identity
    pub fn name(&self) -> Option<&str> {
        self.identity.name()
    }

    /// Snapshot of the current tokens.
    pub async fn credentials(&self) -> TokenRecord {
        self.tokens.lock().await.clone()
    }

    /// Replace the in-memory tokens.
    pub async fn set_credentials(&self, tokens: TokenRecord) {
        *self.tokens.lock().await = tokens;
    }

    /// A valid access token, refreshing it first if it is missing or close to expiry.
    ///
    /// Concurrent callers share one refresh: the token lock is held for the
    /// duration of the request.
    ///
    /// # Errors
    ///
    /// - [`AuthError::NotAuthenticated`] if there is no valid access token and
    ///   no refresh token to obtain one
    /// - [`AuthError::TokenRefreshFailed`] if the token endpoint rejects the refresh
    #[instrument(skip(self), fields(identity = crate::types::identity_label(self.name())))]
    pub async fn access_token(&self) -> Result<String> {
        let mut tokens = self.tokens.lock().await;

        if !tokens.is_expired_with_buffer(EXPIRY_BUFFER_SECS) {
            if let Some(access_token) = tokens.access_token.clone() {
                return Ok(access_token);
            }
        }

        let refresh_token = match tokens.refresh_token.as_deref() {
            Some(token) if !token.is_empty() => token.to_string(),
            _ => return Err(AuthError::NotAuthenticated),
        };

        debug!("Access token missing or expiring, refreshing");
        let refreshed = self.flow.refresh_access_token(&refresh_token).await?;
        let access_token = refreshed
            .access_token
            .clone()
            .ok_or_else(|| AuthError::TokenRefreshFailed("No access token returned".to_string()))?;

        *tokens = refreshed;
        Ok(access_token)
    }

    /// Attach `Authorization: Bearer <token>` to a request.
    pub async fn authorize_request(&self, request: HttpRequest) -> Result<HttpRequest> {
        let token = self.access_token().await?;
        Ok(request.bearer_token(token))
    }
}

impl std::fmt::Debug for AuthorizedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizedClient")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}
