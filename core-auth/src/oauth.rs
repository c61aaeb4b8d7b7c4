//! OAuth 2.0 Authorization Code Flow with PKCE
//!
//! Implements the pieces of RFC 6749 and RFC 7636 the helper needs against
//! Google's endpoints:
//! - Building the consent URL (offline access, S256 challenge)
//! - Exchanging a pasted authorization code for tokens
//! - Refreshing an access token on demand
//!
//! # Security
//!
//! Codes, verifiers and tokens are never logged. The verifier only travels to
//! the token endpoint; the consent URL carries its SHA-256 challenge.
//!
//! # Example
//!
//! ```no_run
//! use core_auth::oauth::{OAuthConfig, OAuthFlowManager};
//! use std::sync::Arc;
//!
//! # async fn example() -> core_auth::Result<()> {
//! # use bridge_traits::http::HttpClient;
//! # let http_client: Arc<dyn HttpClient> = todo!();
//! let config = OAuthConfig::google(
//!     "1234.apps.googleusercontent.com",
//!     Some("GOCSPX-secret".to_string()),
//!     "urn:ietf:wg:oauth:2.0:oob",
//! );
//!
//! let flow = OAuthFlowManager::new(config, http_client);
//! let (auth_url, verifier) = flow.build_auth_url()?;
//! // Show auth_url to the operator, read back the code...
//! let tokens = flow.exchange_code("4/0Ab-pasted-code", &verifier).await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::types::{
    ClientIdentity, TokenRecord, DOCS_SCOPES, GOOGLE_AUTH_URL, GOOGLE_TOKEN_URL,
};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, RetryPolicy};
use rand::Rng;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// OAuth client configuration for one flow.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    /// OAuth client ID
    pub client_id: String,
    /// OAuth client secret (confidential clients)
    pub client_secret: Option<String>,
    /// Redirect URI registered for the client
    pub redirect_uri: String,
    /// Scopes to request
    pub scopes: Vec<String>,
    /// Authorization endpoint URL
    pub auth_url: String,
    /// Token endpoint URL
    pub token_url: String,
}

impl OAuthConfig {
    /// Configuration against Google's endpoints with the Docs/Drive scopes.
    pub fn google(
        client_id: impl Into<String>,
        client_secret: Option<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret,
            redirect_uri: redirect_uri.into(),
            scopes: DOCS_SCOPES.iter().map(|s| s.to_string()).collect(),
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
        }
    }

    /// Configuration for an identity loaded from a secrets file.
    ///
    /// Uses the endpoints the file declares and the redirect URI matching its
    /// client type.
    pub fn for_identity(identity: &ClientIdentity) -> Self {
        Self {
            client_id: identity.client_id().to_string(),
            client_secret: Some(identity.client_secret().to_string()),
            redirect_uri: identity.authorization_redirect_uri().to_string(),
            scopes: DOCS_SCOPES.iter().map(|s| s.to_string()).collect(),
            auth_url: identity.auth_uri().to_string(),
            token_url: identity.token_uri().to_string(),
        }
    }
}

/// PKCE code verifier.
///
/// Held by the caller between [`OAuthFlowManager::build_auth_url`] and
/// [`OAuthFlowManager::exchange_code`]. `Debug` does not print the value.
#[derive(Clone)]
pub struct PkceVerifier {
    verifier: String,
}

impl PkceVerifier {
    /// Generate a verifier from 32 random bytes (43 URL-safe characters).
    pub fn new() -> Self {
        let mut verifier_bytes = [0u8; 32];
        rand::thread_rng().fill(&mut verifier_bytes);
        Self {
            verifier: URL_SAFE_NO_PAD.encode(verifier_bytes),
        }
    }

    pub fn verifier(&self) -> &str {
        &self.verifier
    }

    /// S256 challenge: BASE64URL(SHA256(code_verifier))
    pub fn challenge(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.verifier.as_bytes());
        URL_SAFE_NO_PAD.encode(hasher.finalize())
    }
}

impl Default for PkceVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PkceVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkceVerifier")
            .field("verifier", &"[REDACTED]")
            .finish()
    }
}

/// Drives the authorization code flow for a single OAuth client.
pub struct OAuthFlowManager {
    config: OAuthConfig,
    http_client: Arc<dyn HttpClient>,
    retry_policy: RetryPolicy,
}

impl OAuthFlowManager {
    pub fn new(config: OAuthConfig, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            config,
            http_client,
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Override the backoff used for token refresh.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Build the consent URL and the verifier that must accompany the code exchange.
    ///
    /// # Errors
    ///
    /// [`AuthError::Config`] if the authorization endpoint is not a valid URL.
    #[instrument(skip(self), fields(redirect_uri = %self.config.redirect_uri))]
    pub fn build_auth_url(&self) -> Result<(String, PkceVerifier)> {
        let verifier = PkceVerifier::new();
        let challenge = verifier.challenge();

        let mut url = Url::parse(&self.config.auth_url)
            .map_err(|e| AuthError::Config(format!("Invalid auth URL: {}", e)))?;

        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.config.scopes.join(" "))
            .append_pair("access_type", "offline")
            .append_pair("code_challenge", &challenge)
            .append_pair("code_challenge_method", "S256");

        debug!(scopes = self.config.scopes.len(), "Built authorization URL");

        Ok((url.to_string(), verifier))
    }

    /// Exchange an authorization code for tokens.
    ///
    /// The request is sent once. A response without a refresh token is
    /// returned as-is; deciding what to do about it is up to the caller.
    ///
    /// # Errors
    ///
    /// [`AuthError::Exchange`] on transport failure, a non-2xx status or an
    /// unparsable body.
    #[instrument(skip(self, code, verifier))]
    pub async fn exchange_code(&self, code: &str, verifier: &PkceVerifier) -> Result<TokenRecord> {
        let mut params = HashMap::new();
        params.insert("grant_type", "authorization_code");
        params.insert("code", code);
        params.insert("redirect_uri", self.config.redirect_uri.as_str());
        params.insert("client_id", self.config.client_id.as_str());
        params.insert("code_verifier", verifier.verifier());
        if let Some(client_secret) = self.config.client_secret.as_deref() {
            params.insert("client_secret", client_secret);
        }

        debug!("Exchanging authorization code for tokens");

        let request = self.token_request(&params)?;
        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| AuthError::Exchange(e.to_string()))?;

        if !response.is_success() {
            let status = response.status;
            let error_body = response.error_text();
            warn!(status, error = %error_body, "Token endpoint rejected authorization code");
            return Err(AuthError::Exchange(format!(
                "Token endpoint returned {}: {}",
                status, error_body
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .map_err(|e| AuthError::Exchange(format!("Failed to parse token response: {}", e)))?;

        info!(
            expires_in = token_response.expires_in,
            has_refresh_token = token_response.refresh_token.is_some(),
            "Exchanged authorization code for tokens"
        );

        Ok(token_response.into_record(None))
    }

    /// Obtain a fresh access token from a refresh token.
    ///
    /// 4xx responses fail immediately. Transport errors and 5xx responses are
    /// retried with exponential backoff up to the retry policy's attempt count.
    /// The returned record keeps `refresh_token` when the server does not
    /// rotate it.
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenRecord> {
        let mut params = HashMap::new();
        params.insert("grant_type", "refresh_token");
        params.insert("refresh_token", refresh_token);
        params.insert("client_id", self.config.client_id.as_str());
        if let Some(client_secret) = self.config.client_secret.as_deref() {
            params.insert("client_secret", client_secret);
        }

        debug!("Refreshing access token");

        let request = self.token_request(&params)?;
        let policy = self.retry_policy.clone().without_rate_limit_retry();
        let attempts = policy.max_attempts.max(1);

        let response = self
            .http_client
            .execute_with_retry(request, policy)
            .await
            .map_err(|e| {
                AuthError::TokenRefreshFailed(format!(
                    "Token refresh failed after {} attempts. Last error: {}",
                    attempts, e
                ))
            })?;

        if !response.is_success() {
            let status = response.status;
            let error_body = response.error_text();
            warn!(status, error = %error_body, "Token refresh rejected");
            let message = if status >= 500 {
                format!(
                    "Token refresh failed after {} attempts. Last error: {} - {}",
                    attempts, status, error_body
                )
            } else {
                format!("Token endpoint returned {}: {}", status, error_body)
            };
            return Err(AuthError::TokenRefreshFailed(message));
        }

        let token_response: TokenResponse = response.json().map_err(|e| {
            AuthError::TokenRefreshFailed(format!("Failed to parse token response: {}", e))
        })?;

        info!(expires_in = token_response.expires_in, "Refreshed access token");
        Ok(token_response.into_record(Some(refresh_token)))
    }

    fn token_request(&self, params: &HashMap<&str, &str>) -> Result<HttpRequest> {
        HttpRequest::new(HttpMethod::Post, self.config.token_url.clone())
            .accept_json()
            .form(params)
            .map_err(|e| AuthError::Other(format!("Failed to encode token request: {}", e)))
    }
}

/// JSON body returned by the token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
    #[serde(default)]
    #[allow(dead_code)]
    token_type: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    scope: Option<String>,
}

impl TokenResponse {
    fn into_record(self, previous_refresh_token: Option<&str>) -> TokenRecord {
        let refresh_token = self
            .refresh_token
            .filter(|token| !token.is_empty())
            .or_else(|| previous_refresh_token.map(str::to_string));
        TokenRecord::from_grant(self.access_token, refresh_token, Some(self.expires_in))
    }
}

fn default_expires_in() -> i64 {
    3600
}
