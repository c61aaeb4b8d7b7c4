//! # Authorizer
//!
//! Turns an identity name into an [`AuthorizedClient`], reusing a saved token
//! when one exists and otherwise running the interactive consent flow.
//!
//! ## Flow
//!
//! ```text
//! Start ──saved token──────────────────────────────────────────► Authorized
//!   │
//!   └─none──► NeedsInteractive ──code──► Exchanging ──tokens──► TokenObtained ──► Authorized
//!                                            │
//!                                            └─error──► Failed
//! ```
//!
//! Each transition is logged at `info` with the identity name. The operator
//! supplies the authorization code through the configured
//! [`CodePrompt`]; there is no local redirect listener.

use crate::client::AuthorizedClient;
use crate::credential_store::CredentialStore;
use crate::error::{AuthError, Result};
use crate::oauth::{OAuthConfig, OAuthFlowManager};
use crate::types::identity_label;
use bridge_traits::http::HttpClient;
use bridge_traits::{BridgeError, CodePrompt};
use core_runtime::AuthConfig;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// States of a single authorization call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationStep {
    /// Looking for a saved token
    Start,
    /// No usable token; the operator must grant consent
    NeedsInteractive,
    /// Trading the authorization code for tokens
    Exchanging,
    /// Tokens received, persisting if possible
    TokenObtained,
    /// Client handle ready
    Authorized,
    /// Flow aborted with an error
    Failed,
}

impl AuthorizationStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorizationStep::Start => "start",
            AuthorizationStep::NeedsInteractive => "needs_interactive",
            AuthorizationStep::Exchanging => "exchanging",
            AuthorizationStep::TokenObtained => "token_obtained",
            AuthorizationStep::Authorized => "authorized",
            AuthorizationStep::Failed => "failed",
        }
    }

    /// Whether no further transition follows this step.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AuthorizationStep::Authorized | AuthorizationStep::Failed)
    }
}

impl fmt::Display for AuthorizationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Produces authorized clients for named identities.
///
/// # Example
///
/// ```no_run
/// use core_auth::Authorizer;
/// use core_runtime::AuthConfig;
///
/// # async fn example() -> core_auth::Result<()> {
/// let config = AuthConfig::from_env("/srv/docs-helper")?;
/// let authorizer = Authorizer::new(&config);
///
/// let client = authorizer.authorize(Some("work")).await?;
/// let token = client.access_token().await?;
/// # Ok(())
/// # }
/// ```
pub struct Authorizer {
    store: CredentialStore,
    http_client: Arc<dyn HttpClient>,
    code_prompt: Arc<dyn CodePrompt>,
}

impl Authorizer {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            store: CredentialStore::new(config),
            http_client: Arc::clone(&config.http_client),
            code_prompt: Arc::clone(&config.code_prompt),
        }
    }

    /// Credential store backing this authorizer.
    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Client for `name`, from the saved token if there is one, otherwise
    /// through the interactive flow.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Config`] if the secrets file is missing or invalid
    /// - [`AuthError::InvalidAuthCode`] if the operator enters an empty code
    /// - [`AuthError::Exchange`] if the token endpoint rejects the code
    #[instrument(skip(self), fields(identity = identity_label(name)))]
    pub async fn authorize(&self, name: Option<&str>) -> Result<AuthorizedClient> {
        self.transition(name, AuthorizationStep::Start);

        match self.store.load_token(name).await? {
            Some(tokens) => {
                let identity = self.store.resolve_secrets(name).await?;
                info!("Using saved credentials");
                self.transition(name, AuthorizationStep::Authorized);
                Ok(AuthorizedClient::new(
                    identity,
                    tokens,
                    Arc::clone(&self.http_client),
                ))
            }
            None => {
                info!("Starting authentication flow");
                self.run_interactive(name).await
            }
        }
    }

    /// Run the interactive flow for `name` even if a token is saved.
    #[instrument(skip(self), fields(identity = identity_label(name)))]
    pub async fn authenticate(&self, name: Option<&str>) -> Result<AuthorizedClient> {
        self.transition(name, AuthorizationStep::Start);
        self.run_interactive(name).await
    }

    /// Register a new identity from the default secrets file and authorize it.
    ///
    /// Returns the client and the registered name (generated when `name` is
    /// `None`). The secrets file stays in place if authorization fails.
    ///
    /// # Errors
    ///
    /// [`AuthError::Conflict`] if the name is taken, plus everything
    /// [`authenticate`](Self::authenticate) can return.
    #[instrument(skip(self))]
    pub async fn create_new_identity(
        &self,
        name: Option<&str>,
    ) -> Result<(AuthorizedClient, String)> {
        let registered = self.store.register_new_identity(name).await?;
        info!(identity = %registered, "Creating new client");

        let client = self.authenticate(Some(&registered)).await?;
        Ok((client, registered))
    }

    /// Names of all registered identities; empty if the directory cannot be read.
    pub async fn list_identities(&self) -> BTreeSet<String> {
        self.store.list_identities().await
    }

    /// Client for a named identity.
    pub async fn load_identity(&self, name: &str) -> Result<AuthorizedClient> {
        self.authorize(Some(name)).await
    }

    async fn run_interactive(&self, name: Option<&str>) -> Result<AuthorizedClient> {
        self.transition(name, AuthorizationStep::NeedsInteractive);

        let result = self.interactive_flow(name).await;
        if let Err(e) = &result {
            error!(identity = identity_label(name), error = %e, "Authentication failed");
            self.transition(name, AuthorizationStep::Failed);
        }
        result
    }

    async fn interactive_flow(&self, name: Option<&str>) -> Result<AuthorizedClient> {
        let identity = self.store.resolve_secrets(name).await?;
        let flow = OAuthFlowManager::new(
            OAuthConfig::for_identity(&identity),
            Arc::clone(&self.http_client),
        );

        info!(
            client_type = %identity.client_type(),
            redirect_uri = %identity.authorization_redirect_uri(),
            "Requesting operator consent"
        );

        let (auth_url, verifier) = flow.build_auth_url()?;
        debug!(url = %auth_url, "Generated authorization URL");

        let code = self
            .code_prompt
            .prompt_for_code(&auth_url)
            .await
            .map_err(|e| match e {
                BridgeError::InputClosed => {
                    AuthError::Prompt("Input closed before a code was entered".to_string())
                }
                other => AuthError::Prompt(other.to_string()),
            })?;

        let code = code.trim();
        if code.is_empty() {
            return Err(AuthError::InvalidAuthCode(
                "No authorization code entered".to_string(),
            ));
        }

        self.transition(name, AuthorizationStep::Exchanging);
        let tokens = flow.exchange_code(code, &verifier).await?;

        self.transition(name, AuthorizationStep::TokenObtained);
        if tokens.has_refresh_token() {
            self.store.persist_token(name, &tokens).await?;
        } else {
            warn!(
                identity = identity_label(name),
                "Did not receive refresh token; session will not survive restart"
            );
        }

        info!(identity = identity_label(name), "Authentication successful");
        self.transition(name, AuthorizationStep::Authorized);

        Ok(AuthorizedClient::new(
            identity,
            tokens,
            Arc::clone(&self.http_client),
        ))
    }

    fn transition(&self, name: Option<&str>, step: AuthorizationStep) {
        info!(identity = identity_label(name), step = %step, "Authorization step");
    }
}
