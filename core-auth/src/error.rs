use bridge_traits::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    /// Missing or malformed secrets file, invalid identity name, missing template.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Registration of a name whose secrets file already exists.
    #[error("Client identity '{0}' already exists. Please choose a different name.")]
    Conflict(String),

    #[error("Authorization code exchange failed: {0}")]
    Exchange(String),

    #[error("Invalid authorization code: {0}")]
    InvalidAuthCode(String),

    #[error("Token refresh failed: {0}")]
    TokenRefreshFailed(String),

    #[error("Credential storage failed: {0}")]
    Storage(String),

    #[error("Operator prompt failed: {0}")]
    Prompt(String),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("{0}")]
    Other(String),
}

impl From<core_runtime::Error> for AuthError {
    fn from(err: core_runtime::Error) -> Self {
        AuthError::Config(err.to_string())
    }
}

impl From<BridgeError> for AuthError {
    fn from(err: BridgeError) -> Self {
        AuthError::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
