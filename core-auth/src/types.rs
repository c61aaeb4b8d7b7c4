use crate::error::{AuthError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Redirect URI used by installed (desktop) clients: the consent page shows
/// the code for the operator to copy instead of redirecting.
pub const OOB_REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";

/// Redirect URI assumed when a secrets file declares none.
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:3000/";

/// Google's authorization endpoint.
pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Google's token endpoint.
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Scopes requested for every identity: Docs read/write and full Drive access.
pub const DOCS_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/documents",
    "https://www.googleapis.com/auth/drive",
];

pub(crate) const SECRETS_SUFFIX: &str = ".credentials.json";
pub(crate) const TOKEN_SUFFIX: &str = ".token.json";

/// Display label for an optional identity name.
pub fn identity_label(name: Option<&str>) -> &str {
    name.unwrap_or("default")
}

/// Check that `name` can be used as a file stem inside the credentials directory.
///
/// Names are the stems of `<name>.credentials.json`, so they cannot contain
/// path separators, be `.`/`..`, or embed either file suffix.
///
/// # Examples
///
/// ```
/// use core_auth::types::validate_identity_name;
///
/// assert!(validate_identity_name("work").is_ok());
/// assert!(validate_identity_name("../work").is_err());
/// ```
pub fn validate_identity_name(name: &str) -> Result<()> {
    let reason = if name.trim().is_empty() {
        Some("name cannot be empty")
    } else if name == "." || name == ".." {
        Some("name cannot be a relative directory")
    } else if name.contains(['/', '\\']) || name.contains('\0') {
        Some("name cannot contain path separators")
    } else if name.contains(SECRETS_SUFFIX) || name.contains(TOKEN_SUFFIX) {
        Some("name cannot contain a credentials file suffix")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(AuthError::Config(format!(
            "Invalid client identity name '{}': {}",
            name, reason
        ))),
        None => Ok(()),
    }
}

/// Kind of OAuth client, taken from the top-level key of the secrets file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientType {
    /// Desktop client (`"installed"` key)
    Installed,
    /// Web application client (`"web"` key)
    Web,
}

impl ClientType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientType::Installed => "installed",
            ClientType::Web => "web",
        }
    }
}

impl fmt::Display for ClientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One OAuth client configuration loaded from a secrets file.
///
/// Immutable once loaded; `Debug` hides the client secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    pub(crate) name: Option<String>,
    pub(crate) client_id: String,
    pub(crate) client_secret: String,
    pub(crate) redirect_uris: Vec<String>,
    pub(crate) client_type: ClientType,
    pub(crate) auth_uri: String,
    pub(crate) token_uri: String,
}

impl ClientIdentity {
    /// Identity name, `None` for the default identity
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    /// Declared redirect URIs, never empty
    pub fn redirect_uris(&self) -> &[String] {
        &self.redirect_uris
    }

    pub fn client_type(&self) -> ClientType {
        self.client_type
    }

    pub fn auth_uri(&self) -> &str {
        &self.auth_uri
    }

    pub fn token_uri(&self) -> &str {
        &self.token_uri
    }

    /// First declared redirect URI.
    pub fn primary_redirect_uri(&self) -> &str {
        self.redirect_uris
            .first()
            .map(String::as_str)
            .unwrap_or(DEFAULT_REDIRECT_URI)
    }

    /// Redirect URI for the interactive flow.
    ///
    /// Web clients use their first declared URI. Installed clients always use
    /// the out-of-band sentinel, whatever URIs the file lists.
    pub fn authorization_redirect_uri(&self) -> &str {
        match self.client_type {
            ClientType::Web => self.primary_redirect_uri(),
            ClientType::Installed => OOB_REDIRECT_URI,
        }
    }
}

impl fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientIdentity")
            .field("name", &identity_label(self.name()))
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("redirect_uris", &self.redirect_uris)
            .field("client_type", &self.client_type)
            .finish()
    }
}

/// OAuth token set for one identity.
///
/// A refresh token is required before the record can be persisted; an
/// in-memory session may exist without one.
///
/// # Examples
///
/// ```
/// use core_auth::TokenRecord;
///
/// let record = TokenRecord::from_refresh_token("1//0g-refresh");
/// assert!(record.has_refresh_token());
/// assert!(record.is_expired()); // no access token yet
/// ```
#[derive(Clone, Default, PartialEq, Eq)]
pub struct TokenRecord {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expiry_date: Option<DateTime<Utc>>,
}

impl TokenRecord {
    /// Record holding only a refresh token.
    pub fn from_refresh_token(refresh_token: impl Into<String>) -> Self {
        Self {
            refresh_token: Some(refresh_token.into()),
            ..Self::default()
        }
    }

    /// Build a record from a token endpoint response.
    pub fn from_grant(
        access_token: String,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
    ) -> Self {
        Self {
            access_token: Some(access_token),
            refresh_token,
            expiry_date: expires_in_secs.and_then(expiry_after),
        }
    }

    /// Whether a non-empty refresh token is present
    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token
            .as_deref()
            .is_some_and(|token| !token.is_empty())
    }

    /// True when there is no usable access token or it expires within 5 minutes.
    pub fn is_expired(&self) -> bool {
        self.is_expired_with_buffer(300)
    }

    /// True when there is no usable access token or it expires within `buffer_seconds`.
    ///
    /// An access token without an expiry date is treated as valid.
    pub fn is_expired_with_buffer(&self, buffer_seconds: i64) -> bool {
        match (&self.access_token, self.expiry_date) {
            (None, _) => true,
            (Some(token), _) if token.is_empty() => true,
            (Some(_), None) => false,
            (Some(_), Some(expiry)) => Duration::try_seconds(buffer_seconds)
                .and_then(|buffer| expiry.checked_sub_signed(buffer))
                .map_or(true, |refresh_at| Utc::now() >= refresh_at),
        }
    }

    /// Time remaining until the access token expires, `None` if unknown or past.
    pub fn time_until_expiry(&self) -> Option<Duration> {
        let expiry = self.expiry_date?;
        let now = Utc::now();
        (now < expiry).then(|| expiry - now)
    }
}

/// `now + secs`, or `None` when the result is outside chrono's range.
fn expiry_after(secs: i64) -> Option<DateTime<Utc>> {
    Utc::now().checked_add_signed(Duration::try_seconds(secs)?)
}

// Custom Debug implementation to avoid logging tokens
impl fmt::Debug for TokenRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |value: &Option<String>| value.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("TokenRecord")
            .field("access_token", &redact(&self.access_token))
            .field("refresh_token", &redact(&self.refresh_token))
            .field("expiry_date", &self.expiry_date)
            .finish()
    }
}
