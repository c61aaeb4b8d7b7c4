//! # Credential Store
//!
//! Maps identity names to secrets and token files and reads/writes them
//! through the configured [`FileSystemAccess`] bridge.
//!
//! ## File Formats
//!
//! Secrets files are the JSON downloaded from the Google Cloud console, with
//! the client under an `installed` or `web` key:
//!
//! ```json
//! { "installed": { "client_id": "...", "client_secret": "...", "redirect_uris": ["http://localhost"] } }
//! ```
//!
//! Token files are written as `authorized_user` records:
//!
//! ```json
//! { "type": "authorized_user", "client_id": "...", "client_secret": "...", "refresh_token": "..." }
//! ```
//!
//! Readers also accept `access_token` and `expiry_date` (milliseconds since
//! the epoch) when present.

use crate::error::{AuthError, Result};
use crate::types::{
    identity_label, validate_identity_name, ClientIdentity, ClientType, TokenRecord,
    DEFAULT_REDIRECT_URI, GOOGLE_AUTH_URL, GOOGLE_TOKEN_URL, SECRETS_SUFFIX, TOKEN_SUFFIX,
};
use bridge_traits::FileSystemAccess;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use core_runtime::logging::strip_path;
use core_runtime::AuthConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

const AUTHORIZED_USER_TYPE: &str = "authorized_user";

/// Top level of a client secrets file.
#[derive(Debug, Deserialize)]
struct SecretsFile {
    installed: Option<SecretsEntry>,
    web: Option<SecretsEntry>,
}

#[derive(Debug, Deserialize)]
struct SecretsEntry {
    client_id: String,
    client_secret: String,
    #[serde(default)]
    redirect_uris: Vec<String>,
    auth_uri: Option<String>,
    token_uri: Option<String>,
}

/// Token file as read from disk. Everything is optional so older or
/// hand-edited files still load.
#[derive(Debug, Default, Deserialize)]
struct StoredTokenFile {
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expiry_date: Option<i64>,
}

/// Token file as written to disk.
#[derive(Serialize)]
struct StoredToken<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    client_id: &'a str,
    client_secret: &'a str,
    refresh_token: &'a str,
}

/// Per-identity secrets and token files.
///
/// The default identity (`None`) lives at the configured default paths;
/// named identities live in the credentials directory as
/// `<name>.credentials.json` and `<name>.token.json`.
#[derive(Clone)]
pub struct CredentialStore {
    file_system: Arc<dyn FileSystemAccess>,
    credentials_dir: PathBuf,
    default_secrets_path: PathBuf,
    default_token_path: PathBuf,
}

impl CredentialStore {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            file_system: Arc::clone(&config.file_system),
            credentials_dir: config.credentials_dir.clone(),
            default_secrets_path: config.default_secrets_path.clone(),
            default_token_path: config.default_token_path.clone(),
        }
    }

    pub fn credentials_dir(&self) -> &Path {
        &self.credentials_dir
    }

    /// Location of the secrets file for `name`.
    ///
    /// # Errors
    ///
    /// [`AuthError::Config`] if `name` is not a valid identity name.
    pub fn secrets_path(&self, name: Option<&str>) -> Result<PathBuf> {
        match name {
            None => Ok(self.default_secrets_path.clone()),
            Some(name) => {
                validate_identity_name(name)?;
                Ok(self
                    .credentials_dir
                    .join(format!("{}{}", name, SECRETS_SUFFIX)))
            }
        }
    }

    /// Location of the token file for `name`.
    pub fn token_path(&self, name: Option<&str>) -> Result<PathBuf> {
        match name {
            None => Ok(self.default_token_path.clone()),
            Some(name) => {
                validate_identity_name(name)?;
                Ok(self.credentials_dir.join(format!("{}{}", name, TOKEN_SUFFIX)))
            }
        }
    }

    /// Whether a secrets file exists for `name`.
    pub async fn has_secrets(&self, name: Option<&str>) -> Result<bool> {
        let path = self.secrets_path(name)?;
        Ok(self.file_system.exists(&path).await?)
    }

    /// Load the client configuration for `name`.
    ///
    /// `installed` takes precedence when a file declares both client kinds.
    ///
    /// # Errors
    ///
    /// [`AuthError::Config`] if the file is missing, is not valid JSON, or
    /// declares neither an `installed` nor a `web` client.
    #[instrument(skip(self), fields(identity = identity_label(name)))]
    pub async fn resolve_secrets(&self, name: Option<&str>) -> Result<ClientIdentity> {
        let path = self.secrets_path(name)?;

        let contents = self.file_system.read_file(&path).await.map_err(|e| {
            AuthError::Config(format!(
                "Could not read client secrets from {}: {}",
                path.display(),
                e
            ))
        })?;

        let file: SecretsFile = serde_json::from_slice(&contents).map_err(|e| {
            AuthError::Config(format!(
                "Could not parse client secrets in {}: {}",
                path.display(),
                e
            ))
        })?;

        let (client_type, entry) = match (file.installed, file.web) {
            (Some(entry), _) => (ClientType::Installed, entry),
            (None, Some(entry)) => (ClientType::Web, entry),
            (None, None) => {
                return Err(AuthError::Config(format!(
                    "Could not find client secrets in {}.",
                    path.display()
                )))
            }
        };

        let redirect_uris = if entry.redirect_uris.is_empty() {
            vec![DEFAULT_REDIRECT_URI.to_string()]
        } else {
            entry.redirect_uris
        };

        let file = path.to_string_lossy();
        debug!(
            client_type = %client_type,
            file = strip_path(&file),
            "Resolved client secrets"
        );

        Ok(ClientIdentity {
            name: name.map(str::to_string),
            client_id: entry.client_id,
            client_secret: entry.client_secret,
            redirect_uris,
            client_type,
            auth_uri: entry.auth_uri.unwrap_or_else(|| GOOGLE_AUTH_URL.to_string()),
            token_uri: entry.token_uri.unwrap_or_else(|| GOOGLE_TOKEN_URL.to_string()),
        })
    }

    /// Load the saved token for `name`.
    ///
    /// Returns `None` when there is nothing usable on disk: the file is absent
    /// or unreadable, is not valid JSON, or has no refresh token. Only an
    /// invalid name is an error.
    #[instrument(skip(self), fields(identity = identity_label(name)))]
    pub async fn load_token(&self, name: Option<&str>) -> Result<Option<TokenRecord>> {
        let path = self.token_path(name)?;
        let file = strip_path(&path.to_string_lossy()).to_string();

        let contents = match self.file_system.read_file(&path).await {
            Ok(contents) => contents,
            Err(e) if e.is_not_found() => {
                debug!(file = %file, "No saved token");
                return Ok(None);
            }
            Err(e) => {
                warn!(file = %file, error = %e, "Saved token unreadable, ignoring");
                return Ok(None);
            }
        };

        let stored: StoredTokenFile = match serde_json::from_slice(&contents) {
            Ok(stored) => stored,
            Err(e) => {
                warn!(file = %file, error = %e, "Saved token is corrupt, ignoring");
                return Ok(None);
            }
        };

        let record = TokenRecord {
            access_token: stored.access_token.filter(|token| !token.is_empty()),
            refresh_token: stored.refresh_token,
            expiry_date: stored.expiry_date.and_then(DateTime::<Utc>::from_timestamp_millis),
        };

        if !record.has_refresh_token() {
            warn!(file = %file, "Saved token has no refresh token, ignoring");
            return Ok(None);
        }

        debug!(file = %file, "Loaded saved token");
        Ok(Some(record))
    }

    /// Write the token for `name`, replacing any previous one.
    ///
    /// The client id and secret written alongside the refresh token are read
    /// from the identity's secrets file, never taken from the caller.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Config`] if the record has no refresh token or the
    ///   secrets cannot be resolved
    /// - [`AuthError::Storage`] if the file cannot be written
    #[instrument(skip(self, record), fields(identity = identity_label(name)))]
    pub async fn persist_token(&self, name: Option<&str>, record: &TokenRecord) -> Result<()> {
        let refresh_token = match record.refresh_token.as_deref() {
            Some(token) if !token.is_empty() => token,
            _ => {
                return Err(AuthError::Config(
                    "Cannot persist a token without a refresh token".to_string(),
                ))
            }
        };

        let identity = self.resolve_secrets(name).await?;
        let path = self.token_path(name)?;

        let payload = serde_json::to_vec(&StoredToken {
            kind: AUTHORIZED_USER_TYPE,
            client_id: identity.client_id(),
            client_secret: identity.client_secret(),
            refresh_token,
        })
        .map_err(|e| AuthError::Other(format!("Failed to serialize token: {}", e)))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            self.file_system.create_dir_all(parent).await?;
        }
        self.file_system
            .write_file(&path, Bytes::from(payload))
            .await?;

        let file = path.to_string_lossy();
        info!(file = strip_path(&file), "Token stored");
        Ok(())
    }

    /// Names of all identities with a secrets file in the credentials directory.
    ///
    /// Creates the directory if needed. Failures are logged and produce an
    /// empty set.
    #[instrument(skip(self))]
    pub async fn list_identities(&self) -> BTreeSet<String> {
        match self.scan_identities().await {
            Ok(names) => names,
            Err(e) => {
                warn!(error = %e, "Could not list client identities");
                BTreeSet::new()
            }
        }
    }

    async fn scan_identities(&self) -> Result<BTreeSet<String>> {
        self.file_system.create_dir_all(&self.credentials_dir).await?;
        let entries = self.file_system.list_directory(&self.credentials_dir).await?;

        Ok(entries
            .iter()
            .filter_map(|path| path.file_name()?.to_str())
            .filter_map(|file_name| file_name.strip_suffix(SECRETS_SUFFIX))
            .filter(|stem| validate_identity_name(stem).is_ok())
            .map(str::to_string)
            .collect())
    }

    /// Create a secrets file for a new identity by copying the default secrets file.
    ///
    /// When `name` is `None` a `client_<uuid>` name is generated. Returns the
    /// name that was registered.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Config`] for an invalid name or a missing template
    /// - [`AuthError::Conflict`] if the identity already has a secrets file
    #[instrument(skip(self))]
    pub async fn register_new_identity(&self, name: Option<&str>) -> Result<String> {
        let name = match name {
            Some(name) => name.to_string(),
            None => format!("client_{}", Uuid::new_v4()),
        };
        let secrets_path = self.secrets_path(Some(&name))?;

        self.file_system.create_dir_all(&self.credentials_dir).await?;

        if self.file_system.exists(&secrets_path).await? {
            return Err(AuthError::Conflict(name));
        }

        let template = self
            .file_system
            .read_file(&self.default_secrets_path)
            .await
            .map_err(|_| {
                AuthError::Config(format!(
                    "Could not copy default credentials. Make sure {} exists.",
                    self.default_secrets_path.display()
                ))
            })?;

        self.file_system
            .create_file(&secrets_path, template)
            .await
            .map_err(|e| {
                if e.is_already_exists() {
                    AuthError::Conflict(name.clone())
                } else {
                    AuthError::from(e)
                }
            })?;

        info!(identity = %name, "Registered new client identity");
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        credentials_dir, project_root, test_config, MemoryFileSystem, MockHttp, ScriptedPrompt,
        INSTALLED_SECRETS, WEB_SECRETS,
    };

    fn store_with(fs: Arc<MemoryFileSystem>) -> CredentialStore {
        let config = test_config(fs, Arc::new(MockHttp::new()), Arc::new(ScriptedPrompt::default()));
        CredentialStore::new(&config)
    }

    fn named_secrets(name: &str) -> PathBuf {
        credentials_dir().join(format!("{name}.credentials.json"))
    }

    fn named_token(name: &str) -> PathBuf {
        credentials_dir().join(format!("{name}.token.json"))
    }

    #[test]
    fn test_path_mapping() {
        let store = store_with(Arc::new(MemoryFileSystem::new()));

        assert_eq!(
            store.secrets_path(None).unwrap(),
            project_root().join("credentials.json")
        );
        assert_eq!(store.token_path(None).unwrap(), project_root().join("token.json"));
        assert_eq!(store.secrets_path(Some("work")).unwrap(), named_secrets("work"));
        assert_eq!(store.token_path(Some("work")).unwrap(), named_token("work"));
        assert!(matches!(
            store.token_path(Some("../escape")),
            Err(AuthError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_has_secrets() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.insert(named_secrets("work"), INSTALLED_SECRETS);
        let store = store_with(fs);

        assert!(store.has_secrets(Some("work")).await.unwrap());
        assert!(!store.has_secrets(Some("home")).await.unwrap());
        assert!(!store.has_secrets(None).await.unwrap());
    }

    #[tokio::test]
    async fn test_resolve_installed_secrets() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.insert(project_root().join("credentials.json"), INSTALLED_SECRETS);
        let store = store_with(fs);

        let identity = store.resolve_secrets(None).await.unwrap();
        assert_eq!(identity.name(), None);
        assert_eq!(identity.client_type(), ClientType::Installed);
        assert_eq!(identity.client_id(), "1234.apps.googleusercontent.com");
        assert_eq!(identity.client_secret(), "GOCSPX-installed");
        assert_eq!(identity.redirect_uris(), ["http://localhost".to_string()]);
        assert_eq!(identity.token_uri(), "https://oauth2.googleapis.com/token");
    }

    #[tokio::test]
    async fn test_resolve_web_secrets_defaults() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.insert(
            named_secrets("site"),
            r#"{"web":{"client_id":"w","client_secret":"s"}}"#,
        );
        let store = store_with(fs);

        let identity = store.resolve_secrets(Some("site")).await.unwrap();
        assert_eq!(identity.name(), Some("site"));
        assert_eq!(identity.client_type(), ClientType::Web);
        assert_eq!(identity.redirect_uris(), [DEFAULT_REDIRECT_URI.to_string()]);
        assert_eq!(identity.auth_uri(), GOOGLE_AUTH_URL);
        assert_eq!(identity.token_uri(), GOOGLE_TOKEN_URL);
    }

    #[tokio::test]
    async fn test_installed_wins_over_web() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.insert(
            named_secrets("both"),
            r#"{
                "installed": {"client_id":"desktop","client_secret":"a"},
                "web": {"client_id":"site","client_secret":"b","redirect_uris":["https://x/cb"]}
            }"#,
        );
        let store = store_with(fs);

        let identity = store.resolve_secrets(Some("both")).await.unwrap();
        assert_eq!(identity.client_type(), ClientType::Installed);
        assert_eq!(identity.client_id(), "desktop");
    }

    #[tokio::test]
    async fn test_resolve_secrets_errors() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.insert(named_secrets("garbage"), "{not json");
        fs.insert(named_secrets("empty"), r#"{"other":{}}"#);
        let store = store_with(fs);

        for name in ["missing", "garbage", "empty"] {
            let err = store.resolve_secrets(Some(name)).await.unwrap_err();
            assert!(matches!(err, AuthError::Config(_)), "{name}: {err:?}");
        }
    }

    #[tokio::test]
    async fn test_load_token_absent_or_corrupt() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.insert(named_token("corrupt"), "{\"refresh_token\": ");
        fs.insert(named_token("no_refresh"), r#"{"access_token":"ya29"}"#);
        fs.insert(named_token("blank"), r#"{"refresh_token":""}"#);
        let store = store_with(fs);

        assert!(store.load_token(Some("absent")).await.unwrap().is_none());
        assert!(store.load_token(Some("corrupt")).await.unwrap().is_none());
        assert!(store.load_token(Some("no_refresh")).await.unwrap().is_none());
        assert!(store.load_token(Some("blank")).await.unwrap().is_none());
        assert!(store.load_token(None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_load_token_with_optional_fields() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.insert(
            named_token("work"),
            r#"{"type":"authorized_user","client_id":"c","client_secret":"s","refresh_token":"1//0g","access_token":"ya29","expiry_date":4102444800000}"#,
        );
        let store = store_with(fs);

        let record = store.load_token(Some("work")).await.unwrap().unwrap();
        assert_eq!(record.refresh_token.as_deref(), Some("1//0g"));
        assert_eq!(record.access_token.as_deref(), Some("ya29"));
        assert_eq!(
            record.expiry_date.map(|d| d.timestamp_millis()),
            Some(4_102_444_800_000)
        );
        assert!(!record.is_expired());
    }

    #[tokio::test]
    async fn test_load_token_with_extreme_expiry() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.insert(
            named_token("edited"),
            r#"{"refresh_token":"r","access_token":"a","expiry_date":-8334601228800000}"#,
        );
        let store = store_with(fs);

        let record = store.load_token(Some("edited")).await.unwrap().unwrap();
        assert_eq!(record.refresh_token.as_deref(), Some("r"));
        assert!(record.is_expired());
    }

    #[tokio::test]
    async fn test_persist_token_uses_secrets_file() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.insert(named_secrets("work"), WEB_SECRETS);
        let store = store_with(fs.clone());

        let record = TokenRecord::from_grant("ya29".to_string(), Some("1//0g".to_string()), Some(3600));
        store.persist_token(Some("work"), &record).await.unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&fs.contents(named_token("work")).unwrap()).unwrap();
        assert_eq!(
            written,
            serde_json::json!({
                "type": "authorized_user",
                "client_id": "5678.apps.googleusercontent.com",
                "client_secret": "GOCSPX-web",
                "refresh_token": "1//0g",
            })
        );
        assert!(fs.has_dir(credentials_dir()));

        let identity = store.resolve_secrets(Some("work")).await.unwrap();
        assert_eq!(written["client_id"], identity.client_id());
        assert_eq!(written["client_secret"], identity.client_secret());
    }

    #[tokio::test]
    async fn test_persist_token_overwrites() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.insert(project_root().join("credentials.json"), INSTALLED_SECRETS);
        let store = store_with(fs.clone());

        store
            .persist_token(None, &TokenRecord::from_refresh_token("first"))
            .await
            .unwrap();
        store
            .persist_token(None, &TokenRecord::from_refresh_token("second"))
            .await
            .unwrap();

        let record = store.load_token(None).await.unwrap().unwrap();
        assert_eq!(record.refresh_token.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_persist_token_requires_refresh_token() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.insert(named_secrets("work"), INSTALLED_SECRETS);
        let store = store_with(fs.clone());

        let record = TokenRecord::from_grant("ya29".to_string(), None, Some(3600));
        let err = store.persist_token(Some("work"), &record).await.unwrap_err();
        assert!(matches!(err, AuthError::Config(_)));
        assert!(fs.contents(named_token("work")).is_none());
    }

    #[tokio::test]
    async fn test_persist_token_requires_secrets() {
        let store = store_with(Arc::new(MemoryFileSystem::new()));
        let err = store
            .persist_token(Some("ghost"), &TokenRecord::from_refresh_token("1//0g"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Config(_)));
    }

    #[tokio::test]
    async fn test_register_and_list() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.insert(project_root().join("credentials.json"), INSTALLED_SECRETS);
        let store = store_with(fs.clone());

        for name in ["a", "b", "c"] {
            assert_eq!(store.register_new_identity(Some(name)).await.unwrap(), name);
        }
        // Token files are not identities
        fs.insert(named_token("a"), r#"{"refresh_token":"r"}"#);
        fs.insert(credentials_dir().join("notes.txt"), "");

        let names = store.list_identities().await;
        assert_eq!(
            names.into_iter().collect::<Vec<_>>(),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
        assert_eq!(
            fs.contents(named_secrets("b")).as_deref(),
            Some(INSTALLED_SECRETS)
        );
    }

    #[tokio::test]
    async fn test_list_independent_of_registration_order() {
        for order in [["c", "a", "b"], ["b", "c", "a"]] {
            let fs = Arc::new(MemoryFileSystem::new());
            fs.insert(project_root().join("credentials.json"), INSTALLED_SECRETS);
            let store = store_with(fs);

            for name in order {
                store.register_new_identity(Some(name)).await.unwrap();
            }

            let names: Vec<String> = store.list_identities().await.into_iter().collect();
            assert_eq!(names, vec!["a", "b", "c"], "registered as {order:?}");
        }
    }

    #[tokio::test]
    async fn test_list_skips_unloadable_names() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.insert(named_secrets("work"), INSTALLED_SECRETS);
        fs.insert(
            credentials_dir().join("x.token.json.credentials.json"),
            INSTALLED_SECRETS,
        );
        fs.insert(credentials_dir().join(".credentials.json"), INSTALLED_SECRETS);
        let store = store_with(fs);

        let names = store.list_identities().await;
        assert_eq!(names.into_iter().collect::<Vec<_>>(), vec!["work".to_string()]);
    }

    #[tokio::test]
    async fn test_register_conflict() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.insert(project_root().join("credentials.json"), INSTALLED_SECRETS);
        let store = store_with(fs);

        store.register_new_identity(Some("work")).await.unwrap();
        let err = store.register_new_identity(Some("work")).await.unwrap_err();
        assert!(matches!(err, AuthError::Conflict(ref name) if name == "work"));
        assert!(err.to_string().contains("already exists"));
    }

    #[tokio::test]
    async fn test_register_generates_name() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.insert(project_root().join("credentials.json"), INSTALLED_SECRETS);
        let store = store_with(fs.clone());

        let name = store.register_new_identity(None).await.unwrap();
        let suffix = name.strip_prefix("client_").unwrap();
        assert!(Uuid::parse_str(suffix).is_ok());
        assert!(fs.contents(named_secrets(&name)).is_some());
    }

    #[tokio::test]
    async fn test_register_without_template() {
        let fs = Arc::new(MemoryFileSystem::new());
        let store = store_with(fs.clone());

        let err = store.register_new_identity(Some("work")).await.unwrap_err();
        assert!(matches!(err, AuthError::Config(_)));
        assert!(fs.contents(named_secrets("work")).is_none());
    }

    #[tokio::test]
    async fn test_register_invalid_name() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.insert(project_root().join("credentials.json"), INSTALLED_SECRETS);
        let store = store_with(fs);

        let err = store.register_new_identity(Some("a/b")).await.unwrap_err();
        assert!(matches!(err, AuthError::Config(_)));
    }

    #[tokio::test]
    async fn test_list_creates_directory() {
        let fs = Arc::new(MemoryFileSystem::new());
        let store = store_with(fs.clone());

        assert!(store.list_identities().await.is_empty());
        assert!(fs.has_dir(credentials_dir()));
    }

    #[tokio::test]
    async fn test_list_degrades_to_empty() {
        let fs = Arc::new(MemoryFileSystem::failing_listing());
        fs.insert(named_secrets("a"), INSTALLED_SECRETS);
        let store = store_with(fs);

        assert!(store.list_identities().await.is_empty());
    }
}
