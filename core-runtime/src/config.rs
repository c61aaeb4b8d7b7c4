//! # Authorization Configuration
//!
//! Explicit configuration shared by the credential store and the authorizer.
//!
//! ## Overview
//!
//! [`AuthConfig`] holds the resolved credential file locations together with
//! the host bridges (`HttpClient`, `FileSystemAccess`, `CodePrompt`). It is
//! built once at startup with [`AuthConfigBuilder`] and passed by reference to
//! each component, so there is no hidden process-wide path state.
//!
//! ## File Layout
//!
//! | Identity | Secrets file | Token file |
//! |----------|--------------|------------|
//! | default  | `<project_root>/credentials.json` | `<project_root>/token.json` |
//! | `name`   | `<credentials_dir>/name.credentials.json` | `<credentials_dir>/name.token.json` |
//!
//! `credentials_dir` defaults to `<project_root>/credentials` and can be
//! overridden by the `GOOGLE_CREDENTIALS_DIR` environment variable.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::AuthConfig;
//!
//! // Desktop defaults for every bridge, env override honoured
//! let config = AuthConfig::from_env("/srv/docs-helper")?;
//!
//! // Fully explicit
//! let config = AuthConfig::builder()
//!     .project_root("/srv/docs-helper")
//!     .credentials_dir("/var/lib/docs-helper/clients")
//!     .http_client(http_client)
//!     .file_system(file_system)
//!     .code_prompt(prompt)
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{CodePrompt, FileSystemAccess, HttpClient};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Environment variable that overrides the credentials directory.
pub const CREDENTIALS_DIR_ENV: &str = "GOOGLE_CREDENTIALS_DIR";

const CREDENTIALS_DIR_NAME: &str = "credentials";
const DEFAULT_SECRETS_FILE: &str = "credentials.json";
const DEFAULT_TOKEN_FILE: &str = "token.json";

/// Resolved configuration for credential storage and authorization.
#[derive(Clone)]
pub struct AuthConfig {
    /// Directory holding `<name>.credentials.json` / `<name>.token.json`
    pub credentials_dir: PathBuf,

    /// Secrets file of the default identity, also the template copied for new identities
    pub default_secrets_path: PathBuf,

    /// Token file of the default identity
    pub default_token_path: PathBuf,

    /// HTTP client used for token endpoint requests
    pub http_client: Arc<dyn HttpClient>,

    /// File system used for all secrets and token I/O
    pub file_system: Arc<dyn FileSystemAccess>,

    /// Source of authorization codes for the interactive flow
    pub code_prompt: Arc<dyn CodePrompt>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("credentials_dir", &self.credentials_dir)
            .field("default_secrets_path", &self.default_secrets_path)
            .field("default_token_path", &self.default_token_path)
            .field("http_client", &"HttpClient { ... }")
            .field("file_system", &"FileSystemAccess { ... }")
            .field("code_prompt", &"CodePrompt { ... }")
            .finish()
    }
}

impl AuthConfig {
    /// Creates a new builder for constructing an `AuthConfig`.
    pub fn builder() -> AuthConfigBuilder {
        AuthConfigBuilder::default()
    }

    /// Builds a configuration rooted at `project_root`, honouring
    /// `GOOGLE_CREDENTIALS_DIR` and using the default desktop bridges.
    ///
    /// Requires the `desktop-shims` feature for the bridges; without it the
    /// call fails with [`Error::CapabilityMissing`].
    pub fn from_env(project_root: impl Into<PathBuf>) -> Result<Self> {
        Self::builder()
            .project_root(project_root)
            .credentials_dir_from_env()
            .build()
    }

    /// Validates the resolved paths.
    pub fn validate(&self) -> Result<()> {
        if self.credentials_dir.as_os_str().is_empty() {
            return Err(Error::Config(
                "Credentials directory cannot be empty".to_string(),
            ));
        }

        if self.default_secrets_path.as_os_str().is_empty() {
            return Err(Error::Config(
                "Default secrets path cannot be empty".to_string(),
            ));
        }

        if self.default_token_path.as_os_str().is_empty() {
            return Err(Error::Config(
                "Default token path cannot be empty".to_string(),
            ));
        }

        if self.default_secrets_path == self.default_token_path {
            return Err(Error::Config(format!(
                "Default secrets and token files must differ (both are {})",
                self.default_secrets_path.display()
            )));
        }

        Ok(())
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::new()
        .map_err(|e| Error::Internal(format!("Failed to create default HttpClient: {}", e)))?;
    Ok(Arc::new(client))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(capability_missing("HttpClient", "token endpoint requests"))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_file_system() -> Result<Arc<dyn FileSystemAccess>> {
    Ok(Arc::new(bridge_desktop::TokioFileSystem::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_file_system() -> Result<Arc<dyn FileSystemAccess>> {
    Err(capability_missing("FileSystemAccess", "secrets and token files"))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_code_prompt() -> Result<Arc<dyn CodePrompt>> {
    Ok(Arc::new(bridge_desktop::StdinCodePrompt::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_code_prompt() -> Result<Arc<dyn CodePrompt>> {
    Err(capability_missing("CodePrompt", "the interactive authorization flow"))
}

#[cfg(not(feature = "desktop-shims"))]
fn capability_missing(capability: &str, purpose: &str) -> Error {
    Error::CapabilityMissing {
        capability: capability.to_string(),
        message: format!(
            "{} implementation is required for {}. \
             Enable the 'desktop-shims' feature to use the bridge-desktop default \
             or inject an implementation through AuthConfigBuilder.",
            capability, purpose
        ),
    }
}

/// Builder for constructing [`AuthConfig`] instances.
///
/// Paths that are not set explicitly are derived from the project root.
/// Bridges that are not set fall back to the desktop defaults when the
/// `desktop-shims` feature is enabled.
#[derive(Default)]
pub struct AuthConfigBuilder {
    project_root: Option<PathBuf>,
    credentials_dir: Option<PathBuf>,
    default_secrets_path: Option<PathBuf>,
    default_token_path: Option<PathBuf>,
    http_client: Option<Arc<dyn HttpClient>>,
    file_system: Option<Arc<dyn FileSystemAccess>>,
    code_prompt: Option<Arc<dyn CodePrompt>>,
}

impl AuthConfigBuilder {
    /// Sets the project root used to derive default paths.
    pub fn project_root<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.project_root = Some(path.into());
        self
    }

    /// Sets the credentials directory explicitly.
    pub fn credentials_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.credentials_dir = Some(path.into());
        self
    }

    /// Applies `GOOGLE_CREDENTIALS_DIR` if it is set and non-empty.
    pub fn credentials_dir_from_env(self) -> Self {
        let value = std::env::var_os(CREDENTIALS_DIR_ENV);
        self.credentials_dir_override(value)
    }

    fn credentials_dir_override(self, value: Option<OsString>) -> Self {
        match value {
            Some(dir) if !dir.is_empty() => self.credentials_dir(dir),
            _ => self,
        }
    }

    /// Sets the default identity's secrets file (and registration template).
    pub fn default_secrets_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.default_secrets_path = Some(path.into());
        self
    }

    /// Sets the default identity's token file.
    pub fn default_token_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.default_token_path = Some(path.into());
        self
    }

    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn file_system(mut self, file_system: Arc<dyn FileSystemAccess>) -> Self {
        self.file_system = Some(file_system);
        self
    }

    pub fn code_prompt(mut self, prompt: Arc<dyn CodePrompt>) -> Self {
        self.code_prompt = Some(prompt);
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if a path cannot be derived because no project root
    ///   was set, or if the resolved paths fail validation
    /// - [`Error::CapabilityMissing`] if a bridge is missing and no default exists
    pub fn build(self) -> Result<AuthConfig> {
        let root = self.project_root.as_deref();

        let credentials_dir = resolve_path(self.credentials_dir, root, CREDENTIALS_DIR_NAME)?;
        let default_secrets_path =
            resolve_path(self.default_secrets_path, root, DEFAULT_SECRETS_FILE)?;
        let default_token_path = resolve_path(self.default_token_path, root, DEFAULT_TOKEN_FILE)?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };
        let file_system = match self.file_system {
            Some(fs) => fs,
            None => provide_default_file_system()?,
        };
        let code_prompt = match self.code_prompt {
            Some(prompt) => prompt,
            None => provide_default_code_prompt()?,
        };

        let config = AuthConfig {
            credentials_dir,
            default_secrets_path,
            default_token_path,
            http_client,
            file_system,
            code_prompt,
        };

        config.validate()?;
        Ok(config)
    }
}

fn resolve_path(explicit: Option<PathBuf>, root: Option<&Path>, relative: &str) -> Result<PathBuf> {
    match (explicit, root) {
        (Some(path), _) => Ok(path),
        (None, Some(root)) => Ok(root.join(relative)),
        (None, None) => Err(Error::Config(format!(
            "Cannot derive location of '{}': set a project root or an explicit path",
            relative
        ))),
    }
}
