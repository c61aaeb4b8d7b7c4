//! Workspace facade crate.
//!
//! Re-exports the authorization surface so host applications can depend on
//! `docs-auth-workspace` alone. The default `desktop-shims` feature wires the
//! `bridge-desktop` implementations in as the default bridges of
//! [`AuthConfig`].
//!
//! ```no_run
//! use docs_auth_workspace::{AuthConfig, Authorizer};
//!
//! # async fn example() -> docs_auth_workspace::core_auth::Result<()> {
//! let config = AuthConfig::from_env(".")?;
//! let client = Authorizer::new(&config).load_identity("work").await?;
//! let token = client.access_token().await?;
//! # Ok(())
//! # }
//! ```

pub use bridge_traits;
pub use core_auth;
pub use core_runtime;

#[cfg(feature = "desktop-shims")]
pub use bridge_desktop;

pub use core_auth::{
    AuthError, AuthorizationStep, AuthorizedClient, Authorizer, ClientIdentity, ClientType,
    CredentialStore, TokenRecord,
};
pub use core_runtime::logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
pub use core_runtime::AuthConfig;
