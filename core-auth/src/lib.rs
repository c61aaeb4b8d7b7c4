//! # Authentication Module
//!
//! Multi-client Google OAuth 2.0 credentials for Docs and Drive access.
//!
//! ## Overview
//!
//! Each client identity is a pair of files: the client secrets downloaded from
//! the Google Cloud console and the refresh token obtained by authorizing it.
//! The [`CredentialStore`] maps identity names to those files, and the
//! [`Authorizer`] turns a name into an [`AuthorizedClient`], running the
//! interactive consent flow when no saved token exists.
//!
//! ## Features
//!
//! - Default identity plus any number of named identities
//! - Authorization code flow with PKCE and offline access
//! - Out-of-band redirect for installed clients, declared redirect for web clients
//! - On-demand in-memory access token refresh
//!
//! ## Usage
//!
//! ```no_run
//! use core_auth::Authorizer;
//! use core_runtime::AuthConfig;
//!
//! # async fn example() -> core_auth::Result<()> {
//! let config = AuthConfig::from_env("/srv/docs-helper")?;
//! let authorizer = Authorizer::new(&config);
//!
//! let (client, name) = authorizer.create_new_identity(Some("team")).await?;
//! for identity in authorizer.list_identities().await {
//!     println!("{identity}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod authorizer;
pub mod client;
pub mod credential_store;
pub mod error;
pub mod oauth;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use authorizer::{AuthorizationStep, Authorizer};
pub use client::AuthorizedClient;
pub use credential_store::CredentialStore;
pub use error::{AuthError, Result};
pub use oauth::{OAuthConfig, OAuthFlowManager, PkceVerifier};
pub use types::{ClientIdentity, ClientType, TokenRecord};
