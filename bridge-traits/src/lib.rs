//! # Host Bridge Traits
//!
//! Capability traits the authorization core depends on but that the host
//! process provides.
//!
//! ## Overview
//!
//! The credential store and authorizer never touch `reqwest`, `tokio::fs` or a
//! terminal directly. Each of those concerns sits behind a trait defined here,
//! so the core can be driven by desktop adapters (`bridge-desktop`) in
//! production and by in-memory fakes in tests.
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - Token endpoint requests
//! - [`FileSystemAccess`](storage::FileSystemAccess) - Secrets and token file I/O
//! - [`CodePrompt`](prompt::CodePrompt) - Operator interaction during the
//!   authorization-code flow
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should convert platform errors into it and keep paths or status codes in
//! the message so the caller can act on them.
//!
//! ## Thread Safety
//!
//! Every trait requires `Send + Sync` so implementations can be shared behind
//! `Arc` across async tasks.
//!
//! ## Examples
//!
//! ### Implementing CodePrompt
//!
//! ```ignore
//! use bridge_traits::prompt::CodePrompt;
//! use bridge_traits::error::Result;
//! use async_trait::async_trait;
//!
//! pub struct FixedCode(String);
//!
//! #[async_trait]
//! impl CodePrompt for FixedCode {
//!     async fn prompt_for_code(&self, _authorization_url: &str) -> Result<String> {
//!         Ok(self.0.clone())
//!     }
//! }
//! ```

pub mod error;
pub mod http;
pub mod prompt;
pub mod storage;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use prompt::CodePrompt;
pub use storage::FileSystemAccess;
