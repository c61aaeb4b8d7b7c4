//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest`
//! - `FileSystemAccess` using `tokio::fs`
//! - `CodePrompt` reading the authorization code from stdin
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{ReqwestHttpClient, StdinCodePrompt, TokioFileSystem};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let http_client = ReqwestHttpClient::new()?;
//!     let fs = TokioFileSystem::new();
//!     let prompt = StdinCodePrompt::new();
//!
//!     // Hand these to core_runtime::config::AuthConfig::builder()
//!     Ok(())
//! }
//! ```

mod filesystem;
mod http;
mod prompt;

pub use filesystem::TokioFileSystem;
pub use http::ReqwestHttpClient;
pub use prompt::StdinCodePrompt;
