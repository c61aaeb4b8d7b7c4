//! # Core Runtime Module
//!
//! Foundational runtime infrastructure shared by the authorization crates:
//! - Configuration (`AuthConfig`): credential paths plus the host bridges
//! - Logging and tracing setup
//!
//! ## Overview
//!
//! Nothing in the workspace reads process-wide state on its own. The
//! credentials directory is resolved once, when an `AuthConfig` is built, and
//! the resulting struct is handed to every component that needs it.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{AuthConfig, AuthConfigBuilder, CREDENTIALS_DIR_ENV};
pub use error::{Error, Result};
