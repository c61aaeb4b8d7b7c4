//! Runtime errors: configuration building and logging setup.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Paths could not be derived or a configured value is unusable.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A bridge was not injected and no desktop default is compiled in.
    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    /// Subscriber installation or filter parsing failed.
    #[error("Logging error: {0}")]
    Logging(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
