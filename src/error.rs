//! Error handling for netool
//!
//! Input-format errors are raised before any probe is sent, resolution errors
//! abort a single lookup, and probe failures never show up here at all: a
//! probe that fails is simply classified as unreachable.

use thiserror::Error;

/// Main error type for scanning and lookup operations
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Invalid port specification: {0}")]
    InvalidPortSpec(String),

    #[error("Invalid domain: {0}")]
    InvalidDomain(String),

    #[error("Invalid host: {0}")]
    InvalidHost(String),

    #[error("Host limit exceeded: {0}")]
    HostLimitExceeded(String),

    #[error("Resolution error: {0}")]
    Resolution(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Output error: {0}")]
    OutputError(String),
}

impl ScanError {
    /// True for malformed user input (CIDR, port spec, domain or host syntax).
    ///
    /// These are always detected before the first probe goes out.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            ScanError::InvalidRange(_)
                | ScanError::InvalidPortSpec(_)
                | ScanError::InvalidDomain(_)
                | ScanError::InvalidHost(_)
        )
    }
}

/// Convert common errors to ScanError
impl From<std::net::AddrParseError> for ScanError {
    fn from(e: std::net::AddrParseError) -> Self {
        ScanError::InvalidHost(e.to_string())
    }
}

impl From<std::num::ParseIntError> for ScanError {
    fn from(e: std::num::ParseIntError) -> Self {
        ScanError::InvalidPortSpec(e.to_string())
    }
}

impl From<toml::de::Error> for ScanError {
    fn from(e: toml::de::Error) -> Self {
        ScanError::ConfigError(e.to_string())
    }
}

impl From<csv::Error> for ScanError {
    fn from(e: csv::Error) -> Self {
        ScanError::OutputError(e.to_string())
    }
}

impl From<serde_json::Error> for ScanError {
    fn from(e: serde_json::Error) -> Self {
        ScanError::OutputError(e.to_string())
    }
}
