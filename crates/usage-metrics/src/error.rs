//! Error types for usage-metrics

use thiserror::Error;

/// Result type alias using usage-metrics' Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for usage-metrics operations
///
/// Display formatting never fails, so there is no variant for it.
#[derive(Error, Debug)]
pub enum Error {
    /// Service-account credentials are missing, malformed, or unusable
    #[error("Credential error: {0}")]
    Credential(String),

    /// Token endpoint rejected the assertion or could not be reached
    #[error("Authentication failed: {message}")]
    Auth {
        /// Human-readable reason
        message: String,
        /// HTTP status returned by the token endpoint, if any
        status: Option<u16>,
        /// Upstream error payload, if any
        upstream: Option<serde_json::Value>,
    },

    /// A single report query failed
    #[error("Report query '{report}' failed: {message}")]
    ReportQuery {
        /// Name of the report that failed
        report: String,
        /// Human-readable reason
        message: String,
        /// Upstream error payload, if any
        upstream: Option<serde_json::Value>,
        /// Whether the query was cancelled by its timeout
        timed_out: bool,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a credential error
    pub fn credential(msg: impl Into<String>) -> Self {
        Self::Credential(msg.into())
    }

    /// Create an auth error without an upstream response
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth {
            message: msg.into(),
            status: None,
            upstream: None,
        }
    }

    /// Create a report query error without an upstream response
    pub fn report_query(report: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::ReportQuery {
            report: report.into(),
            message: msg.into(),
            upstream: None,
            timed_out: false,
        }
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Upstream payload attached to this error, if any
    pub fn upstream(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Auth { upstream, .. } | Self::ReportQuery { upstream, .. } => upstream.as_ref(),
            _ => None,
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
