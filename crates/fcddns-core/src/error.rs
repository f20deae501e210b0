//! Error types for the DDNS gateway
//!
//! Every error ends up as a [`crate::DdnsResponse`]; [`Error::status_code`]
//! decides whether the caller or the backend is to blame.

use thiserror::Error;

use crate::token::TokenError;

/// Result type alias for DDNS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the DDNS gateway
#[derive(Error, Debug)]
pub enum Error {
    /// Request path is not `/ddns/v1/{token}[/{ip}]`
    #[error("invalid path: {0}")]
    BadPath(String),

    /// Token could not be verified
    #[error("failed to parse token: {0}")]
    Token(#[from] TokenError),

    /// Token verified but required claims are missing
    #[error("invalid claims: host: {host}, domain: {domain}")]
    InvalidClaims {
        /// Host claim as received
        host: String,
        /// Domain claim as received
        domain: String,
    },

    /// No IP in the path, the claims, or the connection
    #[error("client ip not found")]
    MissingIp,

    /// No operator configured for the domain and no wildcard
    #[error("operator not found for domain: {0}")]
    OperatorNotFound(String),

    /// More than one active A record matches the FQDN
    #[error("multiple A records found for {fqdn} ({count}), refusing to pick one")]
    AmbiguousRecord {
        /// The FQDN that matched more than once
        fqdn: String,
        /// Number of matching records
        count: usize,
    },

    /// A provider call failed
    #[error("failed to {operation} A record for {fqdn}: {message}")]
    Backend {
        /// Operation that failed (list, create, update)
        operation: &'static str,
        /// Target FQDN
        fqdn: String,
        /// Provider error message
        message: String,
    },

    /// Building the authenticated provider client failed
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Provider-level failure outside the list/create/update primitives
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// The provider call did not finish before the deadline
    #[error("update of {fqdn} timed out after {secs}s")]
    Timeout {
        /// Target FQDN
        fqdn: String,
        /// Deadline in seconds
        secs: u64,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a bad path error
    pub fn bad_path(path: impl Into<String>) -> Self {
        Self::BadPath(path.into())
    }

    /// Create a backend error for one of the reconciler primitives
    pub fn backend(operation: &'static str, fqdn: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend {
            operation,
            fqdn: fqdn.into(),
            message: message.into(),
        }
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Attach the failed primitive and its FQDN to a backend error
    ///
    /// Provider messages become [`Error::Backend`]; authentication failures
    /// and other typed errors pass through unchanged.
    pub fn in_operation(self, operation: &'static str, fqdn: &str) -> Self {
        match self {
            Self::Provider { message, .. } => Self::backend(operation, fqdn, message),
            other => other,
        }
    }

    /// HTTP status code for this error
    ///
    /// Client-caused problems and ambiguity refusals are 400; anything the
    /// provider or the deployment got wrong is 500.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadPath(_)
            | Self::Token(_)
            | Self::InvalidClaims { .. }
            | Self::MissingIp
            | Self::OperatorNotFound(_)
            | Self::AmbiguousRecord { .. } => 400,
            Self::Backend { .. }
            | Self::Authentication(_)
            | Self::Provider { .. }
            | Self::Timeout { .. }
            | Self::Config(_) => 500,
        }
    }
}
