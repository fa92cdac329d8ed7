//! Error types for membership reconciliation.
//!
//! Errors are categorized so callers can tell a missing remote object from a
//! real failure, and so transport layers can decide what is worth retrying.

use crate::outcome::OperationFailure;
use crate::types::MemberKind;
use std::fmt;

/// Result type alias for membership operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of directory errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The remote object does not exist (HTTP 404).
    NotFound,
    /// Connection, DNS or timeout problems.
    Network,
    /// Credentials rejected (HTTP 401/403).
    Auth,
    /// Request rejected by the directory (other 4xx).
    Client,
    /// Directory-side failure (5xx, 429).
    Server,
    /// Everything else.
    Other,
}

impl ErrorCategory {
    /// Whether this error category is typically transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network | Self::Server)
    }

    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::NotFound => "Object not found",
            Self::Network => "Network connectivity issue",
            Self::Auth => "Authentication failed",
            Self::Client => "Request rejected",
            Self::Server => "Directory service error",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::NotFound => "Verify the application, user and group ids exist",
            Self::Network => "Check your connection to the directory and try again",
            Self::Auth => "Check that the API token is set and still valid",
            Self::Client => "Check the request details in the error message",
            Self::Server => "The directory is struggling, try again later",
            Self::Other => "Check the error details for more information",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while reconciling memberships.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The remote object does not exist.
    #[error("not found: {resource}")]
    NotFound {
        /// What was looked up.
        resource: String,
    },

    /// HTTP request failed.
    #[error("HTTP request failed: {message}")]
    Http {
        /// Error message.
        message: String,
        /// HTTP status code if available.
        status: Option<u16>,
    },

    /// Response could not be understood.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Enumerating the existing assignments failed; nothing was changed.
    #[error("failed to list application {}: {source}", .kind.plural())]
    Listing {
        /// Which listing failed.
        kind: MemberKind,
        /// Underlying error.
        #[source]
        source: Box<Error>,
    },

    /// One or more operations of a pass failed.
    #[error("{}", format_failures(.context, .failures, .total))]
    Aggregate {
        /// Caller-supplied context message.
        context: String,
        /// Every failed operation with its original error.
        failures: Vec<OperationFailure>,
        /// Number of operations in the pass.
        total: usize,
    },

    /// The worker pool could not be created.
    #[error("failed to create worker pool: {0}")]
    Pool(String),

    /// Invalid configuration passed to the directory client.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Generic error.
    #[error("{0}")]
    Other(String),
}

fn format_failures(context: &str, failures: &[OperationFailure], total: &usize) -> String {
    let details: Vec<String> = failures.iter().map(ToString::to_string).collect();
    format!(
        "{context}: {} of {total} operations failed: {}",
        failures.len(),
        details.join("; ")
    )
}

impl Error {
    /// Create a not-found error.
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create an HTTP error.
    pub fn http(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Http {
            message: message.into(),
            status,
        }
    }

    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::NotFound { .. } => ErrorCategory::NotFound,
            Error::Http { status, .. } => match status {
                None => ErrorCategory::Network,
                Some(404) => ErrorCategory::NotFound,
                Some(401 | 403) => ErrorCategory::Auth,
                Some(429) => ErrorCategory::Server,
                Some(s) if *s >= 500 => ErrorCategory::Server,
                Some(_) => ErrorCategory::Client,
            },
            Error::Listing { source, .. } => source.category(),
            _ => ErrorCategory::Other,
        }
    }

    /// Whether the remote object was missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Whether this error is typically transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(404) => Self::not_found("HTTP 404"),
            ureq::Error::StatusCode(code) => Self::Http {
                message: format!("HTTP {code}"),
                status: Some(code),
            },
            other => Self::Http {
                message: other.to_string(),
                status: None,
            },
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}
