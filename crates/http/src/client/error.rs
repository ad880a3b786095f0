//! Client error types

use portal_core::CoreError;
use reqwest::StatusCode;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Category a failed call is classified into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Session invalid and could not be renewed
    Unauthenticated,
    /// Authenticated but not allowed
    PermissionDenied,
    NotFound,
    RateLimited,
    /// Caller supplied data was rejected (400/422)
    Validation,
    Server,
    /// No response was received at all
    Network,
    /// Any other non-success status
    Http,
}

impl ErrorKind {
    /// Classify an HTTP status code
    pub fn from_status(status: StatusCode) -> Self {
        match status.as_u16() {
            400 | 422 => Self::Validation,
            401 => Self::Unauthenticated,
            403 => Self::PermissionDenied,
            404 => Self::NotFound,
            429 => Self::RateLimited,
            500..=599 => Self::Server,
            _ => Self::Http,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unauthenticated => "Unauthenticated",
            Self::PermissionDenied => "Permission denied",
            Self::NotFound => "Not found",
            Self::RateLimited => "Rate limited",
            Self::Validation => "Validation error",
            Self::Server => "Server error",
            Self::Network => "Network error",
            Self::Http => "HTTP error",
        };
        f.write_str(name)
    }
}

/// A classified failure of one API call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub kind: ErrorKind,
    /// HTTP status, or the status equivalent of an embedded error code
    pub status: Option<u16>,
    /// Message reported by the server (or the transport)
    pub message: String,
    pub trace_id: Option<String>,
    pub retry_after: Option<Duration>,
    pub(crate) handled: bool,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
            trace_id: None,
            retry_after: None,
            handled: false,
        }
    }

    pub fn from_status(status: StatusCode, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::from_status(status), message).with_status(status.as_u16())
    }

    /// Transport failure with no response
    pub fn network(error: &reqwest::Error) -> Self {
        let message = if error.is_timeout() {
            format!("Request timed out: {error}")
        } else {
            format!("Request failed: {error}")
        };
        Self::new(ErrorKind::Network, message)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_trace_id(mut self, trace_id: Option<String>) -> Self {
        self.trace_id = trace_id;
        self
    }

    pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
        self.retry_after = retry_after;
        self
    }

    /// True once the session layer has already notified the user about this
    /// failure, so call-site handlers should not notify again
    pub fn is_handled(&self) -> bool {
        self.handled
    }

    /// Text suitable for showing to the user
    pub fn user_message(&self) -> String {
        let or = |fallback: &str| {
            if self.message.trim().is_empty() {
                fallback.to_string()
            } else {
                self.message.clone()
            }
        };

        match self.kind {
            ErrorKind::Unauthenticated => {
                "Your session has expired. Please sign in again.".to_string()
            }
            ErrorKind::PermissionDenied => {
                or("You do not have permission to perform this action.")
            }
            ErrorKind::NotFound => or("The requested resource was not found."),
            ErrorKind::RateLimited => match self.retry_after {
                Some(after) => format!(
                    "Too many requests. Please try again in {} seconds.",
                    after.as_secs()
                ),
                None => "Too many requests. Please try again later.".to_string(),
            },
            ErrorKind::Validation => or("The submitted data is invalid."),
            ErrorKind::Server => match self.status {
                Some(502..=504) => {
                    "Service temporarily unavailable. Please try again later.".to_string()
                }
                _ => "Internal server error. Please contact the administrator.".to_string(),
            },
            ErrorKind::Network => "Network error. Please check your connection.".to_string(),
            ErrorKind::Http => match self.status {
                Some(status) => or(&format!("Request failed with status {status}.")),
                None => or("Request failed."),
            },
        }
    }
}

/// Client error types
#[derive(Debug, Error)]
pub enum ClientError {
    /// The call failed and was classified
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Response body did not match the expected type
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Credential persistence failed
    #[error("Credential store error: {0}")]
    Storage(#[from] CoreError),

    /// The underlying HTTP client could not be constructed
    #[error("Failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
}

impl ClientError {
    pub fn api(&self) -> Option<&ApiError> {
        match self {
            Self::Api(error) => Some(error),
            _ => None,
        }
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        self.api().map(|e| e.kind)
    }

    pub fn status(&self) -> Option<u16> {
        self.api().and_then(|e| e.status)
    }

    /// True when the session is gone and the user has to sign in again
    pub fn is_auth_expired(&self) -> bool {
        self.kind() == Some(ErrorKind::Unauthenticated)
    }

    pub fn is_handled(&self) -> bool {
        self.api().is_some_and(ApiError::is_handled)
    }
}
