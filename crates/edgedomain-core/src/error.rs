//! Error types for the edgedomain system
//!
//! This module defines all error types used throughout the crate.
//!
//! Two layers exist:
//! - [`ProviderError`]: the raw failure of a single remote call, carrying the
//!   provider's structured error code when one was returned
//! - [`Error`]: the classified failure surfaced to callers of the lifecycle
//!   operations
//!
//! ## Known fragility
//!
//! Some provider conditions have no structured code. "Record not found" on a
//! record-set DELETE and "replicated function" on a function delete are only
//! recognizable by scanning the message text. Those checks live in
//! [`ProviderError::is_not_found`] and [`ProviderError::is_replicated_function`]
//! and will break if the provider rewords its messages.

use std::fmt;
use thiserror::Error;

/// Result type alias for edgedomain operations
pub type Result<T> = std::result::Result<T, Error>;

/// Provider error codes that signal throttling and are safe to retry
pub const RETRYABLE_CODES: [&str; 3] = [
    "Throttling",
    "RequestLimitExceeded",
    "TooManyRequestsException",
];

/// Provider error codes that mean "the resource does not exist"
const NOT_FOUND_CODES: [&str; 4] = [
    "NoSuchEntity",
    "ResourceNotFoundException",
    "NotFoundException",
    "NoSuchHostedZone",
];

/// Failure of a single remote provider call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    /// Structured error code, if the provider returned one
    pub code: Option<String>,
    /// Human-readable message from the provider
    pub message: String,
}

impl ProviderError {
    /// Create an error with a structured code
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }

    /// Create an error that carries only a message
    pub fn uncoded(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    /// Whether the provider asked us to slow down
    pub fn is_retryable(&self) -> bool {
        self.code
            .as_deref()
            .is_some_and(|code| RETRYABLE_CODES.contains(&code))
    }

    /// Whether the target resource does not exist
    ///
    /// Structured codes are checked first; the message scan is the fallback
    /// for record-set changes, which report absence inside a generic
    /// `InvalidChangeBatch` error.
    pub fn is_not_found(&self) -> bool {
        if self
            .code
            .as_deref()
            .is_some_and(|code| NOT_FOUND_CODES.contains(&code))
        {
            return true;
        }
        self.message.to_ascii_lowercase().contains("not found")
    }

    /// Whether a function delete was refused because replicas still exist
    pub fn is_replicated_function(&self) -> bool {
        self.message.contains("replicated function")
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{}: {}", code, self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for ProviderError {}

/// Core error type for the edgedomain system
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or malformed configuration, reported before any provider call
    #[error("Configuration error: {0}")]
    Config(String),

    /// No hosted zone owns the domain
    #[error("Could not find hosted zone for \"{domain}\"")]
    ZoneNotFound {
        /// Domain that was being resolved
        domain: String,
    },

    /// A provider call failed and was not absorbed or retried away
    #[error("Failed to {operation} {target}: {source}")]
    Provider {
        /// Operation that was attempted
        operation: String,
        /// Resource the operation targeted
        target: String,
        /// Last error observed from the provider
        #[source]
        source: ProviderError,
    },

    /// The edge function cannot be deleted while a distribution still uses it
    #[error(
        "Cannot delete edge function {function_name} because it is still attached to your \
         distribution. Detach it first (edit the distribution's behaviors and remove the \
         function association), wait for the change to deploy, then run this command again."
    )]
    FunctionStillAttached {
        /// Name of the function that is still replicated
        function_name: String,
    },

    /// The edge function has no immutable published version
    #[error(
        "Could not find a published version of edge function {function_name}. \
         Run create-edge-function before attaching it to a distribution."
    )]
    VersionNotFound {
        /// Name of the function that was looked up
        function_name: String,
    },

    /// The deployed stack does not expose the distribution domain
    #[error(
        "Could not find output \"{output_key}\" in deployed stack {stack_name}. Ensure the \
         distribution domain name is defined as a stack output under that key."
    )]
    DistributionNotFound {
        /// Stack that was inspected
        stack_name: String,
        /// Output key that was expected
        output_key: String,
    },

    /// Filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Wrap a provider failure with the operation and target it belonged to
    pub fn provider(
        operation: impl Into<String>,
        target: impl Into<String>,
        source: ProviderError,
    ) -> Self {
        Self::Provider {
            operation: operation.into(),
            target: target.into(),
            source,
        }
    }

    /// The underlying provider failure, if this error wraps one
    pub fn provider_error(&self) -> Option<&ProviderError> {
        match self {
            Self::Provider { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Whether this is a configuration error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throttling_codes_are_retryable() {
        for code in RETRYABLE_CODES {
            assert!(ProviderError::new(code, "slow down").is_retryable());
        }
        assert!(!ProviderError::new("AccessDenied", "no").is_retryable());
        assert!(!ProviderError::uncoded("Throttling").is_retryable());
    }

    #[test]
    fn not_found_prefers_codes_then_message() {
        assert!(ProviderError::new("NoSuchEntity", "role missing").is_not_found());
        assert!(
            ProviderError::new(
                "InvalidChangeBatch",
                "Tried to delete resource record set [name='a.example.com.', type='A'] but it was not found"
            )
            .is_not_found()
        );
        assert!(!ProviderError::new("InvalidChangeBatch", "conflicting change").is_not_found());
    }

    #[test]
    fn replicated_function_is_detected_from_message() {
        let err = ProviderError::new(
            "InvalidParameterValueException",
            "Lambda was unable to delete arn:aws:lambda:us-east-1:1:function:x:1 because it is a replicated function.",
        );
        assert!(err.is_replicated_function());
        assert!(!ProviderError::new("InvalidParameterValueException", "bad").is_replicated_function());
    }

    #[test]
    fn provider_error_display_includes_code() {
        assert_eq!(
            ProviderError::new("Throttling", "Rate exceeded").to_string(),
            "Throttling: Rate exceeded"
        );
        assert_eq!(ProviderError::uncoded("boom").to_string(), "boom");
    }

    #[test]
    fn wrapped_provider_error_keeps_context() {
        let err = Error::provider(
            "UPSERT records for",
            "www.example.com",
            ProviderError::new("AccessDenied", "nope"),
        );
        assert_eq!(
            err.to_string(),
            "Failed to UPSERT records for www.example.com: AccessDenied: nope"
        );
        assert_eq!(err.provider_error().and_then(|e| e.code.as_deref()), Some("AccessDenied"));
    }
}
