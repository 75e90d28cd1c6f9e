//! Error types for source adapter operations.

use std::fmt;
use thiserror::Error;

/// The reason a fetch failed.
///
/// This is the full error vocabulary adapters are allowed to report; the
/// orchestrator folds every one of these into a partial sync rather than
/// crashing the cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchErrorCode {
    /// Credentials are expired or invalid. The caller must re-authenticate
    /// and re-invoke the sync; adapters never refresh internally.
    AuthExpired,
    /// Connection failed, timed out, or the origin returned a server error.
    Network,
    /// The origin rejected the request due to rate limiting.
    RateLimited,
    /// The origin responded with a payload the adapter could not parse.
    InvalidResponse,
}

impl FetchErrorCode {
    /// Returns `true` if the operation may be retried as-is.
    ///
    /// `AuthExpired` is not retryable: the same request will keep failing
    /// until the caller refreshes credentials.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network | Self::RateLimited | Self::InvalidResponse)
    }

    /// Returns the wire name for this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthExpired => "auth_expired",
            Self::Network => "network",
            Self::RateLimited => "rate_limited",
            Self::InvalidResponse => "invalid_response",
        }
    }
}

impl fmt::Display for FetchErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error that occurred while fetching from an event source.
#[derive(Debug, Error)]
pub struct FetchError {
    /// The reason category.
    code: FetchErrorCode,
    /// A human-readable message.
    message: String,
    /// The adapter that produced this error.
    adapter: Option<String>,
    /// The underlying cause, if any.
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl FetchError {
    /// Creates a new fetch error with the given code and message.
    pub fn new(code: FetchErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            adapter: None,
            source: None,
        }
    }

    /// Creates an auth-expired error.
    pub fn auth_expired(message: impl Into<String>) -> Self {
        Self::new(FetchErrorCode::AuthExpired, message)
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(FetchErrorCode::Network, message)
    }

    /// Creates a rate-limit error.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(FetchErrorCode::RateLimited, message)
    }

    /// Creates an invalid-response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(FetchErrorCode::InvalidResponse, message)
    }

    /// Sets the adapter name for this error.
    pub fn with_adapter(mut self, adapter: impl Into<String>) -> Self {
        self.adapter = Some(adapter.into());
        self
    }

    /// Sets the underlying cause.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error code.
    pub fn code(&self) -> FetchErrorCode {
        self.code
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the adapter name, if set.
    pub fn adapter(&self) -> Option<&str> {
        self.adapter.as_deref()
    }

    /// Returns `true` if the fetch may be retried without re-authenticating.
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref adapter) = self.adapter {
            write!(f, "[{}] ", adapter)?;
        }
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// A specialized Result type for adapter operations.
pub type FetchResult<T> = Result<T, FetchError>;
