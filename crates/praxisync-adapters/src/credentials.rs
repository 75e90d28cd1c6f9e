//! Credential provider boundary.
//!
//! The OAuth handshake itself lives outside this crate; adapters only need
//! a bearer token per request. [`CredentialProvider`] is the seam where the
//! surrounding service plugs its token management in. An expired token is
//! reported as [`FetchError::auth_expired`] so the caller can refresh and
//! re-invoke the whole sync.

use chrono::{DateTime, Utc};

use crate::error::{FetchError, FetchResult};

/// Supplies access tokens to HTTP adapters.
pub trait CredentialProvider: Send + Sync {
    /// Returns a bearer token valid for the next request.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::auth_expired`] when no valid token is
    /// available. Implementations must not block on interactive flows.
    fn access_token(&self) -> FetchResult<String>;
}

/// A fixed token, optionally with an expiry.
///
/// Backs config-file tokens and tests. With an expiry set, the token stops
/// being served once the expiry passes.
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    token: String,
    expires_at: Option<DateTime<Utc>>,
}

impl StaticCredentials {
    /// Creates credentials that never expire.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            expires_at: None,
        }
    }

    /// Builder method to set the expiry.
    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Returns `true` if the token is past its expiry.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() >= expires_at,
            None => false,
        }
    }
}

impl CredentialProvider for StaticCredentials {
    fn access_token(&self) -> FetchResult<String> {
        if self.is_expired() {
            return Err(FetchError::auth_expired("access token expired"));
        }
        Ok(self.token.clone())
    }
}
