//! SourceAdapter trait definition.
//!
//! A [`SourceAdapter`] is the boundary to one event origin. Adapters are
//! fetch-and-normalize only:
//! - they translate the origin's wire shapes into canonical [`Event`]s,
//! - they report failures through the [`FetchError`] taxonomy,
//! - they never retry auth internally and never look at other sources.

use std::future::Future;
use std::pin::Pin;

use praxisync_core::{Event, EventSource, TimeRange};

use crate::error::{FetchError, FetchResult};

/// A boxed future for async trait methods.
///
/// Boxed futures keep the trait object-safe so the orchestrator can hold a
/// heterogeneous `Vec<Arc<dyn SourceAdapter>>`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The boundary to one event origin.
///
/// # Implementation notes
///
/// - `fetch` must return events whose `start` falls within the requested
///   range, already normalized (cancelled/invalid entries dropped).
/// - On expired credentials, return [`FetchError::auth_expired`] and let
///   the caller refresh and re-invoke the sync.
/// - Implementations must be `Send + Sync`; fetches for different sources
///   run concurrently.
pub trait SourceAdapter: Send + Sync {
    /// Returns the adapter name (for logs and error attribution).
    fn name(&self) -> &str;

    /// Returns the source this adapter produces events for.
    fn source(&self) -> EventSource;

    /// Fetches and normalizes events in the given range.
    fn fetch(&self, range: TimeRange) -> BoxFuture<'_, FetchResult<Vec<Event>>>;
}

/// An adapter that always fails with a fixed error.
///
/// Useful in tests and as a placeholder when an adapter fails to
/// initialize (e.g. missing configuration).
#[derive(Debug)]
pub struct FailingAdapter {
    name: String,
    source: EventSource,
    error: FetchError,
}

impl FailingAdapter {
    /// Creates a new failing adapter.
    pub fn new(name: impl Into<String>, source: EventSource, error: FetchError) -> Self {
        Self {
            name: name.into(),
            source,
            error,
        }
    }
}

impl SourceAdapter for FailingAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn source(&self) -> EventSource {
        self.source
    }

    fn fetch(&self, _range: TimeRange) -> BoxFuture<'_, FetchResult<Vec<Event>>> {
        // FetchError is not Clone; rebuild it from its parts.
        let error = FetchError::new(self.error.code(), self.error.message())
            .with_adapter(self.name.clone());
        Box::pin(async move { Err(error) })
    }
}

/// An adapter serving a fixed set of events, filtered by range.
///
/// Useful in tests and for local development without origin credentials.
#[derive(Debug)]
pub struct FixedAdapter {
    name: String,
    source: EventSource,
    events: Vec<Event>,
}

impl FixedAdapter {
    /// Creates a new fixed adapter over the given events.
    pub fn new(name: impl Into<String>, source: EventSource, events: Vec<Event>) -> Self {
        Self {
            name: name.into(),
            source,
            events,
        }
    }
}

impl SourceAdapter for FixedAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn source(&self) -> EventSource {
        self.source
    }

    fn fetch(&self, range: TimeRange) -> BoxFuture<'_, FetchResult<Vec<Event>>> {
        let events: Vec<Event> = self
            .events
            .iter()
            .filter(|e| e.starts_within(&range))
            .cloned()
            .collect();
        Box::pin(async move { Ok(events) })
    }
}
