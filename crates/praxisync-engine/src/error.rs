//! Engine error types.

use thiserror::Error;

use praxisync_core::EventSource;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from the event store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The snapshot could not be written to disk. The previous snapshot
    /// (memory and disk) remains valid.
    #[error("failed to persist snapshot: {0}")]
    Persist(#[source] std::io::Error),

    /// The snapshot on disk could not be read or parsed at startup.
    #[error("failed to load snapshot from {path}: {message}")]
    Load { path: String, message: String },

    /// Failed to serialize the snapshot.
    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),

    /// No event with the given key exists.
    #[error("event not found: {source}/{id}")]
    NotFound { source: EventSource, id: String },

    /// The patch touches a field that is not editable on this source.
    #[error("field `{field}` is not editable on {source} events")]
    FieldNotEditable { field: &'static str, source: EventSource },

    /// The mutation would leave the event with `start >= end`.
    #[error("patch would invert event times for {source}/{id}")]
    InvalidTimes { source: EventSource, id: String },

    /// The write path only accepts manual events.
    #[error("expected a manual event, got {0}")]
    NotManual(EventSource),
}

/// Result type for sync operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors from the sync engine.
///
/// Adapter fetch failures are absorbed into a partial [`SyncOutcome`] and
/// never appear here; only a failed commit aborts a cycle.
///
/// [`SyncOutcome`]: praxisync_core::SyncOutcome
#[derive(Debug, Error)]
pub enum EngineError {
    /// The commit failed; the store still serves the previous snapshot.
    #[error("sync failed, serving stale data: {0}")]
    CacheWrite(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_messages() {
        let err = StoreError::NotFound {
            source: EventSource::Manual,
            id: "m-1".to_string(),
        };
        assert_eq!(err.to_string(), "event not found: manual/m-1");

        let err = StoreError::FieldNotEditable {
            field: "title",
            source: EventSource::RemoteCalendar,
        };
        assert!(err.to_string().contains("not editable"));
        assert!(err.to_string().contains("remote-calendar"));
    }

    #[test]
    fn cache_write_wraps_store_error() {
        let err = EngineError::CacheWrite(StoreError::Persist(std::io::Error::other("disk full")));
        assert!(err.to_string().contains("serving stale data"));
    }
}
