//! Request and response types for the praxisync protocol.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use praxisync_core::{Event, EventDraft, EventPatch, EventSource, SyncOutcome, TimeRange};

use crate::PROTOCOL_VERSION;

/// Message envelope wrapping all protocol messages.
///
/// Every message exchanged between client and daemon is wrapped in this
/// envelope, which provides versioning and request correlation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Protocol version (always "1" for v1).
    pub protocol_version: String,
    /// Unique request ID for correlation.
    pub request_id: String,
    /// The actual payload.
    pub payload: T,
}

impl<T> Envelope<T> {
    /// Creates a new envelope with the current protocol version.
    pub fn new(request_id: impl Into<String>, payload: T) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.to_string(),
            request_id: request_id.into(),
            payload,
        }
    }

    /// Creates a request envelope.
    pub fn request(request_id: impl Into<String>, request: T) -> Self {
        Self::new(request_id, request)
    }

    /// Creates a response envelope.
    pub fn response(request_id: impl Into<String>, response: T) -> Self {
        Self::new(request_id, response)
    }

    /// Checks if this envelope uses a compatible protocol version.
    pub fn is_compatible(&self) -> bool {
        self.protocol_version == PROTOCOL_VERSION
    }
}

/// Request types sent from client to daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Read events for a range. Always served from the store; never
    /// touches the origins.
    GetEvents {
        /// The range to read.
        range: TimeRange,
    },

    /// Run a sync cycle for a range.
    Sync {
        /// The range to sync.
        range: TimeRange,
    },

    /// Create a manual event.
    CreateEvent {
        /// The event to create.
        draft: EventDraft,
    },

    /// Apply a partial update to an event.
    PatchEvent {
        /// Source of the target event.
        source: EventSource,
        /// Id of the target event.
        id: String,
        /// The fields to change.
        patch: EventPatch,
    },

    /// Get daemon status.
    Status,

    /// Ping to check daemon liveness.
    Ping,

    /// Request daemon shutdown.
    Shutdown,
}

impl Request {
    /// Creates a GetEvents request.
    pub fn get_events(range: TimeRange) -> Self {
        Self::GetEvents { range }
    }

    /// Creates a Sync request.
    pub fn sync(range: TimeRange) -> Self {
        Self::Sync { range }
    }

    /// Creates a PatchEvent request.
    pub fn patch_event(source: EventSource, id: impl Into<String>, patch: EventPatch) -> Self {
        Self::PatchEvent {
            source,
            id: id.into(),
            patch,
        }
    }
}

/// Response types sent from daemon to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Events for the requested range, ordered by start time.
    Events {
        /// The events.
        events: Vec<Event>,
    },

    /// The outcome of a sync cycle.
    SyncReport {
        /// The outcome.
        outcome: SyncOutcome,
    },

    /// A single event (creation/patch result).
    Event {
        /// The event.
        event: Box<Event>,
    },

    /// Daemon status.
    Status(StatusInfo),

    /// Liveness reply.
    Pong,

    /// Shutdown acknowledged; the daemon exits after this reply.
    ShuttingDown,

    /// An error occurred while handling the request.
    Error(ErrorResponse),
}

/// Daemon status information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusInfo {
    /// Daemon uptime in seconds.
    pub uptime_seconds: u64,
    /// Total events currently in the store.
    pub event_count: usize,
    /// Last successful sync per source.
    #[serde(default)]
    pub last_synced: HashMap<EventSource, DateTime<Utc>>,
    /// Current sync pipeline phase.
    pub sync_phase: String,
}

/// Error categories for protocol-level error responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The requested event does not exist.
    NotFound,
    /// The request was malformed or touched non-editable fields.
    InvalidRequest,
    /// The sync cycle failed; the store still serves the previous snapshot.
    SyncFailed,
    /// An origin rejected the daemon's credentials.
    AuthExpired,
    /// Unexpected internal error.
    Internal,
}

/// A structured error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// The error category.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

impl ErrorResponse {
    /// Creates a new error response.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample_range() -> TimeRange {
        TimeRange::new(
            Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn envelope_version() {
        let envelope = Envelope::request("req-1", Request::Ping);
        assert_eq!(envelope.protocol_version, PROTOCOL_VERSION);
        assert!(envelope.is_compatible());

        let old = Envelope {
            protocol_version: "0".to_string(),
            request_id: "req-2".to_string(),
            payload: Request::Ping,
        };
        assert!(!old.is_compatible());
    }

    #[test]
    fn request_serde_roundtrip() {
        let request = Request::sync(sample_range());
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"type\":\"sync\""));

        let parsed: Request = serde_json::from_str(&json).unwrap();
        assert_eq!(request, parsed);
    }

    #[test]
    fn patch_request_serde_roundtrip() {
        let request = Request::patch_event(
            EventSource::RemoteCalendar,
            "e1",
            EventPatch {
                notes: Some(vec!["note".to_string()]),
                ..Default::default()
            },
        );
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("remote-calendar"));

        let parsed: Request = serde_json::from_str(&json).unwrap();
        assert_eq!(request, parsed);
    }

    #[test]
    fn response_serde_roundtrip() {
        let response = Response::SyncReport {
            outcome: SyncOutcome::partial(4, vec![EventSource::PracticeManagement]),
        };
        let json = serde_json::to_string(&response).unwrap();
        let parsed: Response = serde_json::from_str(&json).unwrap();
        assert_eq!(response, parsed);
    }

    #[test]
    fn error_response_shape() {
        let response = Response::Error(ErrorResponse::new(ErrorCode::NotFound, "no such event"));
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("not_found"));
        assert!(json.contains("no such event"));
    }

    #[test]
    fn status_serde_roundtrip() {
        let mut last_synced = HashMap::new();
        last_synced.insert(
            EventSource::RemoteCalendar,
            Utc.with_ymd_and_hms(2025, 2, 1, 8, 0, 0).unwrap(),
        );
        let status = StatusInfo {
            uptime_seconds: 120,
            event_count: 42,
            last_synced,
            sync_phase: "idle".to_string(),
        };

        let json = serde_json::to_string(&status).unwrap();
        let parsed: StatusInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(status, parsed);
    }
}
