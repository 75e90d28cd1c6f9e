//! Request dispatch.
//!
//! Routes incoming protocol requests onto the engine, store, and manual
//! store. Reads are served straight from the store: they keep working
//! whatever the adapters or their credentials are doing.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use praxisync_adapters::ManualStore;
use praxisync_engine::{StoreError, SyncEngine};
use praxisync_protocol::{Envelope, ErrorCode, ErrorResponse, Request, Response};

use crate::socket::Connection;

/// Shared daemon state handed to every connection.
pub struct ServerState {
    start_time: DateTime<Utc>,
    engine: Arc<SyncEngine>,
    manual: Arc<ManualStore>,
    shutdown: Arc<Notify>,
}

/// Shared handle to the daemon state.
pub type SharedState = Arc<ServerState>;

impl ServerState {
    /// Creates the daemon state.
    pub fn new(engine: Arc<SyncEngine>, manual: Arc<ManualStore>) -> SharedState {
        Arc::new(Self {
            start_time: Utc::now(),
            engine,
            manual,
            shutdown: Arc::new(Notify::new()),
        })
    }

    /// Returns a future that resolves when shutdown was requested.
    pub fn shutdown_requested(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }

    /// Returns the daemon uptime in seconds.
    pub fn uptime_seconds(&self) -> u64 {
        (Utc::now() - self.start_time).num_seconds().max(0) as u64
    }

    /// Handles a single request.
    pub async fn handle_request(&self, request: Request) -> Response {
        match request {
            Request::GetEvents { range } => {
                let events = self.engine.store().read(range);
                debug!(count = events.len(), "serving events from store");
                Response::Events { events }
            }

            Request::Sync { range } => match self.engine.sync(range).await {
                Ok(outcome) => Response::SyncReport { outcome },
                Err(e) => {
                    error!(error = %e, "sync cycle failed");
                    Response::Error(ErrorResponse::new(ErrorCode::SyncFailed, e.to_string()))
                }
            },

            Request::CreateEvent { draft } => {
                if draft.start >= draft.end {
                    return Response::Error(ErrorResponse::new(
                        ErrorCode::InvalidRequest,
                        "event start must be before end",
                    ));
                }
                let event = self.manual.create(draft);
                match self.engine.store().insert_manual(event) {
                    Ok(event) => {
                        info!(id = %event.id, "created manual event");
                        Response::Event {
                            event: Box::new(event),
                        }
                    }
                    Err(e) => store_error_response(e),
                }
            }

            Request::PatchEvent { source, id, patch } => {
                match self.engine.store().patch(source, &id, patch) {
                    Ok(event) => {
                        // Keep the manual origin in step so the next sync
                        // does not revert the edit.
                        if event.source == praxisync_core::EventSource::Manual {
                            self.manual.insert(event.clone());
                        }
                        Response::Event {
                            event: Box::new(event),
                        }
                    }
                    Err(e) => store_error_response(e),
                }
            }

            Request::Status => {
                let store = self.engine.store();
                Response::Status(praxisync_protocol::StatusInfo {
                    uptime_seconds: self.uptime_seconds(),
                    event_count: store.len(),
                    last_synced: store.last_synced(),
                    sync_phase: self.engine.phase().to_string(),
                })
            }

            Request::Ping => Response::Pong,

            Request::Shutdown => {
                info!("shutdown requested by client");
                self.shutdown.notify_waiters();
                Response::ShuttingDown
            }
        }
    }
}

fn store_error_response(error: StoreError) -> Response {
    let code = match &error {
        StoreError::NotFound { .. } => ErrorCode::NotFound,
        StoreError::FieldNotEditable { .. }
        | StoreError::InvalidTimes { .. }
        | StoreError::NotManual(_) => ErrorCode::InvalidRequest,
        StoreError::Persist(_) | StoreError::Serialize(_) | StoreError::Load { .. } => {
            ErrorCode::Internal
        }
    };
    Response::Error(ErrorResponse::new(code, error.to_string()))
}

/// Builds the per-connection handler for the socket server.
///
/// The returned closure reads requests until the peer disconnects,
/// answering each one in order.
pub fn make_connection_handler(
    state: SharedState,
) -> impl Fn(Connection) -> std::pin::Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync + Clone
{
    move |mut connection: Connection| {
        let state = state.clone();
        Box::pin(async move {
            loop {
                let envelope = match connection.read_request().await {
                    Ok(Some(envelope)) => envelope,
                    Ok(None) => {
                        debug!("client disconnected");
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "failed to read request");
                        break;
                    }
                };

                let Envelope {
                    request_id,
                    payload,
                    ..
                } = envelope;

                let response = state.handle_request(payload).await;
                if let Err(e) = connection.respond(&request_id, response).await {
                    warn!(error = %e, "failed to write response");
                    break;
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use praxisync_adapters::FixedAdapter;
    use praxisync_core::{Event, EventDraft, EventPatch, EventSource, TimeRange};
    use praxisync_engine::EventStore;

    fn utc(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, d, h, 0, 0).unwrap()
    }

    fn feb() -> TimeRange {
        TimeRange::new(utc(1, 0), utc(28, 0))
    }

    fn state_with_remote(events: Vec<Event>) -> SharedState {
        let engine = SyncEngine::new(Arc::new(EventStore::in_memory())).with_adapter(Arc::new(
            FixedAdapter::new("remote", EventSource::RemoteCalendar, events),
        ));
        ServerState::new(Arc::new(engine), Arc::new(ManualStore::new()))
    }

    #[tokio::test]
    async fn ping_pong() {
        let state = state_with_remote(vec![]);
        assert_eq!(state.handle_request(Request::Ping).await, Response::Pong);
    }

    #[tokio::test]
    async fn sync_then_read() {
        let state = state_with_remote(vec![Event::new(
            "e1",
            EventSource::RemoteCalendar,
            "Planning",
            utc(3, 10),
            utc(3, 11),
        )]);

        let response = state.handle_request(Request::sync(feb())).await;
        let Response::SyncReport { outcome } = response else {
            panic!("expected sync report, got {response:?}");
        };
        assert_eq!(outcome.committed, 1);
        assert!(!outcome.partial);

        let response = state.handle_request(Request::get_events(feb())).await;
        let Response::Events { events } = response else {
            panic!("expected events, got {response:?}");
        };
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "e1");
    }

    #[tokio::test]
    async fn create_event_lands_in_store_and_manual_origin() {
        let state = state_with_remote(vec![]);
        let draft = EventDraft::new("Dentist", utc(6, 9), utc(6, 10));

        let response = state
            .handle_request(Request::CreateEvent { draft })
            .await;
        let Response::Event { event } = response else {
            panic!("expected event, got {response:?}");
        };

        assert_eq!(event.source, EventSource::Manual);
        assert!(state.engine.store().get(EventSource::Manual, &event.id).is_some());
        assert!(state.manual.get(&event.id).is_some());
    }

    #[tokio::test]
    async fn create_event_rejects_inverted_times() {
        let state = state_with_remote(vec![]);
        let draft = EventDraft::new("Backwards", utc(6, 10), utc(6, 9));

        let response = state.handle_request(Request::CreateEvent { draft }).await;
        let Response::Error(error) = response else {
            panic!("expected error, got {response:?}");
        };
        assert_eq!(error.code, ErrorCode::InvalidRequest);
    }

    #[tokio::test]
    async fn patch_unknown_event_is_not_found() {
        let state = state_with_remote(vec![]);

        let response = state
            .handle_request(Request::patch_event(
                EventSource::Manual,
                "ghost",
                EventPatch::default(),
            ))
            .await;
        let Response::Error(error) = response else {
            panic!("expected error, got {response:?}");
        };
        assert_eq!(error.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn patch_owned_field_on_synced_source_rejected() {
        let state = state_with_remote(vec![Event::new(
            "e1",
            EventSource::RemoteCalendar,
            "Planning",
            utc(3, 10),
            utc(3, 11),
        )]);
        state.handle_request(Request::sync(feb())).await;

        let response = state
            .handle_request(Request::patch_event(
                EventSource::RemoteCalendar,
                "e1",
                EventPatch {
                    title: Some("Renamed".to_string()),
                    ..Default::default()
                },
            ))
            .await;
        let Response::Error(error) = response else {
            panic!("expected error, got {response:?}");
        };
        assert_eq!(error.code, ErrorCode::InvalidRequest);
    }

    #[tokio::test]
    async fn status_reports_store_shape() {
        let state = state_with_remote(vec![Event::new(
            "e1",
            EventSource::RemoteCalendar,
            "Planning",
            utc(3, 10),
            utc(3, 11),
        )]);
        state.handle_request(Request::sync(feb())).await;

        let response = state.handle_request(Request::Status).await;
        let Response::Status(status) = response else {
            panic!("expected status, got {response:?}");
        };

        assert_eq!(status.event_count, 1);
        assert_eq!(status.sync_phase, "idle");
        assert!(status
            .last_synced
            .contains_key(&EventSource::RemoteCalendar));
    }

    #[tokio::test]
    async fn shutdown_notifies_waiters() {
        let state = state_with_remote(vec![]);
        let notify = state.shutdown_requested();
        let waiter = {
            let notify = notify.clone();
            tokio::spawn(async move { notify.notified().await })
        };
        // Give the waiter a moment to register.
        tokio::task::yield_now().await;

        let response = state.handle_request(Request::Shutdown).await;
        assert_eq!(response, Response::ShuttingDown);
        waiter.await.unwrap();
    }
}
