//! Command implementations.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, warn};

use praxisync_adapters::{
    ManualStore, PracticeConfig, PracticeManagementAdapter, RemoteCalendarAdapter,
    RemoteCalendarConfig, SourceAdapter, StaticCredentials,
};
use praxisync_core::{Event, EventDraft, EventPatch, EventSource, TimeRange};
use praxisync_engine::{EventStore, SyncEngine};
use praxisync_protocol::{Request, Response};
use praxisync_server::{
    Scheduler, SchedulerConfig, ServerConfig, ServerState, SocketServer, make_connection_handler,
};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::socket::SocketClient;

/// Runs the daemon in the foreground until shutdown.
pub async fn serve(config: &ClientConfig) -> ClientResult<()> {
    let store = Arc::new(EventStore::open(config.store_path())?);
    let manual = Arc::new(ManualStore::new());

    let mut engine = SyncEngine::new(store.clone());
    for adapter in build_adapters(config) {
        engine = engine.with_adapter(adapter);
    }
    engine = engine.with_adapter(manual.clone());
    let engine = Arc::new(engine);

    let state = ServerState::new(engine.clone(), manual);
    let shutdown_notify = state.shutdown_requested();

    let server_config = ServerConfig::new(config.socket_path())
        .with_connection_timeout(Duration::from_secs(config.server.timeout.max(1)));
    let server = SocketServer::new(server_config).await?;
    info!(socket = %server.socket_path().display(), "daemon ready");

    // Background scheduler over the rolling window.
    let scheduler = Scheduler::new(SchedulerConfig::new(Duration::from_secs(
        config.sync.interval_secs,
    )));
    let scheduler_handle = scheduler.handle();
    let scheduler_task = {
        let engine = engine.clone();
        let back_days = config.sync.back_days;
        let forward_days = config.sync.forward_days;
        tokio::spawn(async move {
            scheduler
                .run(move || {
                    let engine = engine.clone();
                    async move {
                        let range = TimeRange::rolling(Utc::now(), back_days, forward_days);
                        engine.sync(range).await.map_err(|e| e.to_string())
                    }
                })
                .await;
        })
    };

    let handler = make_connection_handler(state);
    let shutdown = async move {
        tokio::select! {
            _ = shutdown_notify.notified() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received");
            }
        }
    };

    let result = server.run_until_shutdown(handler, shutdown).await;

    let _ = scheduler_handle.stop().await;
    let _ = scheduler_task.await;

    result.map_err(ClientError::from)
}

/// Builds the configured HTTP adapters.
fn build_adapters(config: &ClientConfig) -> Vec<Arc<dyn SourceAdapter>> {
    let mut adapters: Vec<Arc<dyn SourceAdapter>> = Vec::new();

    match config.remote_calendar.as_ref().and_then(|s| {
        s.access_token.as_ref().map(|token| {
            let mut remote_config = RemoteCalendarConfig::default();
            if let Some(ref base_url) = s.base_url {
                remote_config.base_url = base_url.clone();
            }
            if !s.calendar_ids.is_empty() {
                remote_config.calendar_ids = s.calendar_ids.clone();
            }
            RemoteCalendarAdapter::new(remote_config, Arc::new(StaticCredentials::new(token)))
        })
    }) {
        Some(adapter) => adapters.push(Arc::new(adapter)),
        None => warn!("remote calendar origin not configured, skipping"),
    }

    match config.practice.as_ref().and_then(|s| {
        s.access_token.as_ref().map(|token| {
            let mut practice_config = PracticeConfig::default();
            if let Some(ref base_url) = s.base_url {
                practice_config.base_url = base_url.clone();
            }
            PracticeManagementAdapter::new(practice_config, Arc::new(StaticCredentials::new(token)))
        })
    }) {
        Some(adapter) => adapters.push(Arc::new(adapter)),
        None => warn!("practice-management origin not configured, skipping"),
    }

    adapters
}

/// Triggers a sync cycle on the daemon.
pub async fn sync(
    client: &SocketClient,
    config: &ClientConfig,
    from: Option<String>,
    to: Option<String>,
    json: bool,
) -> ClientResult<()> {
    let range = resolve_range(config, from, to)?;

    match client.send(Request::sync(range)).await? {
        Response::SyncReport { outcome } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome).unwrap_or_default());
            } else if outcome.partial {
                let failed: Vec<&str> =
                    outcome.failed_sources.iter().map(|s| s.as_str()).collect();
                println!(
                    "sync partially succeeded: {} events committed, failed sources: {}",
                    outcome.committed,
                    failed.join(", ")
                );
            } else {
                println!("sync complete: {} events committed", outcome.committed);
            }
            Ok(())
        }
        other => unexpected(other),
    }
}

/// Lists events from the daemon's store.
pub async fn events(
    client: &SocketClient,
    config: &ClientConfig,
    from: Option<String>,
    to: Option<String>,
    json: bool,
) -> ClientResult<()> {
    let range = resolve_range(config, from, to)?;

    match client.send(Request::get_events(range)).await? {
        Response::Events { events } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&events).unwrap_or_default());
            } else if events.is_empty() {
                println!("no events in range");
            } else {
                for event in &events {
                    print_event_line(event);
                }
            }
            Ok(())
        }
        other => unexpected(other),
    }
}

/// Creates a manual event.
#[allow(clippy::too_many_arguments)]
pub async fn create(
    client: &SocketClient,
    title: String,
    start: String,
    end: String,
    location: Option<String>,
    description: Option<String>,
    notes: Vec<String>,
    action_items: Vec<String>,
    json: bool,
) -> ClientResult<()> {
    let mut draft = EventDraft::new(title, parse_datetime(&start)?, parse_datetime(&end)?);
    draft.location = location;
    draft.description = description;
    draft.notes = notes;
    draft.action_items = action_items;

    match client.send(Request::CreateEvent { draft }).await? {
        Response::Event { event } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&event).unwrap_or_default());
            } else {
                println!("created {}/{}", event.source, event.id);
            }
            Ok(())
        }
        other => unexpected(other),
    }
}

/// Patches an event.
#[allow(clippy::too_many_arguments)]
pub async fn patch(
    client: &SocketClient,
    source: String,
    id: String,
    title: Option<String>,
    description: Option<String>,
    location: Option<String>,
    start: Option<String>,
    end: Option<String>,
    notes: Vec<String>,
    action_items: Vec<String>,
    json: bool,
) -> ClientResult<()> {
    let source: EventSource = source
        .parse()
        .map_err(ClientError::InvalidArgument)?;

    let patch = EventPatch {
        title,
        description,
        location,
        start: start.as_deref().map(parse_datetime).transpose()?,
        end: end.as_deref().map(parse_datetime).transpose()?,
        notes: if notes.is_empty() { None } else { Some(notes) },
        action_items: if action_items.is_empty() {
            None
        } else {
            Some(action_items)
        },
    };

    if patch.is_empty() {
        return Err(ClientError::InvalidArgument(
            "nothing to change; pass at least one field".to_string(),
        ));
    }

    match client.send(Request::patch_event(source, id, patch)).await? {
        Response::Event { event } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&event).unwrap_or_default());
            } else {
                println!("updated {}/{}", event.source, event.id);
            }
            Ok(())
        }
        other => unexpected(other),
    }
}

/// Shows daemon status.
pub async fn status(client: &SocketClient, json: bool) -> ClientResult<()> {
    match client.send(Request::Status).await? {
        Response::Status(status) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&status).unwrap_or_default());
            } else {
                println!("uptime: {}s", status.uptime_seconds);
                println!("events: {}", status.event_count);
                println!("phase: {}", status.sync_phase);
                for source in EventSource::all() {
                    match status.last_synced.get(&source) {
                        Some(at) => println!("last sync {}: {}", source, at.to_rfc3339()),
                        None => println!("last sync {}: never", source),
                    }
                }
            }
            Ok(())
        }
        other => unexpected(other),
    }
}

/// Pings the daemon.
pub async fn ping(client: &SocketClient) -> ClientResult<()> {
    match client.send(Request::Ping).await? {
        Response::Pong => {
            println!("daemon is up");
            Ok(())
        }
        other => unexpected(other),
    }
}

/// Asks the daemon to shut down.
pub async fn shutdown(client: &SocketClient) -> ClientResult<()> {
    match client.send(Request::Shutdown).await? {
        Response::ShuttingDown => {
            println!("daemon shutting down");
            Ok(())
        }
        other => unexpected(other),
    }
}

fn print_event_line(event: &Event) {
    let annotations = match (event.notes.len(), event.action_items.len()) {
        (0, 0) => String::new(),
        (n, 0) => format!("  [{n} note(s)]"),
        (0, a) => format!("  [{a} action item(s)]"),
        (n, a) => format!("  [{n} note(s), {a} action item(s)]"),
    };
    println!(
        "{}  {}  [{}] {}{}",
        event.start.format("%Y-%m-%d %H:%M"),
        event.end.format("%H:%M"),
        event.source,
        event.title,
        annotations
    );
}

fn unexpected(response: Response) -> ClientResult<()> {
    if let Response::Error(error) = response {
        return Err(ClientError::daemon(error));
    }
    Err(ClientError::Protocol(format!(
        "unexpected response: {response:?}"
    )))
}

/// Resolves `--from`/`--to` dates into a range, falling back to the
/// configured rolling window.
fn resolve_range(
    config: &ClientConfig,
    from: Option<String>,
    to: Option<String>,
) -> ClientResult<TimeRange> {
    match (from, to) {
        (None, None) => Ok(TimeRange::rolling(
            Utc::now(),
            config.sync.back_days,
            config.sync.forward_days,
        )),
        (Some(from), Some(to)) => {
            let start = parse_date(&from)?;
            let end = parse_date(&to)?;
            if start >= end {
                return Err(ClientError::InvalidArgument(
                    "--from must be before --to".to_string(),
                ));
            }
            Ok(TimeRange::new(start, end))
        }
        _ => Err(ClientError::InvalidArgument(
            "--from and --to must be given together".to_string(),
        )),
    }
}

/// Parses a `YYYY-MM-DD` date as midnight UTC.
fn parse_date(value: &str) -> ClientResult<DateTime<Utc>> {
    let date: NaiveDate = value.parse().map_err(|_| {
        ClientError::InvalidArgument(format!("invalid date `{value}` (expected YYYY-MM-DD)"))
    })?;
    Ok(date
        .and_hms_opt(0, 0, 0)
        .expect("midnight is a valid time")
        .and_utc())
}

/// Parses an RFC3339 timestamp.
fn parse_datetime(value: &str) -> ClientResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| {
            ClientError::InvalidArgument(format!(
                "invalid timestamp `{value}` (expected RFC3339, e.g. 2025-02-05T10:00:00Z)"
            ))
        })
}
