//! End-to-end sync cycle tests against a disk-backed store.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use tempfile::tempdir;

use praxisync_adapters::{FailingAdapter, FetchError, FixedAdapter, ManualStore};
use praxisync_core::{Event, EventDraft, EventPatch, EventSource, TimeRange};
use praxisync_engine::{EventStore, SyncEngine};

fn utc(d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 2, d, h, 0, 0).unwrap()
}

fn feb() -> TimeRange {
    TimeRange::new(utc(1, 0), utc(28, 0))
}

fn remote_adapter(events: Vec<Event>) -> Arc<FixedAdapter> {
    Arc::new(FixedAdapter::new(
        "remote",
        EventSource::RemoteCalendar,
        events,
    ))
}

fn remote_event(id: &str, d: u32, title: &str) -> Event {
    Event::new(id, EventSource::RemoteCalendar, title, utc(d, 10), utc(d, 11))
}

#[tokio::test]
async fn snapshot_survives_engine_restart() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("events.json");

    {
        let store = Arc::new(EventStore::open(&path).unwrap());
        let engine = SyncEngine::new(store)
            .with_adapter(remote_adapter(vec![remote_event("e1", 3, "Planning")]));
        let outcome = engine.sync(feb()).await.unwrap();
        assert_eq!(outcome.committed, 1);
    }

    // A fresh store over the same file serves the committed snapshot
    // without any adapter being reachable.
    let reopened = EventStore::open(&path).unwrap();
    let events = reopened.read(feb());
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].id, "e1");
    assert!(reopened.last_synced_at(EventSource::RemoteCalendar).is_some());
}

#[tokio::test]
async fn annotations_survive_sync_cycles_and_restarts() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("events.json");

    let store = Arc::new(EventStore::open(&path).unwrap());
    let engine = SyncEngine::new(store.clone())
        .with_adapter(remote_adapter(vec![remote_event("e1", 3, "Planning")]));
    engine.sync(feb()).await.unwrap();

    store
        .patch(
            EventSource::RemoteCalendar,
            "e1",
            EventPatch {
                notes: Some(vec!["ask about invoices".to_string()]),
                ..Default::default()
            },
        )
        .unwrap();

    // The next cycle fetches the same upstream copy, which carries no notes.
    engine.sync(feb()).await.unwrap();

    let reopened = EventStore::open(&path).unwrap();
    let event = reopened.get(EventSource::RemoteCalendar, "e1").unwrap();
    assert_eq!(event.notes, vec!["ask about invoices".to_string()]);
}

#[tokio::test]
async fn manual_entries_flow_through_sync() {
    let manual = Arc::new(ManualStore::new());
    let created = manual.create(EventDraft::new("Dentist", utc(6, 9), utc(6, 10)));

    let store = Arc::new(EventStore::in_memory());
    let engine = SyncEngine::new(store.clone())
        .with_adapter(remote_adapter(vec![remote_event("e1", 3, "Planning")]))
        .with_adapter(manual.clone());

    let outcome = engine.sync(feb()).await.unwrap();
    assert_eq!(outcome.committed, 2);

    let events = store.read(feb());
    assert!(events.iter().any(|e| e.id == created.id));

    // Removing the manual entry tombstones it on the next cycle.
    manual.remove(&created.id);
    engine.sync(feb()).await.unwrap();
    assert!(store.get(EventSource::Manual, &created.id).is_none());
}

#[tokio::test]
async fn failed_source_reports_partial_and_serves_stale_data() {
    let store = Arc::new(EventStore::in_memory());

    SyncEngine::new(store.clone())
        .with_adapter(Arc::new(FixedAdapter::new(
            "practice",
            EventSource::PracticeManagement,
            vec![
                Event::new(
                    "a1",
                    EventSource::PracticeManagement,
                    "Jane Doe Appointment",
                    utc(4, 14),
                    utc(4, 15),
                )
                .with_trusted(true),
            ],
        )))
        .sync(feb())
        .await
        .unwrap();

    let outcome = SyncEngine::new(store.clone())
        .with_adapter(Arc::new(FailingAdapter::new(
            "practice",
            EventSource::PracticeManagement,
            FetchError::rate_limited("slow down"),
        )))
        .sync(feb())
        .await
        .unwrap();

    assert!(outcome.partial);
    assert_eq!(
        outcome.failed_sources,
        vec![EventSource::PracticeManagement]
    );
    assert_eq!(store.read(feb()).len(), 1);
}
