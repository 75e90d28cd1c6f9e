//! Sync orchestrator.
//!
//! Drives one sync cycle through its phases:
//!
//! ```text
//! Idle -> Fetching -> Classifying -> Merging -> Committing -> Idle
//! ```
//!
//! Adapter fetches run concurrently and are joined before anything else
//! happens; a failed fetch removes that source from the cycle (its cached
//! data stays put) instead of aborting. Classification and merging are
//! synchronous CPU work. The commit contains no await points, so a caller
//! dropping the sync future can never leave the store half-updated.
//!
//! Overlapping sync requests are serialized through one lock: interleaved
//! cycles could otherwise tombstone each other's ranges.

use std::sync::{Arc, RwLock};

use futures::future::join_all;
use praxisync_core::{SyncOutcome, SyncPhase, TimeRange};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use praxisync_adapters::SourceAdapter;

use crate::classifier::Classifier;
use crate::error::EngineResult;
use crate::merge::{MergeConfig, merge_events};
use crate::store::EventStore;

/// Coordinates adapters, classifier, merge engine, and store.
pub struct SyncEngine {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    classifier: Classifier,
    merge_config: MergeConfig,
    store: Arc<EventStore>,
    sync_lock: Mutex<()>,
    phase: Arc<RwLock<SyncPhase>>,
}

impl SyncEngine {
    /// Creates an engine over the given store with default policies and no
    /// adapters.
    pub fn new(store: Arc<EventStore>) -> Self {
        Self {
            adapters: Vec::new(),
            classifier: Classifier::default(),
            merge_config: MergeConfig::default(),
            store,
            sync_lock: Mutex::new(()),
            phase: Arc::new(RwLock::new(SyncPhase::Idle)),
        }
    }

    /// Builder method to register an adapter.
    #[must_use]
    pub fn with_adapter(mut self, adapter: Arc<dyn SourceAdapter>) -> Self {
        self.adapters.push(adapter);
        self
    }

    /// Builder method to replace the classifier.
    #[must_use]
    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Builder method to replace the merge policy.
    #[must_use]
    pub fn with_merge_config(mut self, merge_config: MergeConfig) -> Self {
        self.merge_config = merge_config;
        self
    }

    /// Returns the store this engine commits to.
    pub fn store(&self) -> Arc<EventStore> {
        self.store.clone()
    }

    /// Returns the current pipeline phase.
    pub fn phase(&self) -> SyncPhase {
        *self.phase.read().expect("phase lock poisoned")
    }

    fn set_phase(&self, phase: SyncPhase) {
        *self.phase.write().expect("phase lock poisoned") = phase;
    }

    /// Runs one sync cycle for the given range.
    ///
    /// Concurrent calls are serialized; a second overlapping request waits
    /// for the in-flight cycle to finish.
    ///
    /// # Errors
    ///
    /// Only a failed store commit is an error; adapter failures degrade to
    /// a partial outcome.
    pub async fn sync(&self, range: TimeRange) -> EngineResult<SyncOutcome> {
        let _guard = self.sync_lock.lock().await;
        // Resets the phase even if the caller drops this future mid-fetch.
        let _phase_reset = PhaseReset(self.phase.clone());

        info!(range = %range, adapters = self.adapters.len(), "starting sync cycle");
        self.set_phase(SyncPhase::Fetching);

        let fetches = self.adapters.iter().map(|adapter| async move {
            let result = adapter.fetch(range).await;
            (adapter.source(), adapter.name().to_string(), result)
        });
        let results = join_all(fetches).await;

        let mut batches = Vec::new();
        let mut synced_sources = Vec::new();
        let mut failed_sources = Vec::new();

        for (source, name, result) in results {
            match result {
                Ok(events) => {
                    debug!(adapter = %name, count = events.len(), "adapter fetch succeeded");
                    synced_sources.push(source);
                    batches.push(events);
                }
                Err(error) => {
                    warn!(
                        adapter = %name,
                        code = %error.code(),
                        error = %error,
                        "adapter fetch failed, continuing without it"
                    );
                    failed_sources.push(source);
                }
            }
        }

        self.set_phase(SyncPhase::Classifying);
        let batches: Vec<_> = batches
            .into_iter()
            .map(|batch| self.classifier.classify_all(batch))
            .collect();

        self.set_phase(SyncPhase::Merging);
        let canonical = merge_events(batches, &self.merge_config);

        self.set_phase(SyncPhase::Committing);
        // Synchronous section: no await until the commit has fully landed.
        let committed = self.store.commit(range, &synced_sources, canonical)?;

        let outcome = if failed_sources.is_empty() {
            SyncOutcome::complete(committed)
        } else {
            SyncOutcome::partial(committed, failed_sources)
        };

        info!(
            committed = outcome.committed,
            partial = outcome.partial,
            "sync cycle finished"
        );
        Ok(outcome)
    }
}

/// Sets the phase back to idle when dropped.
struct PhaseReset(Arc<RwLock<SyncPhase>>);

impl Drop for PhaseReset {
    fn drop(&mut self) {
        if let Ok(mut phase) = self.0.write() {
            *phase = SyncPhase::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use praxisync_adapters::{FailingAdapter, FetchError, FixedAdapter};
    use praxisync_core::{Event, EventSource};

    fn utc(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, d, h, 0, 0).unwrap()
    }

    fn feb() -> TimeRange {
        TimeRange::new(utc(1, 0), utc(28, 0))
    }

    fn remote_event(id: &str, d: u32, title: &str) -> Event {
        Event::new(id, EventSource::RemoteCalendar, title, utc(d, 10), utc(d, 11))
    }

    fn practice_event(id: &str, d: u32, title: &str) -> Event {
        Event::new(
            id,
            EventSource::PracticeManagement,
            title,
            utc(d, 14),
            utc(d, 15),
        )
        .with_trusted(true)
    }

    fn engine_with(adapters: Vec<Arc<dyn SourceAdapter>>) -> SyncEngine {
        let mut engine = SyncEngine::new(Arc::new(EventStore::in_memory()));
        for adapter in adapters {
            engine = engine.with_adapter(adapter);
        }
        engine
    }

    #[tokio::test]
    async fn full_cycle_commits_all_sources() {
        let engine = engine_with(vec![
            Arc::new(FixedAdapter::new(
                "remote",
                EventSource::RemoteCalendar,
                vec![remote_event("e1", 3, "Sprint planning")],
            )),
            Arc::new(FixedAdapter::new(
                "practice",
                EventSource::PracticeManagement,
                vec![practice_event("a1", 4, "Jane Doe Appointment")],
            )),
        ]);

        let outcome = engine.sync(feb()).await.unwrap();

        assert_eq!(outcome.committed, 2);
        assert!(!outcome.partial);
        assert_eq!(engine.store().read(feb()).len(), 2);
        assert_eq!(engine.phase(), SyncPhase::Idle);
    }

    #[tokio::test]
    async fn partial_failure_keeps_failed_source_cached() {
        // First cycle: both sources succeed.
        let store = Arc::new(EventStore::in_memory());
        let engine = SyncEngine::new(store.clone())
            .with_adapter(Arc::new(FixedAdapter::new(
                "remote",
                EventSource::RemoteCalendar,
                vec![remote_event("e1", 3, "Sprint planning")],
            )))
            .with_adapter(Arc::new(FixedAdapter::new(
                "practice",
                EventSource::PracticeManagement,
                vec![practice_event("a1", 4, "Jane Doe Appointment")],
            )));
        engine.sync(feb()).await.unwrap();

        // Second cycle: practice is down.
        let engine = SyncEngine::new(store.clone())
            .with_adapter(Arc::new(FixedAdapter::new(
                "remote",
                EventSource::RemoteCalendar,
                vec![remote_event("e1", 3, "Sprint planning")],
            )))
            .with_adapter(Arc::new(FailingAdapter::new(
                "practice",
                EventSource::PracticeManagement,
                FetchError::network("origin down"),
            )));

        let outcome = engine.sync(feb()).await.unwrap();

        assert!(outcome.partial);
        assert_eq!(
            outcome.failed_sources,
            vec![EventSource::PracticeManagement]
        );
        // Stale-but-present beats empty.
        let events = store.read(feb());
        assert!(events.iter().any(|e| e.id == "a1"));
    }

    #[tokio::test]
    async fn auth_expired_is_partial_not_fatal() {
        let engine = engine_with(vec![
            Arc::new(FailingAdapter::new(
                "remote",
                EventSource::RemoteCalendar,
                FetchError::auth_expired("token expired"),
            )),
            Arc::new(FixedAdapter::new(
                "practice",
                EventSource::PracticeManagement,
                vec![practice_event("a1", 4, "Jane Doe Appointment")],
            )),
        ]);

        let outcome = engine.sync(feb()).await.unwrap();

        assert!(outcome.partial);
        assert_eq!(outcome.failed_sources, vec![EventSource::RemoteCalendar]);
        assert_eq!(outcome.committed, 1);
    }

    #[tokio::test]
    async fn ambiguous_events_are_classified_during_sync() {
        let engine = engine_with(vec![Arc::new(FixedAdapter::new(
            "remote",
            EventSource::RemoteCalendar,
            vec![
                remote_event("e1", 3, "John Smith")
                    .with_calendar_id(crate::classifier::DEFAULT_PRACTICE_CALENDAR_ID),
            ],
        ))]);

        engine.sync(feb()).await.unwrap();

        let events = engine.store().read(feb());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].source, EventSource::PracticeManagement);
    }

    #[tokio::test]
    async fn cross_source_duplicate_suppressed_in_cycle() {
        let engine = engine_with(vec![
            Arc::new(FixedAdapter::new(
                "remote",
                EventSource::RemoteCalendar,
                vec![Event::new(
                    "e1",
                    EventSource::RemoteCalendar,
                    "Jane Doe",
                    utc(4, 14),
                    utc(4, 15),
                )],
            )),
            Arc::new(FixedAdapter::new(
                "practice",
                EventSource::PracticeManagement,
                vec![practice_event("a1", 4, "Jane Doe Appointment")],
            )),
        ]);

        let outcome = engine.sync(feb()).await.unwrap();

        assert_eq!(outcome.committed, 1);
        let events = engine.store().read(feb());
        assert_eq!(events[0].id, "a1");
        assert_eq!(events[0].source, EventSource::PracticeManagement);
    }

    #[tokio::test]
    async fn sync_twice_is_idempotent() {
        let store = Arc::new(EventStore::in_memory());
        let make_engine = || {
            SyncEngine::new(store.clone()).with_adapter(Arc::new(FixedAdapter::new(
                "remote",
                EventSource::RemoteCalendar,
                vec![
                    remote_event("e1", 3, "Sprint planning"),
                    remote_event("e2", 5, "Retro"),
                ],
            )))
        };

        make_engine().sync(feb()).await.unwrap();
        let first: Vec<_> = store.read(feb());

        make_engine().sync(feb()).await.unwrap();
        let second: Vec<_> = store.read(feb());

        assert_eq!(first, second);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn narrower_sync_leaves_outside_events_alone() {
        let store = Arc::new(EventStore::in_memory());

        // Wide sync seeds two weeks.
        SyncEngine::new(store.clone())
            .with_adapter(Arc::new(FixedAdapter::new(
                "remote",
                EventSource::RemoteCalendar,
                vec![
                    remote_event("week1", 3, "Early"),
                    remote_event("week2", 12, "Late"),
                ],
            )))
            .sync(feb())
            .await
            .unwrap();

        // Narrow re-sync of the first week returns nothing upstream.
        let narrow = TimeRange::new(utc(1, 0), utc(8, 0));
        SyncEngine::new(store.clone())
            .with_adapter(Arc::new(FixedAdapter::new(
                "remote",
                EventSource::RemoteCalendar,
                vec![],
            )))
            .sync(narrow)
            .await
            .unwrap();

        let remaining = store.read(feb());
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, "week2");
    }

    #[tokio::test]
    async fn concurrent_syncs_serialize() {
        let store = Arc::new(EventStore::in_memory());
        let engine = Arc::new(SyncEngine::new(store.clone()).with_adapter(Arc::new(
            FixedAdapter::new(
                "remote",
                EventSource::RemoteCalendar,
                vec![remote_event("e1", 3, "Sprint planning")],
            ),
        )));

        let a = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.sync(feb()).await })
        };
        let b = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.sync(feb()).await })
        };

        let (a, b) = (a.await.unwrap().unwrap(), b.await.unwrap().unwrap());
        assert_eq!(a.committed, 1);
        assert_eq!(b.committed, 1);
        assert_eq!(store.len(), 1);
    }
}
