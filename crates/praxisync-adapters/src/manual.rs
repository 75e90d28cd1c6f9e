//! Manual-entry store.
//!
//! Holds locally created events. Unlike the HTTP adapters this origin
//! lives in-process: the daemon writes entries into it directly, and sync
//! cycles read it back through the same [`SourceAdapter`] contract as the
//! remote origins.

use std::collections::HashMap;
use std::sync::RwLock;

use praxisync_core::{Event, EventDraft, EventSource, TimeRange};
use tracing::debug;
use uuid::Uuid;

use crate::adapter::{BoxFuture, SourceAdapter};
use crate::error::FetchResult;

/// In-process store of manually created events.
#[derive(Debug, Default)]
pub struct ManualStore {
    entries: RwLock<HashMap<String, Event>>,
}

impl ManualStore {
    /// Creates an empty manual store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an event from a draft, assigning a fresh id.
    pub fn create(&self, draft: EventDraft) -> Event {
        let id = Uuid::new_v4().to_string();
        let event = draft.into_event(id.clone());

        let mut entries = self.entries.write().expect("manual store lock poisoned");
        entries.insert(id.clone(), event.clone());
        debug!(id = %id, "created manual event");
        event
    }

    /// Inserts a pre-built manual event, replacing any entry with the same id.
    ///
    /// Returns `false` (and does nothing) if the event is not manual-sourced.
    pub fn insert(&self, event: Event) -> bool {
        if event.source != EventSource::Manual {
            return false;
        }
        let mut entries = self.entries.write().expect("manual store lock poisoned");
        entries.insert(event.id.clone(), event);
        true
    }

    /// Returns a single event by id.
    pub fn get(&self, id: &str) -> Option<Event> {
        let entries = self.entries.read().expect("manual store lock poisoned");
        entries.get(id).cloned()
    }

    /// Removes an event by id, returning it if present.
    pub fn remove(&self, id: &str) -> Option<Event> {
        let mut entries = self.entries.write().expect("manual store lock poisoned");
        entries.remove(id)
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        let entries = self.entries.read().expect("manual store lock poisoned");
        entries.len()
    }

    /// Returns `true` if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SourceAdapter for ManualStore {
    fn name(&self) -> &str {
        "manual"
    }

    fn source(&self) -> EventSource {
        EventSource::Manual
    }

    fn fetch(&self, range: TimeRange) -> BoxFuture<'_, FetchResult<Vec<Event>>> {
        let events: Vec<Event> = {
            let entries = self.entries.read().expect("manual store lock poisoned");
            entries
                .values()
                .filter(|e| e.starts_within(&range))
                .cloned()
                .collect()
        };
        Box::pin(async move { Ok(events) })
    }
}
