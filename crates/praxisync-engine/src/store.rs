//! Durable event store.
//!
//! The store is the single read path for every consumer: reads never touch
//! the network and keep working when adapters are down or unauthenticated.
//!
//! Writes come in two shapes:
//! - [`EventStore::commit`]: the range-scoped replace at the end of a sync
//!   cycle. Within the synced range, events of the synced sources are
//!   replaced wholesale; an event absent from the new fetch is treated as
//!   deleted at its origin. Everything outside the range, and every source
//!   that failed this cycle, is left untouched.
//! - [`EventStore::patch`] / [`EventStore::insert_manual`]: direct edits.
//!   `notes` and `action_items` are editable on any source and are carried
//!   forward across commits (no adapter payload contains them).
//!
//! Durability: each successful write persists a JSON snapshot via
//! write-temp-then-rename before the in-memory state is swapped, so a
//! failed persist leaves both disk and memory on the previous snapshot.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use praxisync_core::{Event, EventKey, EventPatch, EventSource, TimeRange};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};

/// The persisted snapshot format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    events: Vec<Event>,
    #[serde(default)]
    last_synced: HashMap<EventSource, DateTime<Utc>>,
    saved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
struct StoreState {
    events: HashMap<EventKey, Event>,
    last_synced: HashMap<EventSource, DateTime<Utc>>,
}

impl StoreState {
    fn to_snapshot(&self) -> Snapshot {
        let mut events: Vec<Event> = self.events.values().cloned().collect();
        events.sort_by(|a, b| {
            a.start
                .cmp(&b.start)
                .then_with(|| a.source.as_str().cmp(b.source.as_str()))
                .then_with(|| a.id.cmp(&b.id))
        });
        Snapshot {
            events,
            last_synced: self.last_synced.clone(),
            saved_at: Some(Utc::now()),
        }
    }

    fn from_snapshot(snapshot: Snapshot) -> Self {
        let events = snapshot
            .events
            .into_iter()
            .map(|e| (e.key(), e))
            .collect();
        Self {
            events,
            last_synced: snapshot.last_synced,
        }
    }
}

/// Keyed, durable storage for the canonical event set.
#[derive(Debug)]
pub struct EventStore {
    /// Snapshot file path. `None` keeps the store memory-only.
    path: Option<PathBuf>,
    state: RwLock<StoreState>,
}

impl EventStore {
    /// Creates a memory-only store (tests, ephemeral runs).
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: RwLock::new(StoreState::default()),
        }
    }

    /// Opens a store backed by a snapshot file, loading it if present.
    ///
    /// A missing file starts an empty store; an unreadable file is an
    /// error (silently discarding a snapshot would look like data loss).
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();

        let state = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| StoreError::Load {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
            let snapshot: Snapshot =
                serde_json::from_str(&content).map_err(|e| StoreError::Load {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })?;
            let state = StoreState::from_snapshot(snapshot);
            info!(
                path = %path.display(),
                events = state.events.len(),
                "loaded event snapshot"
            );
            state
        } else {
            debug!(path = %path.display(), "no snapshot file, starting empty");
            StoreState::default()
        };

        Ok(Self {
            path: Some(path),
            state: RwLock::new(state),
        })
    }

    /// Returns the events starting within the range, ordered by start time.
    pub fn read(&self, range: TimeRange) -> Vec<Event> {
        let state = self.state.read().expect("store lock poisoned");
        let mut events: Vec<Event> = state
            .events
            .values()
            .filter(|e| e.starts_within(&range))
            .cloned()
            .collect();
        events.sort_by(|a, b| {
            a.start
                .cmp(&b.start)
                .then_with(|| a.source.as_str().cmp(b.source.as_str()))
                .then_with(|| a.id.cmp(&b.id))
        });
        events
    }

    /// Returns one event by key.
    pub fn get(&self, source: EventSource, id: &str) -> Option<Event> {
        let state = self.state.read().expect("store lock poisoned");
        state.events.get(&EventKey::new(source, id)).cloned()
    }

    /// Returns the total number of stored events.
    pub fn len(&self) -> usize {
        let state = self.state.read().expect("store lock poisoned");
        state.events.len()
    }

    /// Returns `true` if the store holds no events.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns when the given source last completed a sync.
    pub fn last_synced_at(&self, source: EventSource) -> Option<DateTime<Utc>> {
        let state = self.state.read().expect("store lock poisoned");
        state.last_synced.get(&source).copied()
    }

    /// Returns the last-sync timestamps of all sources.
    pub fn last_synced(&self) -> HashMap<EventSource, DateTime<Utc>> {
        let state = self.state.read().expect("store lock poisoned");
        state.last_synced.clone()
    }

    /// Commits a sync cycle's canonical set for a range.
    ///
    /// Replaces all events of the `synced_sources` starting within `range`
    /// with `events` (absence means deleted at origin). Sources not listed
    /// keep their cached data. `notes`/`action_items` from the prior copy
    /// of each event are carried forward when the incoming copy has none.
    ///
    /// Returns the number of committed events.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persist`] if the snapshot cannot be written;
    /// the in-memory state is left on the previous snapshot.
    pub fn commit(
        &self,
        range: TimeRange,
        synced_sources: &[EventSource],
        events: Vec<Event>,
    ) -> StoreResult<usize> {
        let mut state = self.state.write().expect("store lock poisoned");

        let mut next = state.clone();

        // Tombstone pass, scoped to the synced range and sources.
        next.events.retain(|key, event| {
            !(synced_sources.contains(&key.source) && event.starts_within(&range))
        });

        // Insert the new canonical set, carrying editable fields forward.
        let mut committed = 0;
        for mut event in events {
            if !event.starts_within(&range) {
                debug!(key = %event.key(), "dropping event outside committed range");
                continue;
            }
            if let Some(prior) = state.events.get(&event.key()) {
                if event.notes.is_empty() {
                    event.notes = prior.notes.clone();
                }
                if event.action_items.is_empty() {
                    event.action_items = prior.action_items.clone();
                }
            }
            next.events.insert(event.key(), event);
            committed += 1;
        }

        let now = Utc::now();
        for source in synced_sources {
            next.last_synced.insert(*source, now);
        }

        self.persist(&next)?;
        *state = next;

        debug!(committed = committed, "committed sync snapshot");
        Ok(committed)
    }

    /// Applies a partial update to a stored event.
    ///
    /// `notes` and `action_items` are editable on any source. The
    /// remaining fields belong to the origin and are editable only on
    /// manual events.
    pub fn patch(&self, source: EventSource, id: &str, patch: EventPatch) -> StoreResult<Event> {
        let mut state = self.state.write().expect("store lock poisoned");

        let key = EventKey::new(source, id);
        let Some(current) = state.events.get(&key) else {
            return Err(StoreError::NotFound {
                source,
                id: id.to_string(),
            });
        };

        if source != EventSource::Manual
            && let Some(field) = first_owned_field(&patch)
        {
            return Err(StoreError::FieldNotEditable { field, source });
        }

        let mut updated = current.clone();
        if let Some(title) = patch.title {
            updated.title = title;
        }
        if let Some(description) = patch.description {
            updated.description = Some(description);
        }
        if let Some(location) = patch.location {
            updated.location = Some(location);
        }
        if let Some(start) = patch.start {
            updated.start = start;
        }
        if let Some(end) = patch.end {
            updated.end = end;
        }
        if let Some(notes) = patch.notes {
            updated.notes = notes;
        }
        if let Some(action_items) = patch.action_items {
            updated.action_items = action_items;
        }

        if !updated.has_valid_times() {
            return Err(StoreError::InvalidTimes {
                source,
                id: id.to_string(),
            });
        }

        let mut next = state.clone();
        next.events.insert(key, updated.clone());

        self.persist(&next)?;
        *state = next;

        Ok(updated)
    }

    /// Inserts a manual event directly (the creation path).
    pub fn insert_manual(&self, event: Event) -> StoreResult<Event> {
        if event.source != EventSource::Manual {
            return Err(StoreError::NotManual(event.source));
        }

        let mut state = self.state.write().expect("store lock poisoned");
        let mut next = state.clone();
        next.events.insert(event.key(), event.clone());

        self.persist(&next)?;
        *state = next;

        Ok(event)
    }

    /// Writes the snapshot to disk (temp file + rename). No-op for
    /// memory-only stores.
    fn persist(&self, state: &StoreState) -> StoreResult<()> {
        let Some(ref path) = self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(StoreError::Persist)?;
        }

        let content = serde_json::to_string_pretty(&state.to_snapshot())?;
        let temp_path = temp_path_for(path);

        fs::write(&temp_path, &content).map_err(StoreError::Persist)?;
        fs::rename(&temp_path, path).map_err(StoreError::Persist)?;

        Ok(())
    }
}

/// Returns the first patched field that synced sources own, if any.
fn first_owned_field(patch: &EventPatch) -> Option<&'static str> {
    if patch.title.is_some() {
        Some("title")
    } else if patch.description.is_some() {
        Some("description")
    } else if patch.location.is_some() {
        Some("location")
    } else if patch.start.is_some() {
        Some("start")
    } else if patch.end.is_some() {
        Some("end")
    } else {
        None
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    path.with_extension("json.tmp")
}
