//! Merge/reconciliation engine.
//!
//! Combines the normalized, classified event lists of all adapters into
//! one canonical set for a date range:
//!
//! 1. **Same-key dedup**: two events with the same `(source, id)` are the
//!    same logical event; the later-fetched record replaces the earlier one
//!    whole. There is no field-level merging.
//! 2. **Cross-source collision suppression**: the same real-world
//!    appointment can surface through two origins (a practice appointment
//!    also appearing on the subscribed remote calendar). Records from
//!    different sources with identical start/end and overlapping titles
//!    collapse to the record of the priority source.
//! 3. The canonical set is ordered by start time.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use praxisync_core::{Event, EventKey, EventSource};
use tracing::debug;

/// Policy knobs for reconciliation.
#[derive(Debug, Clone)]
pub struct MergeConfig {
    /// Which source wins when two sources carry the same real-world
    /// appointment. The practice-management system is authoritative for
    /// clinical appointments, so it is the default.
    pub collision_priority: EventSource,
    /// Minimum token-overlap ratio for two titles to count as the same
    /// appointment (used when neither title contains the other).
    pub title_overlap_threshold: f64,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            collision_priority: EventSource::PracticeManagement,
            title_overlap_threshold: 0.5,
        }
    }
}

impl MergeConfig {
    /// Builder method to set the collision priority source.
    #[must_use]
    pub fn with_collision_priority(mut self, source: EventSource) -> Self {
        self.collision_priority = source;
        self
    }
}

/// Merges per-adapter event batches into the canonical set.
///
/// `batches` must be in fetch order: when the same `(source, id)` appears
/// twice, the occurrence from the later batch (or later position within a
/// batch) wins.
pub fn merge_events(batches: Vec<Vec<Event>>, config: &MergeConfig) -> Vec<Event> {
    // Same-key dedup, later-fetched wins.
    let mut by_key: HashMap<EventKey, Event> = HashMap::new();
    for event in batches.into_iter().flatten() {
        by_key.insert(event.key(), event);
    }

    let mut events: Vec<Event> = by_key.into_values().collect();

    // Cross-source collision suppression.
    let suppressed = suppress_collisions(&mut events, config);
    if suppressed > 0 {
        debug!(suppressed = suppressed, "suppressed cross-source duplicates");
    }

    events.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then_with(|| a.source.as_str().cmp(b.source.as_str()))
            .then_with(|| a.id.cmp(&b.id))
    });
    events
}

/// Removes records that collide with a priority-source record.
/// Returns the number of suppressed events.
///
/// Two cases collapse onto the priority record:
/// - a record from another source in the same slot (the shared-integration
///   duplicate), and
/// - a classifier-inferred record inside the priority source whose slot is
///   already held by an explicitly-sourced record (the same duplicate,
///   caught after relabeling).
fn suppress_collisions(events: &mut Vec<Event>, config: &MergeConfig) -> usize {
    // Index priority-source events by their exact time slot.
    let mut priority_slots: HashMap<(DateTime<Utc>, DateTime<Utc>), Vec<SlotEntry>> =
        HashMap::new();
    for event in events.iter() {
        if event.source == config.collision_priority {
            priority_slots
                .entry((event.start, event.end))
                .or_default()
                .push(SlotEntry {
                    id: event.id.clone(),
                    title: event.title.clone(),
                    trusted: event.trusted,
                });
        }
    }

    let before = events.len();
    events.retain(|event| {
        let Some(entries) = priority_slots.get(&(event.start, event.end)) else {
            return true;
        };
        if event.source != config.collision_priority {
            return !entries
                .iter()
                .any(|e| titles_overlap(&e.title, &event.title, config.title_overlap_threshold));
        }
        if event.trusted {
            return true;
        }
        // Inferred priority record: yields to a trusted one in the same slot.
        !entries.iter().any(|e| {
            e.trusted
                && e.id != event.id
                && titles_overlap(&e.title, &event.title, config.title_overlap_threshold)
        })
    });
    before - events.len()
}

struct SlotEntry {
    id: String,
    title: String,
    trusted: bool,
}

/// Fuzzy title comparison for collision detection.
///
/// Case-insensitive. Containment either way counts as overlap (the remote
/// copy of an appointment often carries a shortened title). Otherwise the
/// share of shared tokens, measured against the shorter title, must reach
/// the threshold.
pub fn titles_overlap(a: &str, b: &str, threshold: f64) -> bool {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();

    if a.is_empty() || b.is_empty() {
        return false;
    }

    if a.contains(&b) || b.contains(&a) {
        return true;
    }

    let tokens_a: Vec<&str> = a.split_whitespace().collect();
    let tokens_b: Vec<&str> = b.split_whitespace().collect();
    let shared = tokens_a.iter().filter(|t| tokens_b.contains(t)).count();
    let min_len = tokens_a.len().min(tokens_b.len());

    (shared as f64) / (min_len as f64) >= threshold
}
