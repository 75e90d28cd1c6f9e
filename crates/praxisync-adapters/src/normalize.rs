//! RawEvent to canonical Event conversion.
//!
//! Every adapter funnels its origin payload through this step before any
//! cross-source logic runs:
//! 1. Cancelled raw events are dropped.
//! 2. Events violating `start < end` are dropped (logged, never fatal).
//! 3. The remaining fields map onto [`Event`], stamped with the adapter's
//!    source and trust level.

use praxisync_core::{Event, EventSource};
use tracing::warn;

use crate::raw_event::RawEvent;

/// Converts a single [`RawEvent`] to a canonical [`Event`].
///
/// Returns `None` when the raw event is cancelled or its times are invalid.
///
/// `trusted` records whether the adapter knows the provenance for certain;
/// untrusted events are candidates for reclassification.
pub fn normalize_event(raw: &RawEvent, source: EventSource, trusted: bool) -> Option<Event> {
    if raw.is_cancelled() {
        return None;
    }

    if raw.start >= raw.end {
        warn!(
            id = %raw.id,
            start = %raw.start,
            end = %raw.end,
            "skipping event with invalid times"
        );
        return None;
    }

    let mut event = Event::new(&raw.id, source, raw.effective_title(), raw.start, raw.end)
        .with_trusted(trusted);

    if let Some(ref description) = raw.description {
        event = event.with_description(description);
    }

    if let Some(ref location) = raw.location {
        event = event.with_location(location);
    }

    if let Some(ref calendar_id) = raw.calendar_id {
        event = event.with_calendar_id(calendar_id);
    }

    Some(event)
}

/// Batch normalize raw events, dropping cancelled and invalid entries.
pub fn normalize_events(raw_events: &[RawEvent], source: EventSource, trusted: bool) -> Vec<Event> {
    raw_events
        .iter()
        .filter_map(|raw| normalize_event(raw, source, trusted))
        .collect()
}
