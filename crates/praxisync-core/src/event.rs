//! Canonical event types.
//!
//! This module provides the types shared by every layer of praxisync:
//! - [`EventSource`]: the provenance of an event (which system it came from)
//! - [`Event`]: the canonical event representation after normalization
//! - [`EventKey`]: the `(source, id)` pair that uniquely identifies an event
//! - [`EventDraft`] / [`EventPatch`]: creation and mutation payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::time::TimeRange;

/// The origin of a calendar event.
///
/// Every persisted event carries exactly one source. The source is part of
/// the event's identity: two events with the same `id` but different sources
/// are different events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventSource {
    /// The remote calendar API (subscribed calendars, meetings, personal
    /// entries). The default provenance for events of ambiguous origin.
    RemoteCalendar,
    /// The practice-management API (clinical appointments). Authoritative
    /// for appointment duplicates that also surface through the remote
    /// calendar.
    PracticeManagement,
    /// Locally created entries, never fetched from a remote system.
    Manual,
}

impl EventSource {
    /// Returns the wire name for this source.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RemoteCalendar => "remote-calendar",
            Self::PracticeManagement => "practice-management",
            Self::Manual => "manual",
        }
    }

    /// Returns all known sources.
    pub fn all() -> [EventSource; 3] {
        [Self::RemoteCalendar, Self::PracticeManagement, Self::Manual]
    }
}

impl std::fmt::Display for EventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::error::Error for EventSource {}

impl std::str::FromStr for EventSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "remote-calendar" => Ok(Self::RemoteCalendar),
            "practice-management" => Ok(Self::PracticeManagement),
            "manual" => Ok(Self::Manual),
            other => Err(format!("unknown event source: {other}")),
        }
    }
}

/// The globally unique identity of an event: `(source, id)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventKey {
    /// The event's provenance.
    pub source: EventSource,
    /// The event's identifier, unique within its source.
    pub id: String,
}

impl EventKey {
    /// Creates a new event key.
    pub fn new(source: EventSource, id: impl Into<String>) -> Self {
        Self {
            source,
            id: id.into(),
        }
    }
}

impl std::fmt::Display for EventKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.source, self.id)
    }
}

/// A canonical calendar event.
///
/// This is the one shape every adapter normalizes into before any
/// cross-source logic runs. Invariant: `start < end`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Identifier, stable and unique within `source`.
    pub id: String,
    /// The event's provenance.
    pub source: EventSource,
    /// The event title.
    pub title: String,
    /// Free-text description, if any.
    pub description: Option<String>,
    /// Free-text location, if any.
    pub location: Option<String>,
    /// When the event starts.
    pub start: DateTime<Utc>,
    /// When the event ends. Always after `start`.
    pub end: DateTime<Utc>,
    /// The origin sub-calendar identifier. `None` for manual entries.
    pub calendar_id: Option<String>,
    /// User-editable notes. Not part of any adapter's payload; survive
    /// re-sync on every source.
    #[serde(default)]
    pub notes: Vec<String>,
    /// User-editable action items. Same lifecycle as `notes`.
    #[serde(default)]
    pub action_items: Vec<String>,
    /// Number of matched classification indicators. Transient working
    /// state, never persisted.
    #[serde(skip)]
    pub classification_score: u8,
    /// Whether `source` was set explicitly by the adapter that produced
    /// this event (as opposed to being the ambiguous default). A trusted
    /// source is never rewritten by classification. Transient.
    #[serde(skip)]
    pub trusted: bool,
}

impl Event {
    /// Creates a new event with required fields.
    pub fn new(
        id: impl Into<String>,
        source: EventSource,
        title: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            source,
            title: title.into(),
            description: None,
            location: None,
            start,
            end,
            calendar_id: None,
            notes: Vec::new(),
            action_items: Vec::new(),
            classification_score: 0,
            trusted: false,
        }
    }

    /// Returns this event's `(source, id)` key.
    pub fn key(&self) -> EventKey {
        EventKey::new(self.source, self.id.clone())
    }

    /// Returns `true` if the event's times satisfy `start < end`.
    pub fn has_valid_times(&self) -> bool {
        self.start < self.end
    }

    /// Returns `true` if the event starts within the given range.
    pub fn starts_within(&self, range: &TimeRange) -> bool {
        range.contains(self.start)
    }

    /// Returns the duration of the event in minutes.
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// Builder method to set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Builder method to set the location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Builder method to set the calendar id.
    pub fn with_calendar_id(mut self, calendar_id: impl Into<String>) -> Self {
        self.calendar_id = Some(calendar_id.into());
        self
    }

    /// Builder method to set notes.
    pub fn with_notes(mut self, notes: Vec<String>) -> Self {
        self.notes = notes;
        self
    }

    /// Builder method to set action items.
    pub fn with_action_items(mut self, action_items: Vec<String>) -> Self {
        self.action_items = action_items;
        self
    }

    /// Builder method to mark the source as explicitly set by its adapter.
    pub fn with_trusted(mut self, trusted: bool) -> Self {
        self.trusted = trusted;
        self
    }
}

/// Payload for creating a manual event.
///
/// The store assigns the id and the `manual` source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDraft {
    /// The event title.
    pub title: String,
    /// Free-text description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Free-text location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// When the event starts.
    pub start: DateTime<Utc>,
    /// When the event ends.
    pub end: DateTime<Utc>,
    /// Initial notes.
    #[serde(default)]
    pub notes: Vec<String>,
    /// Initial action items.
    #[serde(default)]
    pub action_items: Vec<String>,
}

impl EventDraft {
    /// Creates a draft with required fields.
    pub fn new(title: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            description: None,
            location: None,
            start,
            end,
            notes: Vec::new(),
            action_items: Vec::new(),
        }
    }

    /// Materializes the draft into an [`Event`] with the given id.
    pub fn into_event(self, id: impl Into<String>) -> Event {
        Event {
            id: id.into(),
            source: EventSource::Manual,
            title: self.title,
            description: self.description,
            location: self.location,
            start: self.start,
            end: self.end,
            calendar_id: None,
            notes: self.notes,
            action_items: self.action_items,
            classification_score: 0,
            trusted: true,
        }
    }
}

/// A partial update to an existing event.
///
/// `notes` and `action_items` are editable on events of any source; the
/// remaining fields only on manual events (synced sources own them).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventPatch {
    /// New title, if changing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New description, if changing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New location, if changing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// New start time, if changing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    /// New end time, if changing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    /// Replacement notes, if changing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<Vec<String>>,
    /// Replacement action items, if changing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_items: Option<Vec<String>>,
}

impl EventPatch {
    /// Returns `true` if the patch touches no fields.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.location.is_none()
            && self.start.is_none()
            && self.end.is_none()
            && self.notes.is_none()
            && self.action_items.is_none()
    }

    /// Returns `true` if the patch only touches fields editable on any
    /// source (`notes`, `action_items`).
    pub fn is_annotation_only(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.location.is_none()
            && self.start.is_none()
            && self.end.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn sample_event() -> Event {
        Event::new(
            "evt-1",
            EventSource::RemoteCalendar,
            "Team Standup",
            utc(2025, 2, 5, 10, 0),
            utc(2025, 2, 5, 10, 30),
        )
    }

    mod source {
        use super::*;

        #[test]
        fn wire_names() {
            assert_eq!(EventSource::RemoteCalendar.as_str(), "remote-calendar");
            assert_eq!(
                EventSource::PracticeManagement.as_str(),
                "practice-management"
            );
            assert_eq!(EventSource::Manual.as_str(), "manual");
        }

        #[test]
        fn serde_uses_kebab_case() {
            let json = serde_json::to_string(&EventSource::PracticeManagement).unwrap();
            assert_eq!(json, "\"practice-management\"");
            let parsed: EventSource = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, EventSource::PracticeManagement);
        }

        #[test]
        fn parses_from_str() {
            assert_eq!(
                "manual".parse::<EventSource>().unwrap(),
                EventSource::Manual
            );
            assert!("slack".parse::<EventSource>().is_err());
        }
    }

    mod event {
        use super::*;

        #[test]
        fn basic_creation() {
            let event = sample_event();
            assert_eq!(event.id, "evt-1");
            assert_eq!(event.source, EventSource::RemoteCalendar);
            assert!(event.has_valid_times());
            assert_eq!(event.duration_minutes(), 30);
            assert!(!event.trusted);
            assert_eq!(event.classification_score, 0);
        }

        #[test]
        fn key_combines_source_and_id() {
            let event = sample_event();
            let key = event.key();
            assert_eq!(key.source, EventSource::RemoteCalendar);
            assert_eq!(key.id, "evt-1");
            assert_eq!(key.to_string(), "remote-calendar/evt-1");
        }

        #[test]
        fn same_id_different_source_is_different_key() {
            let a = EventKey::new(EventSource::RemoteCalendar, "e1");
            let b = EventKey::new(EventSource::PracticeManagement, "e1");
            assert_ne!(a, b);
        }

        #[test]
        fn invalid_times_detected() {
            let mut event = sample_event();
            event.end = event.start;
            assert!(!event.has_valid_times());
        }

        #[test]
        fn builder_pattern() {
            let event = sample_event()
                .with_description("weekly sync")
                .with_location("Room 2")
                .with_calendar_id("primary")
                .with_notes(vec!["bring agenda".to_string()])
                .with_trusted(true);

            assert_eq!(event.description.as_deref(), Some("weekly sync"));
            assert_eq!(event.location.as_deref(), Some("Room 2"));
            assert_eq!(event.calendar_id.as_deref(), Some("primary"));
            assert_eq!(event.notes, vec!["bring agenda".to_string()]);
            assert!(event.trusted);
        }

        #[test]
        fn transient_fields_not_serialized() {
            let mut event = sample_event().with_trusted(true);
            event.classification_score = 3;

            let json = serde_json::to_string(&event).unwrap();
            assert!(!json.contains("classification_score"));
            assert!(!json.contains("trusted"));

            let parsed: Event = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed.classification_score, 0);
            assert!(!parsed.trusted);
        }

        #[test]
        fn starts_within_range() {
            let event = sample_event();
            let range = TimeRange::new(utc(2025, 2, 5, 0, 0), utc(2025, 2, 6, 0, 0));
            assert!(event.starts_within(&range));

            let outside = TimeRange::new(utc(2025, 2, 6, 0, 0), utc(2025, 2, 7, 0, 0));
            assert!(!event.starts_within(&outside));
        }
    }

    mod draft {
        use super::*;

        #[test]
        fn materializes_as_trusted_manual() {
            let draft = EventDraft::new("Dentist", utc(2025, 3, 1, 9, 0), utc(2025, 3, 1, 9, 45));
            let event = draft.into_event("manual-1");

            assert_eq!(event.source, EventSource::Manual);
            assert!(event.trusted);
            assert!(event.calendar_id.is_none());
            assert_eq!(event.id, "manual-1");
        }
    }

    mod patch {
        use super::*;

        #[test]
        fn empty_patch() {
            let patch = EventPatch::default();
            assert!(patch.is_empty());
            assert!(patch.is_annotation_only());
        }

        #[test]
        fn annotation_only_patch() {
            let patch = EventPatch {
                notes: Some(vec!["call back".to_string()]),
                action_items: Some(vec!["send invoice".to_string()]),
                ..Default::default()
            };
            assert!(!patch.is_empty());
            assert!(patch.is_annotation_only());
        }

        #[test]
        fn title_patch_is_not_annotation_only() {
            let patch = EventPatch {
                title: Some("Renamed".to_string()),
                ..Default::default()
            };
            assert!(!patch.is_annotation_only());
        }
    }
}
