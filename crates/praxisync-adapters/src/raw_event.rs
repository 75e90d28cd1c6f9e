//! Raw event type returned by origin APIs.
//!
//! [`RawEvent`] carries event data as it comes off the wire from an origin
//! (field names already unified, timestamps already parsed, but nothing
//! validated or classified yet). Each adapter converts it to a canonical
//! [`praxisync_core::Event`] through [`crate::normalize`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A raw calendar event from an origin API.
///
/// Not all origins populate all fields. `status` keeps the origin's own
/// lifecycle string (`"cancelled"` events are dropped during normalization).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Identifier within the origin.
    pub id: String,
    /// When the event starts.
    pub start: DateTime<Utc>,
    /// When the event ends.
    pub end: DateTime<Utc>,
    /// The event title/summary.
    pub summary: Option<String>,
    /// The event description.
    pub description: Option<String>,
    /// The event location.
    pub location: Option<String>,
    /// The origin sub-calendar this event belongs to.
    pub calendar_id: Option<String>,
    /// The origin's lifecycle status (e.g. "confirmed", "cancelled").
    pub status: Option<String>,
}

impl RawEvent {
    /// Creates a new raw event with required fields.
    pub fn new(id: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            start,
            end,
            summary: None,
            description: None,
            location: None,
            calendar_id: None,
            status: None,
        }
    }

    /// Builder method to set the summary.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
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

    /// Builder method to set the status.
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Returns the title to use, falling back for untitled events.
    pub fn effective_title(&self) -> &str {
        match self.summary.as_deref() {
            Some(s) if !s.trim().is_empty() => s,
            _ => "(No title)",
        }
    }

    /// Returns `true` if the origin marked this event cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("cancelled"))
    }
}
