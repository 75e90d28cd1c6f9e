//! Provenance classifier.
//!
//! Events arriving through the remote calendar sometimes originate in the
//! practice-management system (the practice calendar is subscribed into the
//! remote one, and clinical appointments surface there without origin
//! metadata). The classifier scores each ambiguous event against a fixed
//! indicator table and relabels it when enough indicators agree.
//!
//! The score is a plain count of matched indicators. A single indicator is
//! deliberately never enough: a meeting titled "John Smith" alone should
//! not become a clinical appointment.

use praxisync_core::{Event, EventSource};
use regex::Regex;
use tracing::trace;

/// Default substring identifying the practice-management origin in titles
/// and descriptions of synced-through events.
pub const DEFAULT_ORIGIN_MARKER: &str = "simplepractice";

/// Default id of the subscribed practice calendar inside the remote
/// calendar account.
pub const DEFAULT_PRACTICE_CALENDAR_ID: &str = "simplepractice.appointments";

/// Default clinical terminology indicating a practice appointment.
pub const DEFAULT_CLINICAL_KEYWORDS: [&str; 6] = [
    "therapy",
    "session",
    "consultation",
    "counseling",
    "supervision",
    "intake",
];

/// Default minimum indicator count for relabeling.
pub const DEFAULT_SCORE_THRESHOLD: u8 = 2;

/// Tunable scoring table for the classifier.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Substring identifying the practice-management origin (matched
    /// case-insensitively in title and description).
    pub origin_marker: String,
    /// The well-known practice calendar id.
    pub practice_calendar_id: String,
    /// Clinical terminology keyword set.
    pub clinical_keywords: Vec<String>,
    /// Minimum score for relabeling.
    pub score_threshold: u8,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            origin_marker: DEFAULT_ORIGIN_MARKER.to_string(),
            practice_calendar_id: DEFAULT_PRACTICE_CALENDAR_ID.to_string(),
            clinical_keywords: DEFAULT_CLINICAL_KEYWORDS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            score_threshold: DEFAULT_SCORE_THRESHOLD,
        }
    }
}

impl ClassifierConfig {
    /// Builder method to set the score threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: u8) -> Self {
        self.score_threshold = threshold;
        self
    }

    /// Builder method to set the practice calendar id.
    #[must_use]
    pub fn with_practice_calendar_id(mut self, id: impl Into<String>) -> Self {
        self.practice_calendar_id = id.into();
        self
    }
}

/// Scores ambiguous events and relabels likely practice appointments.
///
/// Pure over one event plus the indicator table; the indicator evaluation
/// order never affects the result.
#[derive(Debug)]
pub struct Classifier {
    config: ClassifierConfig,
    name_pattern: Regex,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(ClassifierConfig::default())
    }
}

impl Classifier {
    /// Creates a classifier with the given scoring table.
    pub fn new(config: ClassifierConfig) -> Self {
        // Capitalized two-token "Firstname Lastname" shape.
        let name_pattern =
            Regex::new(r"^[A-Z][a-z]+ [A-Z][a-z]+$").expect("name pattern is valid");
        Self {
            config,
            name_pattern,
        }
    }

    /// Returns the configured threshold.
    pub fn threshold(&self) -> u8 {
        self.config.score_threshold
    }

    /// Counts the matched indicators for an event.
    pub fn score(&self, event: &Event) -> u8 {
        let indicators = [
            self.has_origin_marker(event),
            self.matches_practice_calendar(event),
            self.has_clinical_keyword(event),
            self.has_clinical_location(event),
            self.title_is_person_name(event),
        ];
        indicators.iter().filter(|&&hit| hit).count() as u8
    }

    /// Classifies one event.
    ///
    /// Events whose source was set explicitly by their adapter pass through
    /// untouched; the heuristics only apply to ambiguous (default
    /// remote-calendar) provenance. A relabeled event keeps its indicator
    /// count in `classification_score`.
    pub fn classify(&self, mut event: Event) -> Event {
        if event.trusted {
            return event;
        }

        let score = self.score(&event);
        event.classification_score = score;

        if score >= self.config.score_threshold {
            trace!(
                id = %event.id,
                score = score,
                "relabeling event as practice-management"
            );
            event.source = EventSource::PracticeManagement;
        }

        event
    }

    /// Classifies a batch of events.
    pub fn classify_all(&self, events: Vec<Event>) -> Vec<Event> {
        events.into_iter().map(|e| self.classify(e)).collect()
    }

    // --- Indicators ---

    /// Indicator 1: origin marker substring in title or description.
    fn has_origin_marker(&self, event: &Event) -> bool {
        let marker = self.config.origin_marker.to_lowercase();
        text_fields(event).any(|text| text.to_lowercase().contains(&marker))
    }

    /// Indicator 2: calendar id equals the well-known practice calendar.
    fn matches_practice_calendar(&self, event: &Event) -> bool {
        event
            .calendar_id
            .as_deref()
            .is_some_and(|id| id == self.config.practice_calendar_id)
    }

    /// Indicator 3: clinical terminology in title or description.
    fn has_clinical_keyword(&self, event: &Event) -> bool {
        text_fields(event).any(|text| {
            let lower = text.to_lowercase();
            self.config
                .clinical_keywords
                .iter()
                .any(|kw| lower.contains(kw.as_str()))
        })
    }

    /// Indicator 4: location mentions an office or clinic.
    fn has_clinical_location(&self, event: &Event) -> bool {
        event.location.as_deref().is_some_and(|loc| {
            let lower = loc.to_lowercase();
            lower.contains("office") || lower.contains("clinic")
        })
    }

    /// Indicator 5: title is a capitalized "Firstname Lastname" pair.
    fn title_is_person_name(&self, event: &Event) -> bool {
        self.name_pattern.is_match(event.title.trim())
    }
}

fn text_fields(event: &Event) -> impl Iterator<Item = &str> {
    std::iter::once(event.title.as_str()).chain(event.description.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn utc(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 5, h, 0, 0).unwrap()
    }

    fn remote_event(title: &str) -> Event {
        Event::new("evt-1", EventSource::RemoteCalendar, title, utc(10), utc(11))
    }

    mod indicators {
        use super::*;

        #[test]
        fn origin_marker_in_description() {
            let classifier = Classifier::default();
            let event = remote_event("Catch-up").with_description("Synced via SimplePractice");
            assert_eq!(classifier.score(&event), 1);
        }

        #[test]
        fn practice_calendar_id_match() {
            let classifier = Classifier::default();
            let event = remote_event("Quarterly review")
                .with_calendar_id(DEFAULT_PRACTICE_CALENDAR_ID);
            assert_eq!(classifier.score(&event), 1);
        }

        #[test]
        fn clinical_keyword_match() {
            let classifier = Classifier::default();
            assert_eq!(classifier.score(&remote_event("Therapy block")), 1);
            assert_eq!(classifier.score(&remote_event("Supervision hour")), 1);
            assert_eq!(classifier.score(&remote_event("Budget review")), 0);
        }

        #[test]
        fn location_match() {
            let classifier = Classifier::default();
            let event = remote_event("Catch-up").with_location("Main Office");
            assert_eq!(classifier.score(&event), 1);

            let event = remote_event("Catch-up").with_location("Downtown Clinic");
            assert_eq!(classifier.score(&event), 1);
        }

        #[test]
        fn person_name_pattern() {
            let classifier = Classifier::default();
            assert_eq!(classifier.score(&remote_event("John Smith")), 1);
            assert_eq!(classifier.score(&remote_event("john smith")), 0);
            assert_eq!(classifier.score(&remote_event("John")), 0);
            assert_eq!(classifier.score(&remote_event("John Smith Review")), 0);
        }
    }

    mod decisions {
        use super::*;

        #[test]
        fn single_indicator_never_relabels() {
            // A meeting titled like a person's name alone must stay put.
            let classifier = Classifier::default();
            let event = classifier.classify(remote_event("John Smith"));

            assert_eq!(event.source, EventSource::RemoteCalendar);
            assert_eq!(event.classification_score, 1);
        }

        #[test]
        fn two_indicators_relabel() {
            let classifier = Classifier::default();
            let event = remote_event("John Smith").with_calendar_id(DEFAULT_PRACTICE_CALENDAR_ID);
            let event = classifier.classify(event);

            assert_eq!(event.source, EventSource::PracticeManagement);
            assert_eq!(event.classification_score, 2);
        }

        #[test]
        fn trusted_source_never_rewritten() {
            let classifier = Classifier::default();
            // Maximum-signal event, but explicitly sourced by its adapter.
            let event = remote_event("Jane Doe")
                .with_description("SimplePractice therapy session")
                .with_location("Clinic")
                .with_calendar_id(DEFAULT_PRACTICE_CALENDAR_ID)
                .with_trusted(true);

            let classified = classifier.classify(event.clone());
            assert_eq!(classified.source, event.source);
            assert_eq!(classified.classification_score, 0);
        }

        #[test]
        fn threshold_is_tunable() {
            let classifier = Classifier::new(ClassifierConfig::default().with_threshold(1));
            let event = classifier.classify(remote_event("John Smith"));
            assert_eq!(event.source, EventSource::PracticeManagement);
        }

        #[test]
        fn all_indicators_count() {
            let classifier = Classifier::default();
            let event = remote_event("Jane Doe")
                .with_description("simplepractice intake")
                .with_location("clinic room 2")
                .with_calendar_id(DEFAULT_PRACTICE_CALENDAR_ID);

            assert_eq!(classifier.score(&event), 5);
        }

        #[test]
        fn batch_classification() {
            let classifier = Classifier::default();
            let events = vec![
                remote_event("John Smith").with_calendar_id(DEFAULT_PRACTICE_CALENDAR_ID),
                remote_event("Sprint planning"),
            ];

            let classified = classifier.classify_all(events);
            assert_eq!(classified[0].source, EventSource::PracticeManagement);
            assert_eq!(classified[1].source, EventSource::RemoteCalendar);
        }
    }
}
