//! Practice-management adapter.
//!
//! Talks to the practice-management REST API for clinical appointments.
//! Events from this origin are explicitly sourced: they arrive trusted and
//! the classifier never relabels them.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use praxisync_core::{Event, EventSource, TimeRange};
use serde::Deserialize;
use tracing::debug;

use crate::adapter::{BoxFuture, SourceAdapter};
use crate::credentials::CredentialProvider;
use crate::error::{FetchError, FetchResult};
use crate::normalize::normalize_events;
use crate::raw_event::RawEvent;

/// Configuration for the practice-management adapter.
#[derive(Debug, Clone)]
pub struct PracticeConfig {
    /// Base URL of the practice-management API.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl Default for PracticeConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.simplepractice.com/v1".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Adapter for the practice-management API.
pub struct PracticeManagementAdapter {
    config: PracticeConfig,
    http: reqwest::Client,
    credentials: Arc<dyn CredentialProvider>,
}

impl PracticeManagementAdapter {
    /// Creates a new practice-management adapter.
    pub fn new(config: PracticeConfig, credentials: Arc<dyn CredentialProvider>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("failed to create HTTP client");

        Self {
            config,
            http,
            credentials,
        }
    }

    async fn fetch_appointments(
        &self,
        range: TimeRange,
        token: &str,
    ) -> FetchResult<Vec<RawEvent>> {
        let url = format!("{}/appointments", self.config.base_url);

        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .query(&[
                ("from", range.start.to_rfc3339()),
                ("to", range.end.to_rfc3339()),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::network("request timeout")
                } else {
                    FetchError::network(format!("request failed: {e}"))
                }
            })?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(FetchError::auth_expired("practice API token rejected"));
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::rate_limited("practice API rate limit exceeded"));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::network(format!("API error ({status}): {body}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::network(format!("failed to read response: {e}")))?;

        let listing: AppointmentListing = serde_json::from_str(&body)
            .map_err(|e| FetchError::invalid_response(format!("failed to parse response: {e}")))?;

        let raw_events: Vec<RawEvent> = listing
            .appointments
            .into_iter()
            .filter_map(convert_appointment)
            .collect();

        debug!(count = raw_events.len(), "fetched practice appointments");
        Ok(raw_events)
    }
}

impl SourceAdapter for PracticeManagementAdapter {
    fn name(&self) -> &str {
        "practice-management"
    }

    fn source(&self) -> EventSource {
        EventSource::PracticeManagement
    }

    fn fetch(&self, range: TimeRange) -> BoxFuture<'_, FetchResult<Vec<Event>>> {
        Box::pin(async move {
            let token = self
                .credentials
                .access_token()
                .map_err(|e| e.with_adapter(self.name()))?;

            let raw_events = self
                .fetch_appointments(range, &token)
                .await
                .map_err(|e| e.with_adapter(self.name()))?;

            Ok(normalize_events(
                &raw_events,
                EventSource::PracticeManagement,
                true,
            ))
        })
    }
}

// --- Wire types ---

#[derive(Debug, Deserialize)]
struct AppointmentListing {
    #[serde(default)]
    appointments: Vec<AppointmentDto>,
}

#[derive(Debug, Deserialize)]
struct AppointmentDto {
    id: String,
    title: Option<String>,
    #[serde(rename = "clientNotes")]
    client_notes: Option<String>,
    location: Option<String>,
    #[serde(rename = "startTime")]
    start_time: String,
    #[serde(rename = "endTime")]
    end_time: String,
    status: Option<String>,
    #[serde(rename = "calendarId")]
    calendar_id: Option<String>,
}

fn convert_appointment(dto: AppointmentDto) -> Option<RawEvent> {
    let start = parse_rfc3339(&dto.start_time)?;
    let end = parse_rfc3339(&dto.end_time)?;

    let mut raw = RawEvent::new(dto.id, start, end);

    if let Some(title) = dto.title {
        raw = raw.with_summary(title);
    }
    if let Some(notes) = dto.client_notes {
        raw = raw.with_description(notes);
    }
    if let Some(location) = dto.location {
        raw = raw.with_location(location);
    }
    if let Some(status) = dto.status {
        raw = raw.with_status(status);
    }
    if let Some(calendar_id) = dto.calendar_id {
        raw = raw.with_calendar_id(calendar_id);
    }

    Some(raw)
}

fn parse_rfc3339(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
