//! Remote calendar adapter.
//!
//! Talks to the remote calendar HTTP API (Google-style events list),
//! paginates through each configured sub-calendar, and normalizes the
//! payload. Events from this origin carry ambiguous provenance: the
//! classifier may later relabel them as practice-management.

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

/// Configuration for the remote calendar adapter.
#[derive(Debug, Clone)]
pub struct RemoteCalendarConfig {
    /// Base URL of the calendar API.
    pub base_url: String,
    /// Sub-calendars to fetch. Defaults to the primary calendar.
    pub calendar_ids: Vec<String>,
    /// Page size for event listing.
    pub page_size: usize,
    /// Request timeout.
    pub timeout: Duration,
}

impl Default for RemoteCalendarConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.googleapis.com/calendar/v3".to_string(),
            calendar_ids: vec!["primary".to_string()],
            page_size: 250,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Adapter for the remote calendar API.
pub struct RemoteCalendarAdapter {
    config: RemoteCalendarConfig,
    http: reqwest::Client,
    credentials: Arc<dyn CredentialProvider>,
}

impl RemoteCalendarAdapter {
    /// Creates a new remote calendar adapter.
    pub fn new(config: RemoteCalendarConfig, credentials: Arc<dyn CredentialProvider>) -> Self {
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

    /// Fetches all pages of one sub-calendar.
    async fn fetch_calendar(
        &self,
        calendar_id: &str,
        range: TimeRange,
        token: &str,
    ) -> FetchResult<Vec<RawEvent>> {
        let mut raw_events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .fetch_page(calendar_id, range, token, page_token.as_deref())
                .await?;

            for item in page.items {
                if let Some(raw) = convert_item(item, calendar_id) {
                    raw_events.push(raw);
                }
            }

            match page.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        debug!(
            calendar_id = %calendar_id,
            count = raw_events.len(),
            "fetched remote calendar events"
        );
        Ok(raw_events)
    }

    /// Fetches a single page of events.
    async fn fetch_page(
        &self,
        calendar_id: &str,
        range: TimeRange,
        token: &str,
        page_token: Option<&str>,
    ) -> FetchResult<EventListResponse> {
        let url = format!(
            "{}/calendars/{}/events",
            self.config.base_url,
            urlencoding::encode(calendar_id)
        );

        let mut request = self
            .http
            .get(&url)
            .bearer_auth(token)
            .query(&[
                ("timeMin", range.start.to_rfc3339()),
                ("timeMax", range.end.to_rfc3339()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
                ("maxResults", self.config.page_size.to_string()),
            ]);

        if let Some(page_token) = page_token {
            request = request.query(&[("pageToken", page_token)]);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::network("request timeout")
            } else if e.is_connect() {
                FetchError::network(format!("connection failed: {e}"))
            } else {
                FetchError::network(format!("request failed: {e}"))
            }
        })?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(FetchError::auth_expired("access token expired or invalid"));
        }

        if status == reqwest::StatusCode::FORBIDDEN {
            return Err(FetchError::auth_expired("access denied to calendar"));
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            return Err(FetchError::rate_limited(format!(
                "rate limit exceeded{}",
                retry_after
                    .map(|s| format!(", retry after {s} seconds"))
                    .unwrap_or_default()
            )));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::network(format!("API error ({status}): {body}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::network(format!("failed to read response: {e}")))?;

        serde_json::from_str(&body)
            .map_err(|e| FetchError::invalid_response(format!("failed to parse response: {e}")))
    }
}

impl SourceAdapter for RemoteCalendarAdapter {
    fn name(&self) -> &str {
        "remote-calendar"
    }

    fn source(&self) -> EventSource {
        EventSource::RemoteCalendar
    }

    fn fetch(&self, range: TimeRange) -> BoxFuture<'_, FetchResult<Vec<Event>>> {
        Box::pin(async move {
            let token = self
                .credentials
                .access_token()
                .map_err(|e| e.with_adapter(self.name()))?;

            let mut raw_events = Vec::new();
            for calendar_id in &self.config.calendar_ids {
                let batch = self
                    .fetch_calendar(calendar_id, range, &token)
                    .await
                    .map_err(|e| e.with_adapter(self.name()))?;
                raw_events.extend(batch);
            }

            Ok(normalize_events(&raw_events, EventSource::RemoteCalendar, false))
        })
    }
}

// --- Wire types ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<ApiEvent>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiEvent {
    id: String,
    status: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    location: Option<String>,
    start: Option<ApiEventTime>,
    end: Option<ApiEventTime>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEventTime {
    date_time: Option<String>,
}

/// Converts one API item into a [`RawEvent`].
///
/// All-day entries (date without a time) and items with unparseable
/// timestamps are dropped; the planner deals in timed events only.
fn convert_item(item: ApiEvent, calendar_id: &str) -> Option<RawEvent> {
    let start = parse_time(item.start.as_ref())?;
    let end = parse_time(item.end.as_ref())?;

    let mut raw = RawEvent::new(item.id, start, end).with_calendar_id(calendar_id);

    if let Some(summary) = item.summary {
        raw = raw.with_summary(summary);
    }
    if let Some(description) = item.description {
        raw = raw.with_description(description);
    }
    if let Some(location) = item.location {
        raw = raw.with_location(location);
    }
    if let Some(status) = item.status {
        raw = raw.with_status(status);
    }

    Some(raw)
}

fn parse_time(time: Option<&ApiEventTime>) -> Option<DateTime<Utc>> {
    let value = time?.date_time.as_deref()?;
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
