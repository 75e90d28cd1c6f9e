//! Shared sync vocabulary: cycle outcome and pipeline phase.

use serde::{Deserialize, Serialize};

use crate::event::EventSource;

/// The phase a sync cycle is currently in.
///
/// Exposed through the status API so callers can see where a long-running
/// cycle is spending its time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    /// No sync in flight.
    #[default]
    Idle,
    /// Adapter fetches running.
    Fetching,
    /// Scoring ambiguous events.
    Classifying,
    /// Cross-source reconciliation.
    Merging,
    /// Writing the canonical set to the store.
    Committing,
}

impl SyncPhase {
    /// Returns the phase's wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Fetching => "fetching",
            Self::Classifying => "classifying",
            Self::Merging => "merging",
            Self::Committing => "committing",
        }
    }
}

impl std::fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The result of one sync cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOutcome {
    /// How many events the cycle committed to the store.
    pub committed: usize,
    /// `true` if at least one adapter failed and the cycle proceeded with
    /// the remaining sources.
    pub partial: bool,
    /// Sources whose fetch failed this cycle. Their cached data was left
    /// untouched.
    pub failed_sources: Vec<EventSource>,
}

impl SyncOutcome {
    /// Creates a fully successful outcome.
    pub fn complete(committed: usize) -> Self {
        Self {
            committed,
            partial: false,
            failed_sources: Vec::new(),
        }
    }

    /// Creates a partial outcome with the given failed sources.
    pub fn partial(committed: usize, failed_sources: Vec<EventSource>) -> Self {
        Self {
            committed,
            partial: true,
            failed_sources,
        }
    }
}
