//! Classification, reconciliation, storage, and orchestration.
//!
//! This crate is the core of praxisync:
//! - [`Classifier`]: scores ambiguous events against a fixed indicator
//!   table and relabels likely practice appointments
//! - [`merge_events`]: dedups and reconciles per-adapter batches into the
//!   canonical set
//! - [`EventStore`]: durable, range-scoped storage serving all reads
//! - [`SyncEngine`]: the sync cycle state machine tying it all together

mod classifier;
mod error;
mod merge;
mod orchestrator;
mod store;

pub use classifier::{
    Classifier, ClassifierConfig, DEFAULT_CLINICAL_KEYWORDS, DEFAULT_ORIGIN_MARKER,
    DEFAULT_PRACTICE_CALENDAR_ID, DEFAULT_SCORE_THRESHOLD,
};
pub use error::{EngineError, EngineResult, StoreError, StoreResult};
pub use merge::{MergeConfig, merge_events, titles_overlap};
pub use orchestrator::SyncEngine;
pub use store::EventStore;
