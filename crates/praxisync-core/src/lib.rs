//! Core types: events, sources, time ranges, sync vocabulary, tracing

pub mod event;
pub mod sync;
pub mod time;
pub mod tracing;

pub use event::{Event, EventDraft, EventKey, EventPatch, EventSource};
pub use sync::{SyncOutcome, SyncPhase};
pub use time::TimeRange;
pub use self::tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
