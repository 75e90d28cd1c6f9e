//! Daemon: socket server, request handler, sync scheduler.
//!
//! The praxisync daemon owns the sync engine and serves its store over a
//! Unix socket:
//! - reads (`GetEvents`, `Status`) come straight from the store
//! - `Sync` runs a cycle through the engine
//! - `CreateEvent`/`PatchEvent` write through the store (and manual origin)
//! - a background [`Scheduler`] re-syncs a rolling window periodically

mod config;
mod error;
mod handler;
mod scheduler;
mod socket;

pub use config::{ServerConfig, default_socket_path};
pub use error::{ServerError, ServerResult};
pub use handler::{ServerState, SharedState, make_connection_handler};
pub use scheduler::{
    Scheduler, SchedulerCommand, SchedulerConfig, SchedulerHandle, SchedulerState,
    SharedSchedulerState,
};
pub use socket::{Connection, SocketServer};
