//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// praxisync - one calendar out of many
#[derive(Debug, Parser)]
#[command(name = "praxisync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "PRAXISYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,

    /// Path to the daemon socket
    #[arg(long, env = "PRAXISYNC_SOCKET")]
    pub socket_path: Option<PathBuf>,

    /// Connection timeout in seconds
    #[arg(long, default_value = "5")]
    pub timeout: u64,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the daemon in the foreground
    Serve,

    /// Trigger a sync cycle
    Sync {
        /// Start of the range (YYYY-MM-DD); defaults to the rolling window
        #[arg(long)]
        from: Option<String>,

        /// End of the range, exclusive (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
    },

    /// List events from the local store
    Events {
        /// Start of the range (YYYY-MM-DD); defaults to the rolling window
        #[arg(long)]
        from: Option<String>,

        /// End of the range, exclusive (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
    },

    /// Create a manual event
    Create {
        /// Event title
        title: String,

        /// Start time (RFC3339, e.g. 2025-02-05T10:00:00Z)
        #[arg(long)]
        start: String,

        /// End time (RFC3339)
        #[arg(long)]
        end: String,

        /// Event location
        #[arg(long)]
        location: Option<String>,

        /// Event description
        #[arg(long)]
        description: Option<String>,

        /// Note to attach (can be repeated)
        #[arg(long = "note", action = clap::ArgAction::Append)]
        notes: Vec<String>,

        /// Action item to attach (can be repeated)
        #[arg(long = "action-item", action = clap::ArgAction::Append)]
        action_items: Vec<String>,
    },

    /// Update an event
    Patch {
        /// Event source (remote-calendar | practice-management | manual)
        source: String,

        /// Event id
        id: String,

        /// New title (manual events only)
        #[arg(long)]
        title: Option<String>,

        /// New description (manual events only)
        #[arg(long)]
        description: Option<String>,

        /// New location (manual events only)
        #[arg(long)]
        location: Option<String>,

        /// New start time, RFC3339 (manual events only)
        #[arg(long)]
        start: Option<String>,

        /// New end time, RFC3339 (manual events only)
        #[arg(long)]
        end: Option<String>,

        /// Replace notes (can be repeated; any source)
        #[arg(long = "note", action = clap::ArgAction::Append)]
        notes: Vec<String>,

        /// Replace action items (can be repeated; any source)
        #[arg(long = "action-item", action = clap::ArgAction::Append)]
        action_items: Vec<String>,
    },

    /// Show daemon status
    Status,

    /// Check daemon liveness
    Ping,

    /// Ask the daemon to shut down
    Shutdown,
}
