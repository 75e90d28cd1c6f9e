//! Client configuration.
//!
//! All settings live in a single `config.toml` at
//! `~/.config/praxisync/config.toml` by default. Sections for the two
//! remote origins are optional: an origin without an access token is
//! skipped at daemon startup (the manual origin is always on).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for the praxisync client and daemon.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Daemon/connection settings.
    pub server: ServerSettings,

    /// Sync window and cadence.
    pub sync: SyncSettings,

    /// Event store settings.
    pub store: StoreSettings,

    /// Remote calendar origin settings.
    pub remote_calendar: Option<RemoteCalendarSettings>,

    /// Practice-management origin settings.
    pub practice: Option<PracticeSettings>,
}

/// Daemon/connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Path to the daemon socket.
    pub socket_path: Option<PathBuf>,

    /// Connection timeout in seconds.
    pub timeout: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            socket_path: None,
            timeout: 5,
        }
    }
}

/// Sync window and cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Days into the past the rolling window reaches.
    pub back_days: i64,

    /// Days into the future the rolling window reaches.
    pub forward_days: i64,

    /// Seconds between scheduled syncs.
    pub interval_secs: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            back_days: 7,
            forward_days: 30,
            interval_secs: 300,
        }
    }
}

/// Event store settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Snapshot file path. Defaults to the user data directory.
    pub path: Option<PathBuf>,
}

/// Remote calendar origin settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteCalendarSettings {
    /// Base URL of the calendar API.
    pub base_url: Option<String>,

    /// Bearer token for the calendar API.
    pub access_token: Option<String>,

    /// Sub-calendars to fetch.
    pub calendar_ids: Vec<String>,
}

impl Default for RemoteCalendarSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            access_token: None,
            calendar_ids: vec!["primary".to_string()],
        }
    }
}

/// Practice-management origin settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PracticeSettings {
    /// Base URL of the practice-management API.
    pub base_url: Option<String>,

    /// Bearer token for the practice-management API.
    pub access_token: Option<String>,
}

impl ClientConfig {
    /// Loads configuration from the default path.
    ///
    /// A missing file yields the defaults.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &PathBuf) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("failed to read config: {e}"))?;
        toml::from_str(&content).map_err(|e| format!("failed to parse config: {e}"))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("praxisync")
            .join("config.toml")
    }

    /// Returns the event store snapshot path.
    pub fn store_path(&self) -> PathBuf {
        self.store.path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("praxisync")
                .join("events.json")
        })
    }

    /// Returns the daemon socket path.
    pub fn socket_path(&self) -> PathBuf {
        self.server
            .socket_path
            .clone()
            .unwrap_or_else(praxisync_server::default_socket_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.sync.back_days, 7);
        assert_eq!(config.sync.forward_days, 30);
        assert_eq!(config.server.timeout, 5);
        assert!(config.remote_calendar.is_none());
        assert!(config.practice.is_none());
    }

    #[test]
    fn parses_full_config() {
        let config: ClientConfig = toml::from_str(
            r#"
            [server]
            socket_path = "/tmp/test.sock"
            timeout = 10

            [sync]
            back_days = 14
            forward_days = 60
            interval_secs = 120

            [store]
            path = "/tmp/events.json"

            [remote_calendar]
            access_token = "tok-remote"
            calendar_ids = ["primary", "family"]

            [practice]
            base_url = "https://practice.example.com/v1"
            access_token = "tok-practice"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.timeout, 10);
        assert_eq!(config.sync.back_days, 14);
        assert_eq!(config.store_path(), PathBuf::from("/tmp/events.json"));

        let remote = config.remote_calendar.unwrap();
        assert_eq!(remote.calendar_ids.len(), 2);
        assert_eq!(remote.access_token.as_deref(), Some("tok-remote"));

        let practice = config.practice.unwrap();
        assert_eq!(
            practice.base_url.as_deref(),
            Some("https://practice.example.com/v1")
        );
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: ClientConfig = toml::from_str(
            r#"
            [sync]
            back_days = 1
            "#,
        )
        .unwrap();

        assert_eq!(config.sync.back_days, 1);
        assert_eq!(config.sync.forward_days, 30);
    }
}
