//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::api;
use crate::export::{ExportFormat, ExportZone};
use crate::feed::{websocket_url, ChangeFeed, PollingFeed, WebSocketFeed, DEFAULT_POLL_INTERVAL};
use crate::store::{EntryStore, HttpEntryStore, HttpStoreConfig};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub api: ServerConfig,

    #[serde(default)]
    pub export: ExportConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// How the client learns that entries changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedKind {
    /// Re-fetch on a fixed interval
    #[default]
    Poll,
    /// Re-fetch when the backend pushes a change over WebSocket
    Push,
}

impl std::str::FromStr for FeedKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "poll" | "polling" => Ok(FeedKind::Poll),
            "push" | "ws" | "websocket" => Ok(FeedKind::Push),
            other => Err(format!("Unknown feed kind: {} (expected poll or push)", other)),
        }
    }
}

/// Remote entries store the clients talk to
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_backend_url")]
    pub url: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub feed: FeedKind,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: u64,

    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

fn default_backend_url() -> String {
    "http://localhost:3001".to_string()
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL.as_millis() as u64
}

fn default_reconnect_delay() -> u64 {
    3000
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_backend_url(),
            api_key: None,
            feed: FeedKind::default(),
            poll_interval_ms: default_poll_interval(),
            reconnect_delay_ms: default_reconnect_delay(),
            request_timeout_secs: None,
        }
    }
}

impl BackendConfig {
    pub fn store_config(&self) -> HttpStoreConfig {
        HttpStoreConfig {
            base_url: self.url.clone(),
            api_key: self.api_key.clone(),
            request_timeout_secs: self.request_timeout_secs,
        }
    }

    /// Build the HTTP store and the configured change feed over it
    pub fn connect(&self) -> Result<(Arc<dyn EntryStore>, Box<dyn ChangeFeed>), reqwest::Error> {
        let store: Arc<dyn EntryStore> = Arc::new(HttpEntryStore::new(self.store_config())?);

        let feed: Box<dyn ChangeFeed> = match self.feed {
            FeedKind::Poll => Box::new(PollingFeed::new(
                Arc::clone(&store),
                Duration::from_millis(self.poll_interval_ms),
            )),
            FeedKind::Push => Box::new(
                WebSocketFeed::new(Arc::clone(&store), websocket_url(&self.url))
                    .reconnect_delay(Duration::from_millis(self.reconnect_delay_ms)),
            ),
        };

        Ok((store, feed))
    }
}

/// Reference backend server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_database")]
    pub database: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_database() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("weighlog").join("entries.db").to_string_lossy().to_string())
        .unwrap_or_else(|| "./weighlog_data/entries.db".to_string())
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database: default_database(),
        }
    }
}

impl ServerConfig {
    pub fn api_config(&self) -> api::ApiConfig {
        api::ApiConfig::new(self.host.clone(), self.port)
    }

    /// Database file with a leading `~/` expanded
    pub fn database_path(&self) -> PathBuf {
        expand_home(&self.database)
    }
}

/// Spreadsheet export configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    #[serde(default)]
    pub format: ExportFormat,

    #[serde(default)]
    pub timezone: ExportZone,
}

fn default_output_dir() -> String {
    ".".to_string()
}

impl ExportConfig {
    /// Output directory with a leading `~/` expanded
    pub fn output_path(&self) -> PathBuf {
        expand_home(&self.output_dir)
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            format: ExportFormat::default(),
            timezone: ExportZone::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl LoggingConfig {
    /// Install the global subscriber, writing to stderr.
    ///
    /// `RUST_LOG` wins over the configured level. `extra` is appended to the
    /// default filter (e.g. `"tower_http=debug"`).
    pub fn init(&self, extra: Option<&str>) {
        use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

        let directive = match extra {
            Some(extra) => format!("weighlog={},{}", self.level, extra),
            None => format!("weighlog={}", self.level),
        };
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));
        let registry = tracing_subscriber::registry().with(filter);

        if self.format.eq_ignore_ascii_case("json") {
            registry
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        } else {
            registry.with(fmt::layer().with_writer(std::io::stderr)).init();
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("weighlog").join("config.toml")),
            Some(PathBuf::from("/etc/weighlog/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Load an explicit file when given, else the default locations
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_with_env(path),
            None => Ok(Self::load_default()),
        }
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Backend overrides
        if let Some(url) = var("WEIGHLOG_BACKEND_URL") {
            self.backend.url = url;
        }
        if let Some(key) = var("WEIGHLOG_API_KEY") {
            self.backend.api_key = Some(key);
        }
        if let Some(feed) = var("WEIGHLOG_FEED") {
            match feed.parse() {
                Ok(kind) => self.backend.feed = kind,
                Err(e) => tracing::warn!("Ignoring WEIGHLOG_FEED: {}", e),
            }
        }

        // Server overrides
        if let Some(host) = var("WEIGHLOG_API_HOST") {
            self.api.host = host;
        }
        if let Some(port) = var("WEIGHLOG_API_PORT") {
            if let Ok(p) = port.parse() {
                self.api.port = p;
            }
        }
        if let Some(database) = var("WEIGHLOG_DATABASE") {
            self.api.database = database;
        }

        // Export overrides
        if let Some(dir) = var("WEIGHLOG_EXPORT_DIR") {
            self.export.output_dir = dir;
        }

        // Logging overrides
        if let Some(level) = var("WEIGHLOG_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("WEIGHLOG_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Weighlog Configuration
#
# Environment variables override these settings:
# - WEIGHLOG_BACKEND_URL
# - WEIGHLOG_API_KEY
# - WEIGHLOG_FEED
# - WEIGHLOG_API_HOST
# - WEIGHLOG_API_PORT
# - WEIGHLOG_DATABASE
# - WEIGHLOG_EXPORT_DIR
# - WEIGHLOG_LOG_LEVEL
# - WEIGHLOG_LOG_FORMAT

[backend]
# Entries store base URL
url = "http://localhost:3001"

# Credential sent as bearer token and apikey header
# api_key = ""

# Change feed: poll (re-fetch on an interval) or push (WebSocket notifications)
feed = "poll"

# Polling interval (ms)
poll_interval_ms = 2000

# Delay before reconnecting a dropped push feed (ms)
reconnect_delay_ms = 3000

# Per-request timeout in seconds (unset waits indefinitely)
# request_timeout_secs = 30

[api]
# Reference backend host
host = "0.0.0.0"

# Reference backend port
port = 3001

# SQLite database file
database = "~/.local/share/weighlog/entries.db"

[export]
# Directory exported spreadsheets are written to
output_dir = "."

# File format: xlsx or csv
format = "xlsx"

# Time zone for dates and times: local or utc
timezone = "local"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.backend.url, "http://localhost:3001");
        assert_eq!(config.backend.feed, FeedKind::Poll);
        assert_eq!(config.backend.poll_interval_ms, 2000);
        assert_eq!(config.backend.reconnect_delay_ms, 3000);
        assert!(config.backend.request_timeout_secs.is_none());
        assert_eq!(config.api.port, 3001);
        assert_eq!(config.export.format, ExportFormat::Xlsx);
        assert_eq!(config.export.timezone, ExportZone::Local);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_generated_config_parses_to_defaults() {
        let config: Config = toml::from_str(&generate_default_config()).unwrap();
        assert_eq!(config.backend.url, "http://localhost:3001");
        assert_eq!(config.backend.feed, FeedKind::Poll);
        assert_eq!(config.api.host, "0.0.0.0");
        assert_eq!(config.api.port, 3001);
        assert_eq!(config.export.output_dir, ".");
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            concat!(
                "[backend]\nfeed = \"push\"\napi_key = \"secret\"\n\n",
                "[export]\nformat = \"csv\"\ntimezone = \"utc\"\n",
            ),
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.backend.feed, FeedKind::Push);
        assert_eq!(config.backend.api_key.as_deref(), Some("secret"));
        assert_eq!(config.backend.poll_interval_ms, 2000);
        assert_eq!(config.export.format, ExportFormat::Csv);
        assert_eq!(config.export.timezone, ExportZone::Utc);
    }

    #[test]
    fn test_load_errors() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(matches!(Config::load(&missing), Err(ConfigError::Io { .. })));

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "[backend]\nfeed = \"carrier-pigeon\"\n").unwrap();
        assert!(matches!(Config::load(&bad), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("WEIGHLOG_BACKEND_URL", "http://scale.local:9000"),
            ("WEIGHLOG_FEED", "push"),
            ("WEIGHLOG_API_PORT", "not-a-port"),
            ("WEIGHLOG_DATABASE", "/tmp/entries.db"),
            ("WEIGHLOG_LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.backend.url, "http://scale.local:9000");
        assert_eq!(config.backend.feed, FeedKind::Push);
        assert_eq!(config.api.port, 3001);
        assert_eq!(config.api.database, "/tmp/entries.db");
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_store_and_server_configs() {
        let mut config = Config::default();
        config.backend.api_key = Some("k".to_string());
        config.backend.request_timeout_secs = Some(5);

        let store = config.backend.store_config();
        assert_eq!(store.base_url, "http://localhost:3001");
        assert_eq!(store.api_key.as_deref(), Some("k"));
        assert_eq!(store.request_timeout_secs, Some(5));

        assert_eq!(config.api.api_config().addr(), "0.0.0.0:3001");
    }

    #[test]
    fn test_home_expansion() {
        let mut config = Config::default();
        config.api.database = "/var/lib/weighlog/entries.db".to_string();
        assert_eq!(config.api.database_path(), PathBuf::from("/var/lib/weighlog/entries.db"));

        if let Some(home) = dirs::home_dir() {
            config.export.output_dir = "~/exports".to_string();
            assert_eq!(config.export.output_path(), home.join("exports"));
        }
    }

    #[tokio::test]
    async fn test_connect_builds_both_feed_kinds() {
        let mut backend = BackendConfig::default();
        assert!(backend.connect().is_ok());

        backend.feed = FeedKind::Push;
        assert!(backend.connect().is_ok());
    }
}
