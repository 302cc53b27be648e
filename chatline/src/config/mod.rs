//! Configuration system for the `Chatline` client.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/chatline/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chatline_proto::room::{DEFAULT_ROOM, RoomName, RoomNameError};
use url::Url;

use crate::net::NetConfig;

/// Server URL used when neither CLI nor file sets one.
pub const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:8000/v1/chat";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),

    /// The server URL could not be parsed.
    #[error("invalid server url {url:?}: {source}")]
    InvalidUrl {
        /// The rejected value.
        url: String,
        /// Parser error.
        source: url::ParseError,
    },

    /// The server URL is not a WebSocket URL.
    #[error("server url must use ws:// or wss://, got {0}://")]
    UnsupportedScheme(String),

    /// No username was configured.
    #[error("no username configured (use --username or CHATLINE_USER)")]
    MissingUsername,

    /// The default room name is not valid.
    #[error("invalid default room: {0}")]
    InvalidRoom(#[from] RoomNameError),

    /// A timer interval was configured as zero.
    #[error("{0} must be at least one second")]
    ZeroInterval(&'static str),
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    network: NetworkFileConfig,
    session: SessionFileConfig,
    ui: UiFileConfig,
}

/// `[network]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct NetworkFileConfig {
    server_url: Option<String>,
    username: Option<String>,
    connect_timeout_secs: Option<u64>,
}

/// `[session]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct SessionFileConfig {
    default_room: Option<String>,
    heartbeat_interval_secs: Option<u64>,
    reconnect_interval_secs: Option<u64>,
    channel_capacity: Option<usize>,
}

/// `[ui]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct UiFileConfig {
    timestamp_format: Option<String>,
}

// ---------------------------------------------------------------------------
// Resolved configuration (concrete types, all fields populated)
// ---------------------------------------------------------------------------

/// Fully resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    // -- Network --
    /// Chat server WebSocket URL, unvalidated.
    pub server_url: String,
    /// Name to connect as.
    pub username: Option<String>,
    /// Timeout for a single connection attempt.
    pub connect_timeout: Duration,

    // -- Session --
    /// Room joined on every (re)connect.
    pub default_room: String,
    /// Period between heartbeat pings.
    pub heartbeat_interval: Duration,
    /// Period between reconnect checks.
    pub reconnect_interval: Duration,
    /// Channel capacity for the command channel.
    pub channel_capacity: usize,

    // -- UI --
    /// Timestamp display format string (chrono).
    pub timestamp_format: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            username: None,
            connect_timeout: Duration::from_secs(10),
            default_room: DEFAULT_ROOM.to_string(),
            heartbeat_interval: Duration::from_secs(10),
            reconnect_interval: Duration::from_secs(3),
            channel_capacity: 256,
            timestamp_format: "%H:%M".to_string(),
        }
    }
}

impl ClientConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the explicit config file cannot be read,
    /// or if any config file that exists cannot be parsed.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, &file))
    }

    /// Resolve a `ClientConfig` from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default.
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            server_url: cli
                .server_url
                .clone()
                .or_else(|| file.network.server_url.clone())
                .unwrap_or(defaults.server_url),
            username: cli
                .username
                .clone()
                .or_else(|| file.network.username.clone()),
            connect_timeout: file
                .network
                .connect_timeout_secs
                .map_or(defaults.connect_timeout, Duration::from_secs),
            default_room: cli
                .room
                .clone()
                .or_else(|| file.session.default_room.clone())
                .unwrap_or(defaults.default_room),
            heartbeat_interval: file
                .session
                .heartbeat_interval_secs
                .map_or(defaults.heartbeat_interval, Duration::from_secs),
            reconnect_interval: file
                .session
                .reconnect_interval_secs
                .map_or(defaults.reconnect_interval, Duration::from_secs),
            channel_capacity: file
                .session
                .channel_capacity
                .unwrap_or(defaults.channel_capacity),
            timestamp_format: cli
                .timestamp_format
                .clone()
                .or_else(|| file.ui.timestamp_format.clone())
                .unwrap_or(defaults.timestamp_format),
        }
    }

    /// Build a [`NetConfig`] from this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the username is missing or blank, the
    /// server URL is not a `ws`/`wss` URL, the default room is invalid, or
    /// a timer interval is zero.
    pub fn to_net_config(&self) -> Result<NetConfig, ConfigError> {
        let username = self
            .username
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or(ConfigError::MissingUsername)?;
        let server_url = parse_server_url(&self.server_url)?;
        let default_room = RoomName::new(&self.default_room)?;
        if self.heartbeat_interval.is_zero() {
            return Err(ConfigError::ZeroInterval("heartbeat_interval_secs"));
        }
        if self.reconnect_interval.is_zero() {
            return Err(ConfigError::ZeroInterval("reconnect_interval_secs"));
        }

        Ok(NetConfig {
            default_room,
            heartbeat_interval: self.heartbeat_interval,
            reconnect_interval: self.reconnect_interval,
            connect_timeout: self.connect_timeout,
            channel_capacity: self.channel_capacity.max(1),
            ..NetConfig::new(server_url, username)
        })
    }
}

/// Parse and check a chat server URL.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidUrl`] for unparseable input and
/// [`ConfigError::UnsupportedScheme`] for anything but `ws`/`wss`.
pub fn parse_server_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|source| ConfigError::InvalidUrl {
        url: raw.to_string(),
        source,
    })?;
    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(ConfigError::UnsupportedScheme(other.to_string())),
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Terminal chat client")]
pub struct CliArgs {
    /// WebSocket URL of the chat endpoint.
    #[arg(long, env = "CHATLINE_URL")]
    pub server_url: Option<String>,

    /// Name to chat as.
    #[arg(short, long, env = "CHATLINE_USER")]
    pub username: Option<String>,

    /// Room to join on connect (default: `general`).
    #[arg(long)]
    pub room: Option<String>,

    /// Path to config file (default: `~/.config/chatline/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Timestamp display format (chrono format string).
    #[arg(long)]
    pub timestamp_format: Option<String>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "CHATLINE_LOG")]
    pub log_level: String,

    /// Path to log file (default: `$TMPDIR/chatline.log`).
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and missing file
/// is treated as empty config.
fn load_config_file(explicit_path: Option<&Path>) -> Result<ConfigFile, ConfigError> {
    if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    }

    let Some(config_dir) = dirs::config_dir() else {
        return Ok(ConfigFile::default());
    };
    let path = config_dir.join("chatline").join("config.toml");

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
