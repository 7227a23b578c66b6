//! Configuration parsing for the DX spot aggregator.
//!
//! All settings come from a single optional JSON file. Every field has a
//! production default, so an empty object `{}` (or no file at all) yields a
//! working configuration.
//!
//! # Example config
//!
//! ```json
//! {
//!   "server": { "bind_addr": "0.0.0.0:3000" },
//!   "logging": { "module_name": "dx-runner", "log_path": "/var/log/dx" },
//!   "hamqth": { "fetch_limit": 50, "cache_ttl_secs": 30 },
//!   "dxspider": {
//!     "nodes": [{ "host": "dxspider.co.uk", "port": 7300 }],
//!     "login_call": "N0CALL-2",
//!     "target_spots": 25
//!   },
//!   "paths": { "window_secs": 300, "max_paths": 25 }
//! }
//! ```

use std::time::Duration;

use serde::Deserialize;

use crate::error::DxError;

/// Top-level application config, deserialized from a JSON file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub http: HttpConfig,
    pub hamqth: HamQthConfig,
    pub dxspider: DxSpiderConfig,
    pub paths: PathsConfig,
}

impl AppConfig {
    /// Reject values that would make a component unusable.
    pub fn validate(&self) -> Result<(), DxError> {
        if self.dxspider.nodes.is_empty() {
            return Err(DxError::Config("dxspider.nodes must not be empty".into()));
        }
        if self.dxspider.login_call.trim().is_empty() {
            return Err(DxError::Config("dxspider.login_call must not be empty".into()));
        }
        if self.dxspider.target_spots == 0 {
            return Err(DxError::Config("dxspider.target_spots must be positive".into()));
        }
        if self.hamqth.fetch_limit == 0 {
            return Err(DxError::Config("hamqth.fetch_limit must be positive".into()));
        }
        if self.paths.max_paths == 0 {
            return Err(DxError::Config("paths.max_paths must be positive".into()));
        }
        Ok(())
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_addr: "0.0.0.0:3000".into() }
    }
}

/// Module metadata block (log file prefix and directory).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub module_name: Option<String>,
    pub log_path: Option<String>,
}

/// Per-caller behavior of the HTTP routes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// How long a caller waits on a coalesced refresh before falling back to
    /// whatever the cache holds.
    pub request_deadline_secs: u64,
}

impl HttpConfig {
    pub fn request_deadline(&self) -> Duration {
        Duration::from_secs(self.request_deadline_secs)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { request_deadline_secs: 20 }
    }
}

/// HamQTH CSV feed settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HamQthConfig {
    /// CSV endpoint; `?limit=N` is appended per request.
    pub url: String,
    /// Number of spots requested per fetch.
    pub fetch_limit: usize,
    /// Hard timeout for the whole request, body included.
    pub timeout_secs: u64,
    pub cache_ttl_secs: u64,
    /// Bodies larger than this are truncated at a line boundary.
    pub max_body_bytes: usize,
    pub user_agent: String,
}

impl HamQthConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

impl Default for HamQthConfig {
    fn default() -> Self {
        Self {
            url: "https://www.hamqth.com/dxc_csv.php".into(),
            fetch_limit: 50,
            timeout_secs: 10,
            cache_ttl_secs: 30,
            max_body_bytes: 256 * 1024,
            user_agent: concat!("dx-runner/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

/// One DXSpider cluster node.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NodeConfig {
    pub host: String,
    pub port: u16,
}

impl NodeConfig {
    /// `host:port` string for `TcpStream::connect`.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// DXSpider session settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DxSpiderConfig {
    /// Nodes tried in order within one refresh until one yields spots.
    pub nodes: Vec<NodeConfig>,
    /// Guest credential sent at the login prompt.
    pub login_call: String,
    /// Session ends politely once this many distinct spots are collected.
    pub target_spots: usize,
    /// Unconditional per-session deadline.
    pub watchdog_secs: u64,
    /// Pause after the greeting before sending the listing command.
    pub prompt_grace_ms: u64,
    /// Pause after the termination command before closing the socket.
    pub drain_grace_ms: u64,
    pub cache_ttl_secs: u64,
    /// Listing command; `{n}` is replaced by `target_spots`.
    pub list_command: String,
    pub bye_command: String,
}

impl DxSpiderConfig {
    pub fn watchdog(&self) -> Duration {
        Duration::from_secs(self.watchdog_secs)
    }

    pub fn prompt_grace(&self) -> Duration {
        Duration::from_millis(self.prompt_grace_ms)
    }

    pub fn drain_grace(&self) -> Duration {
        Duration::from_millis(self.drain_grace_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// The listing command with the spot count substituted.
    pub fn effective_list_command(&self) -> String {
        self.list_command.replace("{n}", &self.target_spots.to_string())
    }
}

impl Default for DxSpiderConfig {
    fn default() -> Self {
        Self {
            nodes: vec![NodeConfig { host: "dxspider.co.uk".into(), port: 7300 }],
            login_call: "N0CALL".into(),
            target_spots: 25,
            watchdog_secs: 15,
            prompt_grace_ms: 1000,
            drain_grace_ms: 500,
            cache_ttl_secs: 60,
            list_command: "sh/dx {n}".into(),
            bye_command: "bye".into(),
        }
    }
}

/// PathComposer settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub cache_ttl_secs: u64,
    /// Only spots observed within this window are drawn.
    pub window_secs: u64,
    pub fetch_limit: usize,
    /// Cap on distinct callsigns resolved per refresh.
    pub max_lookups: usize,
    pub max_paths: usize,
}

impl PathsConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.window_secs as i64)
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self { cache_ttl_secs: 30, window_secs: 300, fetch_limit: 50, max_lookups: 40, max_paths: 25 }
    }
}

/// Load and parse a JSON config file.
pub fn load_config(path: &std::path::Path) -> anyhow::Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = serde_json::from_str(&content)?;
    config.validate()?;
    Ok(config)
}
