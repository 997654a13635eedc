use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use relay_engine::{FeedTiming, FetchSettings, GateTiming, RelayConfig};
use relay_logging::relay_info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "relay.ron";
const DEFAULT_STORAGE_PATH: &str = "relay_storage.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: ron::error::SpannedError,
    },
}

/// Contents of `relay.ron`. Every field may be omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub settings_page_url: String,
    pub storage_path: PathBuf,
    pub log_level: log::LevelFilter,
    pub fetch: FetchConfig,
    pub timing: TimingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    pub allowed_content_types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub fetch_interval_secs: u64,
    pub ping_interval_ms: u64,
    pub chunk_interval_ms: u64,
    pub marker_delay_ms: u64,
    pub lock_poll_ms: u64,
    pub drain_delay_ms: u64,
    pub drain_jitter_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            settings_page_url: RelayConfig::default().settings_page_url,
            storage_path: PathBuf::from(DEFAULT_STORAGE_PATH),
            log_level: log::LevelFilter::Info,
            fetch: FetchConfig::default(),
            timing: TimingConfig::default(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        let defaults = FetchSettings::default();
        Self {
            connect_timeout_ms: millis(defaults.connect_timeout),
            request_timeout_ms: millis(defaults.request_timeout),
            redirect_limit: defaults.redirect_limit,
            max_bytes: defaults.max_bytes,
            allowed_content_types: defaults.allowed_content_types,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        let feed = FeedTiming::default();
        let gate = GateTiming::default();
        Self {
            fetch_interval_secs: feed.fetch_interval.as_secs(),
            ping_interval_ms: millis(feed.ping_interval),
            chunk_interval_ms: millis(feed.chunk_interval),
            marker_delay_ms: millis(feed.marker_delay),
            lock_poll_ms: millis(gate.lock_poll),
            drain_delay_ms: millis(gate.drain_delay),
            drain_jitter_ms: millis(gate.drain_jitter),
        }
    }
}

impl AppConfig {
    pub fn relay_config(&self) -> RelayConfig {
        let timing = &self.timing;
        RelayConfig {
            settings_page_url: self.settings_page_url.clone(),
            gate: GateTiming {
                drain_delay: Duration::from_millis(timing.drain_delay_ms),
                drain_jitter: Duration::from_millis(timing.drain_jitter_ms),
                lock_poll: Duration::from_millis(timing.lock_poll_ms),
            },
            feed: FeedTiming {
                fetch_interval: Duration::from_secs(timing.fetch_interval_secs),
                ping_interval: Duration::from_millis(timing.ping_interval_ms),
                chunk_interval: Duration::from_millis(timing.chunk_interval_ms),
                marker_delay: Duration::from_millis(timing.marker_delay_ms),
            },
        }
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            connect_timeout: Duration::from_millis(self.fetch.connect_timeout_ms),
            request_timeout: Duration::from_millis(self.fetch.request_timeout_ms),
            redirect_limit: self.fetch.redirect_limit,
            max_bytes: self.fetch.max_bytes,
            allowed_content_types: self.fetch.allowed_content_types.clone(),
        }
    }
}

/// Reads the configuration file. A missing file yields the defaults.
pub fn load(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            relay_info!("No configuration at {:?}, using defaults", path);
            return Ok(AppConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    ron::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
