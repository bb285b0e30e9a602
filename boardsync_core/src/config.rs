use serde::Deserialize;
use std::env;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8080/api";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 3000;

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Board API root, including the `/api` prefix.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Period of the generation-status poll (milliseconds).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// How long a followed anchor stays highlighted (milliseconds).
    #[serde(default = "default_highlight_ms")]
    pub highlight_ms: u64,

    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            poll_interval_ms: default_poll_interval_ms(),
            highlight_ms: default_highlight_ms(),
            request_timeout_secs: default_timeout_secs(),
        }
    }
}

impl SyncConfig {
    pub fn from_env() -> Self {
        let api_url = env::var("BOARDSYNC_API_URL")
            .ok()
            .and_then(|raw| {
                if raw.trim().is_empty() {
                    None
                } else {
                    Some(raw)
                }
            })
            .unwrap_or_else(default_api_url);

        Self {
            api_url,
            poll_interval_ms: env_positive("BOARDSYNC_POLL_INTERVAL_MS")
                .unwrap_or_else(default_poll_interval_ms),
            highlight_ms: env_positive("BOARDSYNC_HIGHLIGHT_MS")
                .unwrap_or_else(default_highlight_ms),
            request_timeout_secs: env_positive("BOARDSYNC_TIMEOUT_SECS")
                .unwrap_or_else(default_timeout_secs),
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Zero in any of the timing fields falls back to that field's default.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(nonzero_or(self.poll_interval_ms, default_poll_interval_ms))
    }

    pub fn highlight_duration(&self) -> Duration {
        Duration::from_millis(nonzero_or(self.highlight_ms, default_highlight_ms))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(nonzero_or(self.request_timeout_secs, default_timeout_secs))
    }
}

// Zero counts as unset.
fn env_positive(key: &str) -> Option<u64> {
    env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .filter(|value| *value > 0)
}

fn nonzero_or(value: u64, default: fn() -> u64) -> u64 {
    if value == 0 {
        default()
    } else {
        value
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_highlight_ms() -> u64 {
    1500
}

fn default_timeout_secs() -> u64 {
    15
}
