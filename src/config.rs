use std::env;
use std::time::Duration;

use crate::backoff::ReconnectConfig;

const DEFAULT_API_BASE: &str = "http://localhost:8000/api/v1";
const DEFAULT_WS_URL: &str = "ws://localhost:8000/ws/live";

/// Runtime settings, read once from the environment (after `.env` files are
/// loaded by the binary).
#[derive(Debug, Clone)]
pub struct Config {
    pub api_base: String,
    pub ws_url: String,
    pub poll_interval: Duration,
    pub push_enabled: bool,
    pub reconnect: ReconnectConfig,
    pub pending_capacity: usize,
    pub pending_max_age: Duration,
    pub demo: bool,
    pub log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            ws_url: DEFAULT_WS_URL.to_string(),
            poll_interval: Duration::from_secs(30),
            push_enabled: true,
            reconnect: ReconnectConfig::default(),
            pending_capacity: 256,
            pending_max_age: Duration::from_secs(120),
            demo: false,
            log_file: "matchboard.log".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let api_base = env::var("MATCHBOARD_API_BASE")
            .ok()
            .and_then(non_empty)
            .map(|val| val.trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_base);
        let ws_url = env::var("MATCHBOARD_WS_URL")
            .ok()
            .and_then(non_empty)
            .unwrap_or(defaults.ws_url);
        let poll_interval = Duration::from_secs(
            env_parse::<u64>("MATCHBOARD_POLL_SECS")
                .unwrap_or(defaults.poll_interval.as_secs())
                .max(5),
        );
        let push_enabled = env_flag("MATCHBOARD_PUSH").unwrap_or(defaults.push_enabled);
        let reconnect = ReconnectConfig {
            base_delay_ms: env_parse::<u64>("MATCHBOARD_RECONNECT_BASE_MS")
                .unwrap_or(defaults.reconnect.base_delay_ms)
                .clamp(50, 60_000),
            max_delay_ms: env_parse::<u64>("MATCHBOARD_RECONNECT_MAX_MS")
                .unwrap_or(defaults.reconnect.max_delay_ms)
                .clamp(100, 600_000),
            jitter_pct: env_parse::<f64>("MATCHBOARD_RECONNECT_JITTER")
                .unwrap_or(defaults.reconnect.jitter_pct)
                .clamp(0.0, 0.5),
        };
        let pending_capacity = env_parse::<usize>("MATCHBOARD_PENDING_CAP")
            .unwrap_or(defaults.pending_capacity)
            .clamp(1, 10_000);
        let pending_max_age = Duration::from_secs(
            env_parse::<u64>("MATCHBOARD_PENDING_MAX_AGE_SECS")
                .unwrap_or(defaults.pending_max_age.as_secs())
                .clamp(1, 3600),
        );
        let demo = env_flag("MATCHBOARD_DEMO").unwrap_or(false);
        let log_file = env::var("MATCHBOARD_LOG_FILE")
            .ok()
            .and_then(non_empty)
            .unwrap_or(defaults.log_file);

        Self {
            api_base,
            ws_url,
            poll_interval,
            push_enabled,
            reconnect,
            pending_capacity,
            pending_max_age,
            demo,
            log_file,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|val| val.trim().parse::<T>().ok())
}

fn env_flag(key: &str) -> Option<bool> {
    let raw = env::var(key).ok()?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
