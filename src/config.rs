use crate::application::DEFAULT_DISPLAY_LIMIT;
use crate::infrastructure::MonitoringConfig;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_INTERVAL_MS: u64 = 30_000;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    // HTTP API settings
    pub listen_addr: String,

    // Storage settings
    pub store_path: String,
    pub connections_path: String,

    // Monitoring settings
    pub monitoring_enabled: bool,
    pub monitoring_interval_ms: u64,
    pub monitoring_retain: Option<usize>,

    // Read API settings
    pub display_limit: i64,
    pub window_hours: u64,

    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8090".to_string(),
            store_path: "metrics.db".to_string(),
            connections_path: "connections.json".to_string(),
            monitoring_enabled: true,
            monitoring_interval_ms: DEFAULT_INTERVAL_MS,
            monitoring_retain: None,
            display_limit: DEFAULT_DISPLAY_LIMIT,
            window_hours: 24,
            debug: false,
        }
    }
}

impl Config {
    /// Collector settings. Without an explicit retain count the store keeps
    /// one day of samples at the configured interval.
    pub fn monitoring(&self) -> MonitoringConfig {
        let interval = Duration::from_millis(self.monitoring_interval_ms);
        let retain = self
            .monitoring_retain
            .unwrap_or_else(|| MonitoringConfig::one_day_of(interval))
            .max(1);
        MonitoringConfig {
            enabled: self.monitoring_enabled,
            interval,
            retain,
        }
    }
}

pub fn load_config() -> anyhow::Result<Config> {
    let listen_addr = std::env::var("DOCWATCH_LISTEN_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8090".to_string());

    let store_path = std::env::var("DOCWATCH_STORE_PATH")
        .unwrap_or_else(|_| "metrics.db".to_string());

    let connections_path = std::env::var("DOCWATCH_CONNECTIONS_PATH")
        .unwrap_or_else(|_| "connections.json".to_string());

    // Monitoring settings
    let monitoring_enabled = std::env::var("DOCWATCH_MONITORING_ENABLED")
        .map(|v| !(v == "0" || v.to_lowercase() == "false"))
        .unwrap_or(true);

    let monitoring_interval_ms = std::env::var("DOCWATCH_MONITORING_INTERVAL_MS")
        .unwrap_or_else(|_| DEFAULT_INTERVAL_MS.to_string())
        .parse::<u64>()
        .ok()
        .filter(|ms| *ms > 0)
        .unwrap_or(DEFAULT_INTERVAL_MS);

    let monitoring_retain = std::env::var("DOCWATCH_MONITORING_RETAIN")
        .ok()
        .and_then(|v| v.parse::<usize>().ok());

    // Read API settings
    let display_limit = std::env::var("DOCWATCH_DISPLAY_LIMIT")
        .unwrap_or_else(|_| DEFAULT_DISPLAY_LIMIT.to_string())
        .parse()
        .unwrap_or(DEFAULT_DISPLAY_LIMIT);

    let window_hours = std::env::var("DOCWATCH_WINDOW_HOURS")
        .unwrap_or_else(|_| "24".to_string())
        .parse()
        .unwrap_or(24);

    let debug = std::env::var("DEBUG").is_ok();

    Ok(Config {
        listen_addr,
        store_path,
        connections_path,
        monitoring_enabled,
        monitoring_interval_ms,
        monitoring_retain,
        display_limit,
        window_hours,
        debug,
    })
}
