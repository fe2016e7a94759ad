/// Runtime configuration read from environment variables
///
/// Every setting has a default; unparseable values fall back to it.

use std::path::PathBuf;
use std::time::Duration;

use super::feed::FeedConfig;

pub const DEFAULT_WS_BACKEND: &str = "wss://crypto-cluster-backend.onrender.com";

/// Application configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Backend WebSocket URL (`WS_BACKEND`)
    pub ws_url: String,
    /// UI redraw tick (`RENDER_INTERVAL_MS`)
    pub render_interval: Duration,
    /// Feed keep-alive ping (`PING_INTERVAL_SECS`)
    pub ping_interval: Duration,
    /// Delay before reconnecting (`RECONNECT_DELAY_SECS`)
    pub reconnect_delay: Duration,
    /// Log file, logging disabled when unset (`CLUSTER_LIVE_LOG`)
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ws_url: DEFAULT_WS_BACKEND.to_string(),
            render_interval: Duration::from_millis(250),
            ping_interval: Duration::from_secs(30),
            reconnect_delay: Duration::from_secs(2),
            log_file: None,
        }
    }
}

impl Config {
    /// Read configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let number = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());

        Self {
            ws_url: lookup("WS_BACKEND")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.ws_url),
            render_interval: number("RENDER_INTERVAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.render_interval),
            ping_interval: number("PING_INTERVAL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.ping_interval),
            reconnect_delay: number("RECONNECT_DELAY_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.reconnect_delay),
            log_file: lookup("CLUSTER_LIVE_LOG")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        }
    }

    /// Feed settings derived from this configuration
    pub fn feed_config(&self) -> FeedConfig {
        FeedConfig::new(self.ws_url.clone())
            .with_ping_interval(self.ping_interval)
            .with_reconnect_delay(self.reconnect_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::from_lookup(lookup(&[]));
        assert_eq!(config, Config::default());
        assert_eq!(config.ws_url, "wss://crypto-cluster-backend.onrender.com");
        assert_eq!(config.render_interval, Duration::from_millis(250));
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_config_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("WS_BACKEND", "ws://localhost:8080"),
            ("RENDER_INTERVAL_MS", "100"),
            ("PING_INTERVAL_SECS", "15"),
            ("RECONNECT_DELAY_SECS", "5"),
            ("CLUSTER_LIVE_LOG", "/tmp/cluster-live.log"),
        ]));

        assert_eq!(config.ws_url, "ws://localhost:8080");
        assert_eq!(config.render_interval, Duration::from_millis(100));
        assert_eq!(config.ping_interval, Duration::from_secs(15));
        assert_eq!(config.reconnect_delay, Duration::from_secs(5));
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/cluster-live.log")));

        let feed = config.feed_config();
        assert_eq!(feed.url, "ws://localhost:8080");
        assert_eq!(feed.ping_interval, Duration::from_secs(15));
        assert_eq!(feed.reconnect_delay, Duration::from_secs(5));
    }

    #[test]
    fn test_config_invalid_values_fall_back() {
        let config = Config::from_lookup(lookup(&[
            ("WS_BACKEND", "  "),
            ("RENDER_INTERVAL_MS", "fast"),
            ("PING_INTERVAL_SECS", "-1"),
        ]));

        assert_eq!(config.ws_url, DEFAULT_WS_BACKEND);
        assert_eq!(config.render_interval, Duration::from_millis(250));
        assert_eq!(config.ping_interval, Duration::from_secs(30));
    }
}
