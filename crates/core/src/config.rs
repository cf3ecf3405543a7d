// Player configuration

use std::time::Duration;

/// Poll timeout used by the event bridge when nothing else is configured
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(1);

/// Properties observed at setup so the observable state can follow them
pub const DEFAULT_OBSERVED_PROPERTIES: [&str; 3] = ["pause", "time-pos", "duration"];

/// Overrides the poll timeout (milliseconds) in [`PlayerConfig::from_env`]
pub const POLL_TIMEOUT_ENV: &str = "MPV_BRIDGE_POLL_TIMEOUT_MS";

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerConfig {
    /// Upper bound for one `wait_event` call; also bounds shutdown latency without a wakeup
    pub poll_timeout: Duration,
    /// Properties registered for change events right after initialization
    pub observed_properties: Vec<String>,
    /// Engine options written before initialization, in order
    pub options: Vec<(String, String)>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            observed_properties: DEFAULT_OBSERVED_PROPERTIES
                .iter()
                .map(|name| name.to_string())
                .collect(),
            options: Vec::new(),
        }
    }
}

impl PlayerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults plus environment overrides
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var(POLL_TIMEOUT_ENV) {
            match parse_poll_timeout(&raw) {
                Some(timeout) => config.poll_timeout = timeout,
                None => log::warn!("ignoring {}={:?}: expected milliseconds > 0", POLL_TIMEOUT_ENV, raw),
            }
        }
        config
    }

    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    pub fn with_option(mut self, name: &str, value: &str) -> Self {
        self.options.push((name.to_string(), value.to_string()));
        self
    }

    /// Observe one more property at setup (duplicates are ignored)
    pub fn observe(mut self, name: &str) -> Self {
        if !self.observed_properties.iter().any(|n| n == name) {
            self.observed_properties.push(name.to_string());
        }
        self
    }
}

fn parse_poll_timeout(raw: &str) -> Option<Duration> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PlayerConfig::default();
        assert_eq!(config.poll_timeout, Duration::from_secs(1));
        assert_eq!(config.observed_properties, vec!["pause", "time-pos", "duration"]);
        assert!(config.options.is_empty());
    }

    #[test]
    fn test_builders() {
        let config = PlayerConfig::new()
            .with_poll_timeout(Duration::from_millis(250))
            .with_option("hwdec", "auto-safe")
            .observe("volume")
            .observe("pause");
        assert_eq!(config.poll_timeout, Duration::from_millis(250));
        assert_eq!(config.options, vec![("hwdec".to_string(), "auto-safe".to_string())]);
        assert_eq!(config.observed_properties.len(), 4);
    }

    #[test]
    fn test_parse_poll_timeout() {
        assert_eq!(parse_poll_timeout("500"), Some(Duration::from_millis(500)));
        assert_eq!(parse_poll_timeout(" 20 "), Some(Duration::from_millis(20)));
        assert_eq!(parse_poll_timeout("0"), None);
        assert_eq!(parse_poll_timeout("soon"), None);
    }
}
