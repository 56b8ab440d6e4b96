//! Client configuration.

use serde::Deserialize;
use std::time::Duration;

/// Conventional port for the simulator's telnet property server.
pub const DEFAULT_PORT: u16 = 5401;

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for [`PropertyTreeClient`].
///
/// Deserializes from TOML, with humantime durations:
///
/// ```toml
/// connect_timeout = "2s"
/// ```
///
/// [`PropertyTreeClient`]: crate::PropertyTreeClient
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// How long `bind` waits for the transport connection before reporting
    /// a timeout to the delegate.
    #[serde(default = "default_connect_timeout", with = "humantime_serde")]
    pub connect_timeout: Duration,
}

fn default_connect_timeout() -> Duration {
    DEFAULT_CONNECT_TIMEOUT
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_humantime_timeout() {
        let config: ClientConfig = toml::from_str("connect_timeout = \"250ms\"").unwrap();
        assert_eq!(config.connect_timeout, Duration::from_millis(250));
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config: ClientConfig = toml::from_str("").unwrap();
        assert_eq!(config.connect_timeout, DEFAULT_CONNECT_TIMEOUT);
    }
}
