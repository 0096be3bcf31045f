use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Link bring-up parameters.
///
/// # Example
///
/// ```
/// use gatekeep_link::LinkConfig;
///
/// let config = LinkConfig::default()
///     .with_address("10.0.0.7:7400")
///     .with_connect_timeout_ms(500);
/// assert_eq!(config.connect_timeout().as_millis(), 500);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Socket address the Control node listens on and the HMI node dials.
    pub address: String,

    /// Connection attempt timeout in milliseconds.
    pub connect_timeout_ms: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:7400".to_string(),
            connect_timeout_ms: 3000,
        }
    }
}

impl LinkConfig {
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    pub fn with_connect_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.connect_timeout_ms = timeout_ms;
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}
