use anyhow::{Context, Result, bail};
use gatekeep_control::ControlConfig;
use gatekeep_hardware::TimerConfig;
use gatekeep_hmi::HmiConfig;
use gatekeep_link::LinkConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration file layout. Every section and field is optional.
///
/// ```json
/// {
///   "timer": { "tick_interval_ms": 3000 },
///   "link": { "address": "127.0.0.1:7400" },
///   "control": { "entry_timeout_ticks": 20 },
///   "hmi": { "max_failures": 3 }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub timer: TimerConfig,
    pub link: LinkConfig,
    pub control: ControlConfig,
    pub hmi: HmiConfig,
}

impl AppConfig {
    /// Read `path`, or use the defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate each node, then check that the HMI outwaits the Control
    /// node's longest door cycle.
    pub fn validate(&self) -> Result<()> {
        self.control.validate()?;
        self.hmi.validate()?;

        let Some(hmi_limit) = self.hmi.door_cycle_timeout_ticks else {
            return Ok(());
        };
        match self.control.door_cycle_ticks() {
            Some(cycle) if hmi_limit > cycle => Ok(()),
            Some(cycle) => bail!(
                "hmi.door_cycle_timeout_ticks ({hmi_limit}) must exceed the control \
                 node's door cycle of {cycle} ticks"
            ),
            None => bail!(
                "control.entry_timeout_ticks is unbounded, so \
                 hmi.door_cycle_timeout_ticks must be null"
            ),
        }
    }
}
