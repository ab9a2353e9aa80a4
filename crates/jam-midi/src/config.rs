//! MIDI input configuration.

use crate::error::{Error, Result};
use crate::pipeline::Delivery;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_CLIENT_NAME: &str = "jam";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MidiConfig {
    /// Name the platform shows for this application's MIDI client.
    pub client_name: String,
    pub delivery: Delivery,
    /// Rescan period for hot-plug. `None` enumerates once at startup.
    pub hotplug_interval: Option<Duration>,
}

impl Default for MidiConfig {
    fn default() -> Self {
        Self {
            client_name: DEFAULT_CLIENT_NAME.to_string(),
            delivery: Delivery::Direct,
            hotplug_interval: None,
        }
    }
}

impl MidiConfig {
    pub fn validate(&self) -> Result<()> {
        if self.client_name.trim().is_empty() {
            return Err(Error::InvalidConfig("client name is empty".to_string()));
        }
        if let Delivery::Queued { capacity: 0 } = self.delivery {
            return Err(Error::InvalidConfig(
                "queued delivery needs a capacity of at least 1".to_string(),
            ));
        }
        if self.hotplug_interval == Some(Duration::ZERO) {
            return Err(Error::InvalidConfig(
                "hot-plug interval must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
