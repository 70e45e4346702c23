//! In-memory event log configuration.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Maximum event log capacity.
const MAX_EVENT_LOG_CAPACITY: usize = 1_000_000;

const fn default_capacity() -> usize {
    10_000
}

/// Settings for the bounded in-memory event log.
///
/// The log keeps the most recent `capacity` entries; older entries are
/// dropped. External indexers that need the full history must subscribe with
/// their own sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EventLogConfig {
    /// Number of entries retained (1..=1_000_000). Default: 10_000.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl EventLogConfig {
    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if `capacity` is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_EVENT_LOG_CAPACITY).contains(&self.capacity) {
            return Err(ConfigError::Validation {
                message: format!(
                    "events.capacity must be 1..={MAX_EVENT_LOG_CAPACITY}, got {}",
                    self.capacity
                ),
            });
        }
        Ok(())
    }
}

impl Default for EventLogConfig {
    fn default() -> Self {
        Self { capacity: default_capacity() }
    }
}
