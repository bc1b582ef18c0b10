//! Monitor configuration stored alongside the observation history.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_POLLING_INTERVAL_SECS, DEFAULT_WRITE_INTERVAL_SECS};
use crate::error::{Result, SnitchError};

/// Runtime configuration of the monitor.
///
/// Serialized under the `"Config"` key of the state document with the key
/// names of the established on-disk format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnitchConfig {
    /// Seconds between two connection table samples.
    #[serde(rename = "Polling interval")]
    pub polling_interval_secs: f64,
    /// Seconds between two periodic state flushes.
    #[serde(rename = "Write interval")]
    pub write_interval_secs: f64,
    /// Whether the packet capture reconciler runs.
    #[serde(rename = "Use pcap")]
    pub use_capture: bool,
}

impl Default for SnitchConfig {
    fn default() -> Self {
        Self {
            polling_interval_secs: DEFAULT_POLLING_INTERVAL_SECS,
            write_interval_secs: DEFAULT_WRITE_INTERVAL_SECS,
            use_capture: false,
        }
    }
}

impl SnitchConfig {
    /// Checks that both intervals are usable by the tick loop.
    ///
    /// # Errors
    ///
    /// Returns [`SnitchError::Config`] if the polling interval is not a
    /// positive finite number or the write interval is negative or not finite.
    pub fn validate(&self) -> Result<()> {
        if !self.polling_interval_secs.is_finite() || self.polling_interval_secs <= 0.0 {
            return Err(SnitchError::Config {
                message: format!(
                    "polling interval must be a positive number of seconds, got {}",
                    self.polling_interval_secs
                ),
            });
        }
        if !self.write_interval_secs.is_finite() || self.write_interval_secs < 0.0 {
            return Err(SnitchError::Config {
                message: format!(
                    "write interval must be a non-negative number of seconds, got {}",
                    self.write_interval_secs
                ),
            });
        }
        Ok(())
    }

    /// Returns the polling interval as a [`std::time::Duration`].
    #[must_use]
    pub fn polling_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(self.polling_interval_secs.max(0.0))
    }

    /// Number of ticks between two periodic flushes, never less than one.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    #[must_use]
    pub fn write_interval_ticks(&self) -> u64 {
        let ticks = (self.write_interval_secs / self.polling_interval_secs).round();
        if ticks.is_finite() && ticks >= 1.0 {
            ticks as u64
        } else {
            1
        }
    }
}
