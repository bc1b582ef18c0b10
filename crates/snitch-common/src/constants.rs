//! System-wide constants and default paths.

use std::path::PathBuf;

/// Application name used in notifications, paths, and log output.
pub const APP_NAME: &str = "snitch";

/// Binary name for the CLI.
pub const BIN_NAME: &str = "snitch";

/// File name of the durable state document.
pub const STATE_FILE_NAME: &str = "snitch.json";

/// Environment variable overriding the state file location.
pub const STATE_FILE_ENV: &str = "SNITCH_STATE_FILE";

/// Default seconds between two connection table samples.
pub const DEFAULT_POLLING_INTERVAL_SECS: f64 = 0.2;

/// Default seconds between two state flushes.
pub const DEFAULT_WRITE_INTERVAL_SECS: f64 = 600.0;

/// Maximum number of capture candidates buffered between two ticks.
///
/// Candidates offered while the queue is full are dropped and counted.
pub const CAPTURE_QUEUE_CAPACITY: usize = 65_536;

/// Suffix appended to a `Names` entry whose name was already recorded for
/// another executable.
pub const DIFFERENT_LOCATION_SUFFIX: &str = " (different executable location)";

/// Marker inserted before each additional process name of an executable.
pub const ALTERNATIVE_NAME_MARKER: &str = " alternative=";

/// Root of the procfs mount used for connection and process introspection.
pub const PROC_ROOT: &str = "/proc";

/// Returns the per-user configuration directory, `$HOME/.config/snitch`.
///
/// Falls back to a relative `.config/snitch` when `HOME` is unset.
pub fn config_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map_or_else(PathBuf::new, PathBuf::from)
        .join(".config")
        .join(APP_NAME)
}

/// Returns the default state file path.
pub fn default_state_file() -> PathBuf {
    config_dir().join(STATE_FILE_NAME)
}
