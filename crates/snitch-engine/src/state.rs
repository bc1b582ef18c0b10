//! Persistent observation history.
//!
//! The whole history is one JSON document: configuration, diagnostic
//! errors, the executable and name audit trails, and one entry per
//! executable that ever reached a public address. Keys are written in
//! sorted order so that successive flushes diff cleanly.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use snitch_common::config::SnitchConfig;
use snitch_common::error::{Result, SnitchError};

/// Root aggregate of everything the monitor has observed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnitchState {
    /// Monitor configuration.
    #[serde(rename = "Config")]
    pub config: SnitchConfig,
    /// Timestamped diagnostic messages, oldest first.
    #[serde(rename = "Errors")]
    pub errors: Vec<String>,
    /// Executable paths in order of first connection.
    #[serde(rename = "Executables")]
    pub executables: Vec<String>,
    /// Display names, index-aligned with `executables`.
    #[serde(rename = "Names")]
    pub names: Vec<String>,
    /// Per-executable history keyed by executable path.
    #[serde(rename = "Processes")]
    pub processes: BTreeMap<String, ProcessEntry>,
}

/// History of one executable's outbound connections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessEntry {
    /// Display name, extended with ` alternative=<name>` for each other
    /// name the executable has run under.
    pub name: String,
    /// Distinct command lines, in order of first sighting.
    pub cmdlines: Vec<String>,
    /// Time of the first connection.
    #[serde(rename = "first seen")]
    pub first_seen: String,
    /// Time of the latest connection.
    #[serde(rename = "last seen")]
    pub last_seen: String,
    /// Number of distinct calendar days with at least one connection.
    #[serde(rename = "days seen")]
    pub days_seen: u64,
    /// Distinct remote addresses, in order of first contact.
    #[serde(rename = "remote addresses")]
    pub remote_addresses: Vec<String>,
}

impl SnitchState {
    /// Creates an empty history with the given configuration.
    #[must_use]
    pub fn with_config(config: SnitchConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Appends a diagnostic message prefixed with its timestamp.
    pub fn record_error(&mut self, now: &str, message: &str) {
        self.errors.push(format!("{now} {message}"));
    }
}

/// Loads the history from disk.
///
/// A missing file is not an error: a fresh default history is returned.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read, is not a
/// complete state document, or carries an invalid configuration.
pub fn load_state(path: &Path) -> Result<SnitchState> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "no state file, starting fresh");
        return Ok(SnitchState::default());
    }
    tracing::debug!(path = %path.display(), "loading state");
    let content = std::fs::read_to_string(path).map_err(|e| SnitchError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let state: SnitchState = serde_json::from_str(&content)?;
    state.config.validate()?;
    Ok(state)
}

/// Persists the history to disk atomically.
///
/// The document is written to a sibling temporary file and renamed over
/// the target, creating the parent directory if needed.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be written.
pub fn save_state(path: &Path, state: &SnitchState) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| SnitchError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    let mut content = to_sorted_json(state)?;
    content.push('\n');

    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, content).map_err(|e| SnitchError::Io {
        path: tmp.clone(),
        source: e,
    })?;
    std::fs::rename(&tmp, path).map_err(|e| SnitchError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    tracing::debug!(path = %path.display(), processes = state.processes.len(), "state saved");
    Ok(())
}

/// Renders the state as pretty JSON with keys sorted at every level.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_sorted_json(state: &SnitchState) -> Result<String> {
    // `Value` objects are `BTreeMap`s, so the detour sorts struct fields too.
    let value = serde_json::to_value(state)?;
    Ok(serde_json::to_string_pretty(&value)?)
}
