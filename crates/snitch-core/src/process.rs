//! Process attribute lookup.
//!
//! Resolves a pid to its display name, executable path, and command line.
//! Lookups race against process exit: a pid taken from the connection
//! table may be gone by the time its attributes are read.

use std::fs;
use std::path::PathBuf;

use snitch_common::constants::PROC_ROOT;
use snitch_common::error::{Result, SnitchError};
use snitch_common::types::ProcessInfo;

/// Resolves process ids to process attributes.
pub trait ProcessLookup: Send {
    /// Returns the attributes of `pid`.
    ///
    /// # Errors
    ///
    /// Returns [`SnitchError::NotFound`] if the process has exited and
    /// [`SnitchError::PermissionDenied`] if its attributes are unreadable.
    fn lookup(&self, pid: u32) -> Result<ProcessInfo>;
}

/// Reads process attributes from procfs.
#[derive(Debug, Clone)]
pub struct ProcProcessLookup {
    root: PathBuf,
}

impl ProcProcessLookup {
    /// Creates a lookup over the host's `/proc`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_root(PROC_ROOT)
    }

    /// Creates a lookup over a procfs tree mounted at `root`.
    #[must_use]
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn pid_path(&self, pid: u32, file: &str) -> PathBuf {
        self.root.join(pid.to_string()).join(file)
    }
}

impl Default for ProcProcessLookup {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessLookup for ProcProcessLookup {
    fn lookup(&self, pid: u32) -> Result<ProcessInfo> {
        let comm_path = self.pid_path(pid, "comm");
        let name = fs::read_to_string(&comm_path)
            .map_err(|e| SnitchError::from_io("process", pid.to_string(), comm_path, e))?
            .trim_end_matches('\n')
            .to_owned();

        let exe_path = self.pid_path(pid, "exe");
        let exe = fs::read_link(&exe_path)
            .map_err(|e| SnitchError::from_io("process", pid.to_string(), exe_path, e))?
            .to_string_lossy()
            .into_owned();

        let cmdline_path = self.pid_path(pid, "cmdline");
        let raw = fs::read(&cmdline_path)
            .map_err(|e| SnitchError::from_io("process", pid.to_string(), cmdline_path, e))?;

        tracing::trace!(pid, name = %name, exe = %exe, "process resolved");
        Ok(ProcessInfo {
            pid,
            name,
            exe,
            cmdline: join_cmdline(&raw),
        })
    }
}

/// Joins a NUL-separated `cmdline` buffer into one space-separated string.
#[must_use]
pub fn join_cmdline(raw: &[u8]) -> String {
    raw.split(|&b| b == 0)
        .filter(|arg| !arg.is_empty())
        .map(String::from_utf8_lossy)
        .collect::<Vec<_>>()
        .join(" ")
}
