//! Live connection table access.
//!
//! The monitor samples the table once per tick and diffs consecutive
//! samples, so implementations must be cheap enough for sub-second
//! polling.

pub mod procfs;

use std::collections::HashSet;

use snitch_common::error::Result;
use snitch_common::types::Connection;

/// Source of the host's current socket table.
///
/// Implementors return every live TCP and UDP socket of both address
/// families together with its owning process id when known.
pub trait ConnectionTable: Send {
    /// Returns the full set of live connections.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be read at all. Partial
    /// failures (one unreadable process directory) are not errors.
    fn snapshot(&mut self) -> Result<HashSet<Connection>>;
}

/// Creates the connection table for the current platform.
#[must_use]
pub fn detect_table() -> Box<dyn ConnectionTable> {
    #[cfg(target_os = "linux")]
    {
        Box::new(procfs::ProcNetTable::new())
    }
    #[cfg(not(target_os = "linux"))]
    {
        Box::new(UnsupportedTable)
    }
}

/// Connection table for platforms without procfs.
#[cfg(not(target_os = "linux"))]
#[derive(Debug, Default)]
pub struct UnsupportedTable;

#[cfg(not(target_os = "linux"))]
impl ConnectionTable for UnsupportedTable {
    fn snapshot(&mut self) -> Result<HashSet<Connection>> {
        Err(snitch_common::error::SnitchError::Config {
            message: "Linux required for connection table access".into(),
        })
    }
}
