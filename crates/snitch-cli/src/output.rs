//! Formatted output helpers for CLI commands.
//!
//! Provides the table layout used by `show` and the tail selection used
//! by `errors`.

use snitch_engine::state::ProcessEntry;

/// Header line of the `show` table.
#[must_use]
pub fn entry_header() -> String {
    format!(
        "{:<40} {:<24} {:>5} {:<26} {:<26} {:>5}",
        "EXECUTABLE", "NAME", "DAYS", "FIRST SEEN", "LAST SEEN", "PEERS"
    )
}

/// One `show` table row for the entry of `executable`.
#[must_use]
pub fn entry_row(executable: &str, entry: &ProcessEntry) -> String {
    format!(
        "{:<40} {:<24} {:>5} {:<26} {:<26} {:>5}",
        executable,
        entry.name,
        entry.days_seen,
        entry.first_seen,
        entry.last_seen,
        entry.remote_addresses.len()
    )
}

/// Returns the last `n` items, or all of them when `n` is `None`.
#[must_use]
pub fn tail<T>(items: &[T], n: Option<usize>) -> &[T] {
    match n {
        Some(n) => &items[items.len().saturating_sub(n)..],
        None => items,
    }
}
