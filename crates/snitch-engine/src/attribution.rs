//! Attribution of connections to executables.
//!
//! Each public connection is credited to the executable of its owning
//! process. The record only ever grows: names, command lines, and remote
//! addresses accumulate, and nothing is removed.

use snitch_common::constants::{ALTERNATIVE_NAME_MARKER, DIFFERENT_LOCATION_SUFFIX};
use snitch_common::types::ProcessInfo;

use crate::state::{ProcessEntry, SnitchState};
use crate::timestamp::same_day;

/// Outcome of attributing one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribution {
    /// First connection ever seen for this executable.
    Created,
    /// The executable already had an entry, which was updated.
    Updated,
}

/// Credits a connection to `remote_ip` made by `process` at `now`.
pub fn attribute(state: &mut SnitchState, process: &ProcessInfo, remote_ip: &str, now: &str) -> Attribution {
    match state.processes.get_mut(&process.exe) {
        Some(entry) => {
            update_entry(entry, process, remote_ip, now);
            Attribution::Updated
        }
        None => {
            create_entry(state, process, remote_ip, now);
            Attribution::Created
        }
    }
}

/// Records the first connection of an executable.
///
/// The executable and its name are appended to the audit trails. If the
/// same name was already recorded for another executable, the new `Names`
/// slot carries a suffix flagging the ambiguity.
pub fn create_entry(state: &mut SnitchState, process: &ProcessInfo, remote_ip: &str, now: &str) {
    state.executables.push(process.exe.clone());
    if state.names.contains(&process.name) {
        state.names.push(format!("{}{DIFFERENT_LOCATION_SUFFIX}", process.name));
    } else {
        state.names.push(process.name.clone());
    }
    let _ = state.processes.insert(
        process.exe.clone(),
        ProcessEntry {
            name: process.name.clone(),
            cmdlines: vec![process.cmdline.clone()],
            first_seen: now.to_owned(),
            last_seen: now.to_owned(),
            days_seen: 1,
            remote_addresses: vec![remote_ip.to_owned()],
        },
    );
    tracing::info!(exe = %process.exe, name = %process.name, remote = remote_ip, "first connection for executable");
}

/// Folds a further connection into an existing entry.
///
/// Re-applying the same observation only moves `last_seen`.
pub fn update_entry(entry: &mut ProcessEntry, process: &ProcessInfo, remote_ip: &str, now: &str) {
    if !entry.name.contains(process.name.as_str()) {
        entry.name.push_str(ALTERNATIVE_NAME_MARKER);
        entry.name.push_str(&process.name);
    }
    if !entry.cmdlines.contains(&process.cmdline) {
        entry.cmdlines.push(process.cmdline.clone());
    }
    if !entry.remote_addresses.iter().any(|a| a == remote_ip) {
        entry.remote_addresses.push(remote_ip.to_owned());
    }
    if !same_day(now, &entry.last_seen) {
        entry.days_seen += 1;
    }
    now.clone_into(&mut entry.last_seen);
    tracing::debug!(exe = %process.exe, remote = remote_ip, days_seen = entry.days_seen, "connection attributed");
}

#[cfg(test)]
mod tests {
    use super::*;

    const JAN_1: &str = "Mon Jan  1 00:00:00 2024";
    const JAN_1_LATER: &str = "Mon Jan  1 18:30:00 2024";
    const JAN_2: &str = "Tue Jan  2 00:00:00 2024";
    const JAN_3: &str = "Wed Jan  3 00:00:00 2024";

    fn process(exe: &str, name: &str, cmdline: &str) -> ProcessInfo {
        ProcessInfo {
            pid: 100,
            name: name.into(),
            exe: exe.into(),
            cmdline: cmdline.into(),
        }
    }

    #[test]
    fn first_connection_creates_entry() {
        let mut state = SnitchState::default();
        let curl = process("/usr/bin/curl", "curl", "curl example.com");
        assert_eq!(attribute(&mut state, &curl, "93.184.216.34", JAN_1), Attribution::Created);

        let entry = &state.processes["/usr/bin/curl"];
        assert_eq!(entry.days_seen, 1);
        assert_eq!(entry.first_seen, JAN_1);
        assert_eq!(entry.last_seen, JAN_1);
        assert_eq!(entry.cmdlines, vec!["curl example.com"]);
        assert_eq!(entry.remote_addresses, vec!["93.184.216.34"]);
        assert_eq!(state.executables, vec!["/usr/bin/curl"]);
        assert_eq!(state.names, vec!["curl"]);
    }

    #[test]
    fn update_does_not_touch_audit_trails() {
        let mut state = SnitchState::default();
        let curl = process("/usr/bin/curl", "curl", "curl a");
        let _ = attribute(&mut state, &curl, "8.8.8.8", JAN_1);
        assert_eq!(attribute(&mut state, &curl, "1.1.1.1", JAN_1), Attribution::Updated);
        assert_eq!(state.executables.len(), 1);
        assert_eq!(state.names.len(), 1);
    }

    #[test]
    fn repeated_update_is_idempotent_except_last_seen() {
        let mut state = SnitchState::default();
        let curl = process("/usr/bin/curl", "curl", "curl a");
        let _ = attribute(&mut state, &curl, "8.8.8.8", JAN_1);
        let _ = attribute(&mut state, &curl, "8.8.8.8", JAN_1_LATER);
        let before = state.processes["/usr/bin/curl"].clone();
        let _ = attribute(&mut state, &curl, "8.8.8.8", JAN_1_LATER);
        let after = &state.processes["/usr/bin/curl"];
        assert_eq!(&before, after);
        assert_eq!(after.remote_addresses, vec!["8.8.8.8"]);
        assert_eq!(after.cmdlines, vec!["curl a"]);
        assert_eq!(after.last_seen, JAN_1_LATER);
    }

    #[test]
    fn days_seen_counts_calendar_days_once() {
        let mut state = SnitchState::default();
        let curl = process("/usr/bin/curl", "curl", "curl");
        let _ = attribute(&mut state, &curl, "8.8.8.8", JAN_1);
        let _ = attribute(&mut state, &curl, "8.8.8.8", JAN_1_LATER);
        assert_eq!(state.processes["/usr/bin/curl"].days_seen, 1);
        let _ = attribute(&mut state, &curl, "8.8.8.8", JAN_2);
        let _ = attribute(&mut state, &curl, "8.8.8.8", JAN_2);
        assert_eq!(state.processes["/usr/bin/curl"].days_seen, 2);
        let _ = attribute(&mut state, &curl, "8.8.8.8", JAN_3);
        assert_eq!(state.processes["/usr/bin/curl"].days_seen, 3);
    }

    #[test]
    fn alternative_names_accumulate() {
        let mut state = SnitchState::default();
        let _ = attribute(&mut state, &process("/usr/bin/python3.12", "python3", ""), "8.8.8.8", JAN_1);
        let _ = attribute(&mut state, &process("/usr/bin/python3.12", "pip", ""), "8.8.8.8", JAN_1);
        let _ = attribute(&mut state, &process("/usr/bin/python3.12", "pip", ""), "8.8.8.8", JAN_1);
        let _ = attribute(&mut state, &process("/usr/bin/python3.12", "ansible", ""), "8.8.8.8", JAN_1);
        assert_eq!(
            state.processes["/usr/bin/python3.12"].name,
            "python3 alternative=pip alternative=ansible"
        );
    }

    #[test]
    fn name_contained_in_stored_name_is_not_added() {
        let mut state = SnitchState::default();
        let _ = attribute(&mut state, &process("/opt/x", "python3", ""), "8.8.8.8", JAN_1);
        let _ = attribute(&mut state, &process("/opt/x", "python", ""), "8.8.8.8", JAN_1);
        assert_eq!(state.processes["/opt/x"].name, "python3");
    }

    #[test]
    fn shared_name_across_executables_is_flagged() {
        let mut state = SnitchState::default();
        let _ = attribute(&mut state, &process("/usr/bin/x", "X", ""), "8.8.8.8", JAN_1);
        let _ = attribute(&mut state, &process("/opt/x/bin/x", "X", ""), "8.8.8.8", JAN_1);
        assert_eq!(state.names[0], "X");
        assert_eq!(state.names[1], "X (different executable location)");
        assert_eq!(state.processes["/opt/x/bin/x"].name, "X");
    }

    #[test]
    fn new_cmdlines_and_addresses_are_appended_in_order() {
        let mut state = SnitchState::default();
        let _ = attribute(&mut state, &process("/usr/bin/curl", "curl", "curl a"), "93.184.216.34", JAN_1);
        let _ = attribute(&mut state, &process("/usr/bin/curl", "curl", "curl b"), "8.8.8.8", JAN_2);
        let entry = &state.processes["/usr/bin/curl"];
        assert_eq!(entry.cmdlines, vec!["curl a", "curl b"]);
        assert_eq!(entry.remote_addresses, vec!["93.184.216.34", "8.8.8.8"]);
        assert_eq!(entry.first_seen, JAN_1);
        assert_eq!(entry.last_seen, JAN_2);
    }
}
