//! Effective privilege checks.
//!
//! Sockets of other users can only be attributed, and raw packets only
//! captured, when running as root.

/// Returns whether the current process runs with an effective uid of 0.
#[cfg(target_os = "linux")]
#[must_use]
pub fn is_root() -> bool {
    nix::unistd::geteuid().is_root()
}

/// Stub for non-Linux platforms.
#[cfg(not(target_os = "linux"))]
#[must_use]
pub const fn is_root() -> bool {
    false
}

/// Logs a warning when running unprivileged.
pub fn warn_if_unprivileged(use_capture: bool) {
    if is_root() {
        return;
    }
    tracing::warn!("not running as root: connections of other users cannot be attributed");
    if use_capture {
        tracing::warn!("not running as root: packet capture will likely fail to start");
    }
}
