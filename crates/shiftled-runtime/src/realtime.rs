//! Real-time scheduling and memory locking.
//!
//! Optional setup for deterministic pacing:
//! - Memory locking (mlockall) to prevent page faults in the loop
//! - Real-time scheduling (SCHED_FIFO/SCHED_RR) for priority execution
//!
//! Missing privileges degrade to a warning rather than a failure, so the
//! loop still runs (with best-effort timing) on an unprivileged host.

#![allow(unused_imports)] // Platform-specific code may not use all imports

use shiftled_common::config::{RealtimeConfig, SchedPolicy};
use shiftled_common::error::{SignalError, SignalResult};
use tracing::{debug, info, warn};

/// Result of real-time initialization.
#[derive(Debug, Clone)]
pub struct RealtimeStatus {
    /// Whether memory was locked successfully.
    pub memory_locked: bool,
    /// Applied scheduler policy.
    pub scheduler_policy: Option<SchedPolicy>,
    /// Applied scheduler priority.
    pub scheduler_priority: Option<u8>,
}

/// Initialize the real-time environment based on configuration.
///
/// # Errors
///
/// Returns an error for hard failures only; EPERM (missing privileges)
/// logs a warning and continues without the requested feature.
pub fn init_realtime(config: &RealtimeConfig) -> SignalResult<RealtimeStatus> {
    if !config.enabled {
        debug!("real-time scheduling disabled in configuration");
        return Ok(RealtimeStatus {
            memory_locked: false,
            scheduler_policy: None,
            scheduler_priority: None,
        });
    }

    info!("initializing real-time environment");

    let memory_locked = if config.lock_memory {
        lock_memory()?
    } else {
        false
    };

    let (scheduler_policy, scheduler_priority) = set_scheduler(config.policy, config.priority)?;

    let status = RealtimeStatus {
        memory_locked,
        scheduler_policy,
        scheduler_priority,
    };
    info!(?status, "real-time initialization complete");
    Ok(status)
}

/// Lock all current and future memory pages.
#[cfg(target_os = "linux")]
fn lock_memory() -> SignalResult<bool> {
    use nix::sys::mman::{mlockall, MlockAllFlags};

    debug!("locking memory pages with mlockall");

    match mlockall(MlockAllFlags::MCL_CURRENT | MlockAllFlags::MCL_FUTURE) {
        Ok(()) => {
            info!("memory locked");
            Ok(true)
        }
        Err(e) => {
            // EPERM is common without root or CAP_IPC_LOCK
            if e == nix::errno::Errno::EPERM {
                warn!("mlockall failed with EPERM; page faults may occur during execution");
                Ok(false)
            } else {
                Err(SignalError::Config(format!("mlockall failed: {e}")))
            }
        }
    }
}

#[cfg(not(target_os = "linux"))]
fn lock_memory() -> SignalResult<bool> {
    warn!("mlockall not available on this platform");
    Ok(false)
}

/// Set real-time scheduler policy and priority.
#[cfg(target_os = "linux")]
fn set_scheduler(
    policy: SchedPolicy,
    priority: u8,
) -> SignalResult<(Option<SchedPolicy>, Option<u8>)> {
    let linux_policy = match policy {
        SchedPolicy::Fifo => libc::SCHED_FIFO,
        SchedPolicy::Rr => libc::SCHED_RR,
        SchedPolicy::Other => {
            debug!("using SCHED_OTHER (non-RT) scheduling");
            return Ok((Some(SchedPolicy::Other), None));
        }
    };

    // RT policies accept priorities 1-99
    let clamped_priority = priority.clamp(1, 99);
    if clamped_priority != priority {
        warn!(
            original = priority,
            clamped = clamped_priority,
            "scheduler priority clamped to valid range"
        );
    }

    let param = libc::sched_param {
        sched_priority: i32::from(clamped_priority),
    };

    // SAFETY: sched_setscheduler is safe with valid parameters
    let result = unsafe { libc::sched_setscheduler(0, linux_policy, &param) };

    if result == -1 {
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::EPERM) {
            warn!("sched_setscheduler failed with EPERM; running without RT priority");
            return Ok((None, None));
        }
        return Err(SignalError::Config(format!(
            "sched_setscheduler failed: {err}"
        )));
    }

    info!(?policy, priority = clamped_priority, "real-time scheduler configured");
    Ok((Some(policy), Some(clamped_priority)))
}

#[cfg(not(target_os = "linux"))]
fn set_scheduler(
    policy: SchedPolicy,
    priority: u8,
) -> SignalResult<(Option<SchedPolicy>, Option<u8>)> {
    warn!(?policy, priority, "real-time scheduling not available on this platform");
    Ok((None, None))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_rt() {
        let config = RealtimeConfig {
            enabled: false,
            ..Default::default()
        };

        let status = init_realtime(&config).unwrap();
        assert!(!status.memory_locked);
        assert!(status.scheduler_policy.is_none());
        assert!(status.scheduler_priority.is_none());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_sched_other_is_a_no_op() {
        let (policy, priority) = set_scheduler(SchedPolicy::Other, 50).unwrap();
        assert_eq!(policy, Some(SchedPolicy::Other));
        assert!(priority.is_none());
    }
}
