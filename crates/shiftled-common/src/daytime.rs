//! Day-time clock source.
//!
//! The timing domain measures intervals against a "seconds since local
//! midnight" clock that rolls over at 24h. Every interval computation must
//! go through [`wrap_delta`] so a measurement spanning midnight does not
//! come out 86400 seconds short.

/// Length of a day in seconds; the rollover period of a daytime sample.
pub const DAY_SECONDS: f64 = 86_400.0;

/// Source of day-time samples.
///
/// Implementations must be monotonically non-decreasing within a day and
/// reset to 0 at local midnight. Test clocks script their samples.
pub trait DaytimeClock {
    /// Take a sample: non-negative seconds since local midnight,
    /// always `<` [`DAY_SECONDS`].
    fn sample(&mut self) -> f64;
}

/// Wrap-safe interval between two daytime samples.
///
/// `a` is the later sample, `b` the earlier one. When `a < b` a midnight
/// rollover occurred and a day length is added back. The result is clamped
/// to `[0, DAY_SECONDS)`.
#[must_use]
pub fn wrap_delta(a: f64, b: f64) -> f64 {
    (a - b).rem_euclid(DAY_SECONDS)
}

/// System clock reporting local wall-clock time of day.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemDaytime;

impl SystemDaytime {
    /// Create a new system daytime clock.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl DaytimeClock for SystemDaytime {
    #[cfg(unix)]
    fn sample(&mut self) -> f64 {
        let mut ts = libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };
        // SAFETY: clock_gettime with a valid timespec pointer is safe
        let rc = unsafe { libc::clock_gettime(libc::CLOCK_REALTIME, &mut ts) };
        if rc != 0 {
            return 0.0;
        }

        let mut tm = unsafe { std::mem::zeroed::<libc::tm>() };
        // SAFETY: localtime_r only writes through the provided tm pointer
        let tm_ptr = unsafe { libc::localtime_r(&ts.tv_sec, &mut tm) };
        if tm_ptr.is_null() {
            return 0.0;
        }

        let secs = f64::from(tm.tm_hour) * 3600.0
            + f64::from(tm.tm_min) * 60.0
            + f64::from(tm.tm_sec);
        secs + ts.tv_nsec as f64 * 1e-9
    }

    #[cfg(not(unix))]
    fn sample(&mut self) -> f64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        // No timezone database here; UTC midnight stands in for local.
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        now.as_secs_f64() % DAY_SECONDS
    }
}

/// Render a daytime sample as `HH:MM:SS.mmm` for startup logging.
#[must_use]
pub fn format_daytime(sample: f64) -> String {
    let total = sample.max(0.0);
    let hours = (total / 3600.0) as u32;
    let minutes = ((total / 60.0) as u32) % 60;
    let seconds = total % 60.0;
    format!("{hours:02}:{minutes:02}:{seconds:06.3}")
}
