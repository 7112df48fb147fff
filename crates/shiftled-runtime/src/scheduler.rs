//! Fixed-interval signal loop.
//!
//! The loop drives the shift-register chain on a strict cadence:
//! 1. Sample the day-time clock and update jitter statistics
//! 2. Generate the output frame for the current tick
//! 3. Shift the frame out over the serial transport
//! 4. Strobe the storage-register clock pin (after the write, never before)
//! 5. Optionally emit a statistics line
//! 6. Wait for the next absolute deadline
//!
//! Uses `clock_nanosleep` on Linux for jitter-free pacing. Cancellation is
//! observed only between ticks, so the in-flight tick always completes.

use std::time::{Duration, Instant};

use shiftled_common::error::SignalResult;
use shiftled_common::jitter::{JitterSnapshot, JitterTracker};
use shiftled_common::report::stats_line;
use shiftled_common::state::{LoopState, StateMachine};
use shiftled_common::{DaytimeClock, PatternConfig, RunConfig};
use shiftled_hal::{SerialOutput, StrobePin};
use tracing::{debug, info, trace, warn};

use crate::cancel::CancelToken;
use crate::pattern;

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Total ticks executed.
    pub ticks: u64,
    /// Hardware writes that failed transiently during the run.
    pub write_failures: u64,
    /// Interval statistics, present once at least two ticks ran.
    pub jitter: Option<JitterSnapshot>,
}

/// Periodic signal loop over a clock, a serial transport, and an optional
/// strobe pin.
///
/// The loop exclusively owns all per-tick state; the only cross-context
/// input is the cancellation token.
pub struct SignalLoop<C: DaytimeClock, S: SerialOutput, P: StrobePin> {
    clock: C,
    port: S,
    strobe: Option<P>,
    state: StateMachine,
    interval: Duration,
    pattern: PatternConfig,
    emit_stats: bool,
    max_ticks: u64,
    /// Tick counter driving pattern generation. Increments once per
    /// completed tick and wraps per u32 arithmetic; the patterns use at
    /// most its low 16 bits, so wrap is harmless and deliberate.
    tick: u32,
    /// Non-wrapping tick total for the max-ticks bound and the summary.
    ticks_run: u64,
    jitter: JitterTracker,
    write_failures: u64,
    cancel: CancelToken,
}

impl<C: DaytimeClock, S: SerialOutput, P: StrobePin> SignalLoop<C, S, P> {
    /// Create a loop from acquired resources and a validated configuration.
    pub fn new(clock: C, port: S, strobe: Option<P>, config: &RunConfig) -> Self {
        Self {
            clock,
            port,
            strobe,
            state: StateMachine::new(),
            interval: config.interval,
            pattern: config.pattern,
            emit_stats: config.stats,
            max_ticks: config.max_ticks,
            tick: 0,
            ticks_run: 0,
            jitter: JitterTracker::new(),
            write_failures: 0,
            cancel: CancelToken::new(),
        }
    }

    /// Handle for requesting cancellation from another context.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LoopState {
        self.state.state()
    }

    /// Total ticks executed so far.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks_run
    }

    /// Transient write failures recorded so far.
    #[must_use]
    pub fn write_failures(&self) -> u64 {
        self.write_failures
    }

    /// The serial transport (tests inspect simulated frames through this).
    #[must_use]
    pub fn port(&self) -> &S {
        &self.port
    }

    /// The strobe pin, if one is configured.
    #[must_use]
    pub fn strobe(&self) -> Option<&P> {
        self.strobe.as_ref()
    }

    /// Run until cancelled or the configured tick bound is reached.
    ///
    /// Consumes no resources on failure paths: whatever was acquired is
    /// released before this returns, in reverse acquisition order.
    ///
    /// # Errors
    ///
    /// Returns an error only for lifecycle violations (e.g. a second
    /// `run` on a stopped loop). Per-tick hardware failures are counted,
    /// logged, and swallowed so the cadence continues.
    pub fn run(&mut self) -> SignalResult<RunSummary> {
        self.state.transition(LoopState::Running)?;
        info!(
            interval_ms = self.interval.as_millis(),
            mode = %self.pattern.mode,
            registers = %self.pattern.width,
            "signal loop started"
        );

        let mut deadline = Instant::now() + self.interval;

        loop {
            // The documented safe point: cancellation is observed here and
            // nowhere inside a tick, so tick N always completes before the
            // loop winds down and tick N+1 never starts.
            if self.cancel.is_cancelled() {
                info!(ticks = self.ticks_run, "cancellation observed");
                break;
            }

            self.run_tick();

            if self.max_ticks > 0 && self.ticks_run >= self.max_ticks {
                info!(ticks = self.ticks_run, "tick bound reached");
                break;
            }

            wait_until(deadline);
            deadline += self.interval;
        }

        self.shutdown()?;

        Ok(RunSummary {
            ticks: self.ticks_run,
            write_failures: self.write_failures,
            jitter: self.jitter.snapshot(),
        })
    }

    /// Execute one tick of the signal pipeline.
    fn run_tick(&mut self) {
        let sample = self.clock.sample();
        let delta = self.jitter.observe(sample);

        let frame = pattern::generate(
            self.tick,
            self.pattern.mode,
            self.pattern.width,
            self.pattern.polarity,
        );

        match self.port.write(frame.bytes()) {
            Ok(written) => trace!(tick = self.tick, written, "frame shifted out"),
            Err(e) => {
                self.write_failures += 1;
                warn!(tick = self.tick, error = %e, "serial write failed");
            }
        }

        // Latch only after the full frame is on the wire
        if let Some(pin) = self.strobe.as_mut() {
            if let Err(e) = pin.pulse() {
                self.write_failures += 1;
                warn!(tick = self.tick, error = %e, "strobe pulse failed");
            }
        }

        if self.emit_stats {
            if let (Some(dt), Some(snap)) = (delta, self.jitter.snapshot()) {
                println!("{}", stats_line(self.tick, sample, &snap, dt));
            }
        }

        self.tick = self.tick.wrapping_add(1);
        self.ticks_run += 1;
    }

    /// Wind down: release the serial transport first, then the strobe pin
    /// (reverse acquisition order). Release failures are logged, never
    /// escalated.
    fn shutdown(&mut self) -> SignalResult<()> {
        if self.state.state() == LoopState::Running {
            self.state.transition(LoopState::Stopping)?;
        }

        if let Err(e) = self.port.release() {
            warn!(error = %e, "serial transport release failed");
        }
        if let Some(pin) = self.strobe.as_mut() {
            if let Err(e) = pin.release() {
                warn!(error = %e, "strobe pin release failed");
            }
        }

        self.state.transition(LoopState::Stopped)?;
        debug!(state = %self.state.state(), "signal loop stopped");
        Ok(())
    }
}

/// Wait until the given deadline using high-precision sleep.
#[cfg(target_os = "linux")]
fn wait_until(deadline: Instant) {
    let now = Instant::now();
    if deadline <= now {
        return; // Already past deadline
    }

    let duration = deadline - now;
    let ts = libc::timespec {
        tv_sec: duration.as_secs() as libc::time_t,
        tv_nsec: duration.subsec_nanos() as libc::c_long,
    };

    // SAFETY: clock_nanosleep is safe with valid parameters
    unsafe {
        libc::clock_nanosleep(libc::CLOCK_MONOTONIC, 0, &ts, std::ptr::null_mut());
    }
}

#[cfg(not(target_os = "linux"))]
fn wait_until(deadline: Instant) {
    let now = Instant::now();
    if deadline > now {
        std::thread::sleep(deadline - now);
    }
}
