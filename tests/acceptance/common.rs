//! Shared helpers for acceptance tests.

use shiftled_common::{DaytimeClock, SignalResult, DAY_SECONDS};
use shiftled_hal::{SerialOutput, SimulatedPort};
use shiftled_runtime::CancelToken;
use std::sync::Arc;
use std::sync::OnceLock;

/// Clock advancing by a fixed step per sample, wrapping at midnight.
pub struct SteppedClock {
    next: f64,
    step: f64,
}

impl SteppedClock {
    pub fn new(start: f64, step: f64) -> Self {
        Self { next: start, step }
    }
}

impl DaytimeClock for SteppedClock {
    fn sample(&mut self) -> f64 {
        let s = self.next;
        self.next = (self.next + self.step) % DAY_SECONDS;
        s
    }
}

/// Transport that requests cancellation from inside a tick.
///
/// The token is filled in after the loop is constructed (the loop owns
/// token creation), so the slot starts empty.
pub struct CancellingPort {
    pub inner: SimulatedPort,
    pub token: Arc<OnceLock<CancelToken>>,
    /// Cancel during the write of this frame (0-based).
    pub cancel_on_frame: usize,
}

impl CancellingPort {
    pub fn new(cancel_on_frame: usize) -> (Self, Arc<OnceLock<CancelToken>>) {
        let slot = Arc::new(OnceLock::new());
        (
            Self {
                inner: SimulatedPort::new(),
                token: Arc::clone(&slot),
                cancel_on_frame,
            },
            slot,
        )
    }
}

impl SerialOutput for CancellingPort {
    fn write(&mut self, bytes: &[u8]) -> SignalResult<usize> {
        if self.inner.frames().len() == self.cancel_on_frame {
            if let Some(token) = self.token.get() {
                token.cancel();
            }
        }
        self.inner.write(bytes)
    }

    fn release(&mut self) -> SignalResult<()> {
        self.inner.release()
    }
}
