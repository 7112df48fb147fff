//! Cancellation semantics: the in-flight tick always completes, and no
//! further tick begins.

use super::common::{CancellingPort, SteppedClock};
use shiftled_common::{LoopState, RunConfig};
use shiftled_hal::SimulatedPin;
use shiftled_runtime::SignalLoop;
use std::time::Duration;

fn unbounded_config() -> RunConfig {
    RunConfig {
        interval: Duration::from_millis(1),
        max_ticks: 0,
        ..Default::default()
    }
}

/// Cancelling during tick N's serial write: tick N still strobes and is
/// counted, and tick N+1 never starts.
#[test]
fn test_cancel_mid_tick_completes_the_tick() {
    let config = unbounded_config();
    let (port, slot) = CancellingPort::new(2);

    let mut sloop = SignalLoop::new(
        SteppedClock::new(0.0, 0.1),
        port,
        Some(SimulatedPin::new()),
        &config,
    );
    slot.set(sloop.cancel_token()).unwrap();

    let summary = sloop.run().unwrap();

    // Ticks 0, 1, 2 ran; the cancellation fired inside tick 2's write
    assert_eq!(summary.ticks, 3);
    assert_eq!(sloop.port().inner.frames(), &[vec![0], vec![1], vec![2]]);
    // Tick 2's strobe pulse still happened after its write
    assert_eq!(
        sloop.strobe().unwrap().edges(),
        &[true, false, true, false, true, false]
    );
    assert_eq!(sloop.state(), LoopState::Stopped);
    assert!(sloop.port().inner.is_released());
}

/// Cancellation from another thread stops an otherwise unbounded run and
/// the loop still releases its resources.
#[test]
fn test_cancel_from_another_thread() {
    let config = RunConfig {
        interval: Duration::from_millis(5),
        max_ticks: 0,
        ..Default::default()
    };
    let mut sloop = SignalLoop::new(
        SteppedClock::new(0.0, 0.005),
        shiftled_hal::SimulatedPort::new(),
        None::<SimulatedPin>,
        &config,
    );

    let token = sloop.cancel_token();
    let canceller = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(30));
        token.cancel();
    });

    let summary = sloop.run().unwrap();
    canceller.join().unwrap();

    // At least one tick ran before the request landed, none after
    assert!(summary.ticks >= 1);
    assert_eq!(sloop.port().frames().len() as u64, summary.ticks);
    assert_eq!(sloop.state(), LoopState::Stopped);
    assert!(sloop.port().is_released());
}

/// A token tripped before the run starts yields a zero-tick run that still
/// walks the full lifecycle.
#[test]
fn test_cancel_before_start() {
    let config = unbounded_config();
    let mut sloop = SignalLoop::new(
        SteppedClock::new(0.0, 0.1),
        shiftled_hal::SimulatedPort::new(),
        Some(SimulatedPin::new()),
        &config,
    );

    sloop.cancel_token().cancel();
    let summary = sloop.run().unwrap();

    assert_eq!(summary.ticks, 0);
    assert!(summary.jitter.is_none());
    assert!(sloop.port().frames().is_empty());
    assert_eq!(sloop.state(), LoopState::Stopped);
}
