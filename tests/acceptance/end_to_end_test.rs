//! Deterministic end-to-end runs against simulated hardware.

use super::common::SteppedClock;
use shiftled_common::{
    LoopState, PatternConfig, PatternMode, Polarity, RegisterWidth, RunConfig,
};
use shiftled_hal::{SimulatedPin, SimulatedPort};
use shiftled_runtime::SignalLoop;
use std::time::Duration;

fn counter_config(max_ticks: u64) -> RunConfig {
    RunConfig {
        interval: Duration::from_millis(1),
        max_ticks,
        ..Default::default()
    }
}

/// Five ticks of counter mode against a clock advancing exactly 0.1s per
/// tick: frames 0..=4 in order, min == max == mean == 0.1.
#[test]
fn test_five_tick_counter_run() {
    let config = counter_config(5);
    let mut sloop = SignalLoop::new(
        SteppedClock::new(43_200.0, 0.1),
        SimulatedPort::new(),
        Some(SimulatedPin::new()),
        &config,
    );

    let summary = sloop.run().unwrap();

    assert_eq!(summary.ticks, 5);
    assert_eq!(summary.write_failures, 0);
    assert_eq!(
        sloop.port().frames(),
        &[vec![0], vec![1], vec![2], vec![3], vec![4]]
    );

    let jitter = summary.jitter.unwrap();
    assert!((jitter.min - 0.1).abs() < 1e-9);
    assert!((jitter.max - 0.1).abs() < 1e-9);
    assert!((jitter.mean - 0.1).abs() < 1e-9);
    assert!(jitter.range() < 1e-9);
}

/// A run crossing local midnight measures the same intervals as any other.
#[test]
fn test_run_across_midnight() {
    let config = counter_config(6);
    // Starts 0.25s before midnight with 0.1s steps, so the rollover lands
    // mid-run.
    let mut sloop = SignalLoop::new(
        SteppedClock::new(86_399.75, 0.1),
        SimulatedPort::new(),
        None::<SimulatedPin>,
        &config,
    );

    let summary = sloop.run().unwrap();
    let jitter = summary.jitter.unwrap();

    assert!((jitter.min - 0.1).abs() < 1e-9, "min = {}", jitter.min);
    assert!((jitter.max - 0.1).abs() < 1e-9, "max = {}", jitter.max);
}

/// Every frame write is followed by exactly one strobe pulse, and the
/// resources are released when the loop stops.
#[test]
fn test_strobe_and_release_ordering() {
    let config = counter_config(4);
    let mut sloop = SignalLoop::new(
        SteppedClock::new(0.0, 0.05),
        SimulatedPort::new(),
        Some(SimulatedPin::new()),
        &config,
    );

    sloop.run().unwrap();

    assert_eq!(sloop.port().frames().len(), 4);
    let pin = sloop.strobe().unwrap();
    assert_eq!(pin.edges().len(), 8);
    assert!(pin
        .edges()
        .chunks(2)
        .all(|pulse| pulse == [true, false]));

    assert!(sloop.port().is_released());
    assert!(pin.is_released());
    assert_eq!(sloop.state(), LoopState::Stopped);
}

/// Inverted double-register walking-bit output reaches the wire
/// complemented and big-endian.
#[test]
fn test_inverted_walking_bit_on_the_wire() {
    let config = RunConfig {
        interval: Duration::from_millis(1),
        max_ticks: 2,
        pattern: PatternConfig {
            mode: PatternMode::WalkingBit,
            width: RegisterWidth::Double,
            polarity: Polarity::Inverted,
        },
        ..Default::default()
    };
    let mut sloop = SignalLoop::new(
        SteppedClock::new(0.0, 0.05),
        SimulatedPort::new(),
        None::<SimulatedPin>,
        &config,
    );

    sloop.run().unwrap();

    assert_eq!(
        sloop.port().frames(),
        &[vec![0x7F, 0xFF], vec![0xBF, 0xFF]]
    );
}

/// Transient write failures are counted but never break the cadence.
#[test]
fn test_cadence_survives_transient_failures() {
    let config = counter_config(6);
    let mut port = SimulatedPort::new();
    port.fail_next_writes(3);

    let mut sloop = SignalLoop::new(
        SteppedClock::new(100.0, 0.05),
        port,
        Some(SimulatedPin::new()),
        &config,
    );

    let summary = sloop.run().unwrap();

    assert_eq!(summary.ticks, 6);
    assert_eq!(summary.write_failures, 3);
    // Ticks 3..=5 made it to the wire
    assert_eq!(sloop.port().frames(), &[vec![3], vec![4], vec![5]]);
    // The strobe kept firing every tick regardless
    assert_eq!(sloop.strobe().unwrap().edges().len(), 12);
}
