//! Hardware seam for the signal loop.
//!
//! This crate provides:
//! - [`SerialOutput`] and [`StrobePin`] traits, the contracts the loop
//!   depends on
//! - [`spidev`] module with the Linux SPI character-device transport
//! - [`sysfs_gpio`] module with the sysfs GPIO strobe pin
//! - simulated implementations for testing without hardware

pub mod spidev;
pub mod sysfs_gpio;

pub use spidev::*;
pub use sysfs_gpio::*;

use shiftled_common::SignalResult;

/// Byte-serial output transport.
///
/// The transport carries raw bytes with no framing. `write` must be
/// bounded: a conforming implementation never blocks indefinitely, so a
/// stuck device cannot starve the loop's cancellation check.
pub trait SerialOutput: Send {
    /// Transmit `bytes`, returning the number of bytes written.
    fn write(&mut self, bytes: &[u8]) -> SignalResult<usize>;

    /// Release the transport. Idempotent; failures are reported so the
    /// caller can log them, never escalate them.
    fn release(&mut self) -> SignalResult<()> {
        Ok(())
    }
}

/// Digital output pin used to strobe data into the storage register.
pub trait StrobePin: Send {
    /// Drive the pin high (`true`) or low (`false`).
    fn set(&mut self, high: bool) -> SignalResult<()>;

    /// Form one clock pulse: rising then falling edge.
    ///
    /// If the rising edge fails the falling edge is not attempted, so a
    /// half-formed pulse is never driven.
    fn pulse(&mut self) -> SignalResult<()> {
        self.set(true)?;
        self.set(false)
    }

    /// Release the pin. Idempotent; failures are reported, never escalated.
    fn release(&mut self) -> SignalResult<()> {
        Ok(())
    }
}

/// Simulated serial transport for testing.
///
/// Records every frame written and can be primed to fail a number of
/// writes for transient-error tests.
#[derive(Debug, Default)]
pub struct SimulatedPort {
    frames: Vec<Vec<u8>>,
    fail_writes: u32,
    released: bool,
}

impl SimulatedPort {
    /// Create a new simulated transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` writes with a transient error.
    pub fn fail_next_writes(&mut self, count: u32) {
        self.fail_writes = count;
    }

    /// Frames written so far, in write order.
    #[must_use]
    pub fn frames(&self) -> &[Vec<u8>] {
        &self.frames
    }

    /// Whether `release` has been called.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl SerialOutput for SimulatedPort {
    fn write(&mut self, bytes: &[u8]) -> SignalResult<usize> {
        if self.fail_writes > 0 {
            self.fail_writes -= 1;
            return Err(shiftled_common::SignalError::Write(
                "simulated transport failure".into(),
            ));
        }
        self.frames.push(bytes.to_vec());
        Ok(bytes.len())
    }

    fn release(&mut self) -> SignalResult<()> {
        self.released = true;
        Ok(())
    }
}

/// Simulated strobe pin for testing.
///
/// Records every level transition so tests can assert pulse shape and
/// ordering relative to serial writes.
#[derive(Debug, Default)]
pub struct SimulatedPin {
    edges: Vec<bool>,
    fail_sets: u32,
    released: bool,
}

impl SimulatedPin {
    /// Create a new simulated pin.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` level writes.
    pub fn fail_next_sets(&mut self, count: u32) {
        self.fail_sets = count;
    }

    /// Recorded level transitions, in order.
    #[must_use]
    pub fn edges(&self) -> &[bool] {
        &self.edges
    }

    /// Whether `release` has been called.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl StrobePin for SimulatedPin {
    fn set(&mut self, high: bool) -> SignalResult<()> {
        if self.fail_sets > 0 {
            self.fail_sets -= 1;
            return Err(shiftled_common::SignalError::Write(
                "simulated pin failure".into(),
            ));
        }
        self.edges.push(high);
        Ok(())
    }

    fn release(&mut self) -> SignalResult<()> {
        self.released = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulated_port_records_frames() {
        let mut port = SimulatedPort::new();
        port.write(&[0x12, 0x34]).unwrap();
        port.write(&[0xFF]).unwrap();

        assert_eq!(port.frames(), &[vec![0x12, 0x34], vec![0xFF]]);

        port.release().unwrap();
        assert!(port.is_released());
    }

    #[test]
    fn test_simulated_port_transient_failure() {
        let mut port = SimulatedPort::new();
        port.fail_next_writes(1);

        assert!(port.write(&[0x00]).is_err());
        assert!(port.write(&[0x01]).is_ok());
        assert_eq!(port.frames().len(), 1);
    }

    #[test]
    fn test_simulated_pin_pulse_shape() {
        let mut pin = SimulatedPin::new();
        pin.pulse().unwrap();
        assert_eq!(pin.edges(), &[true, false]);
    }

    #[test]
    fn test_pulse_skips_falling_edge_on_failed_rise() {
        let mut pin = SimulatedPin::new();
        pin.fail_next_sets(1);

        assert!(pin.pulse().is_err());
        // The falling edge must not have been driven
        assert!(pin.edges().is_empty());
    }
}
