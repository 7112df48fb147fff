//! Sysfs GPIO strobe pin.
//!
//! Drives a single output line through `/sys/class/gpio`: export,
//! direction `out`, level writes, and the safe teardown sequence
//! (direction back to `in`, then unexport). Export and unexport are
//! idempotent so a pin left over from a crashed run is reusable.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use shiftled_common::{SignalError, SignalResult};
use tracing::{debug, warn};

use crate::StrobePin;

/// GPIO output pin backed by the sysfs interface.
#[derive(Debug)]
pub struct SysfsPin {
    gpio: u32,
    base: PathBuf,
    value_path: PathBuf,
    exported: bool,
}

impl SysfsPin {
    /// Acquire the pin under the standard sysfs base path.
    pub fn acquire(gpio: u32) -> SignalResult<Self> {
        Self::acquire_at(Path::new("/sys/class/gpio"), gpio)
    }

    /// Acquire the pin under an explicit base path.
    ///
    /// Exports the line (tolerating an already-exported pin), sets the
    /// direction to `out`, and drives the initial level low so the first
    /// strobe is a clean rising edge.
    pub fn acquire_at(base: &Path, gpio: u32) -> SignalResult<Self> {
        let pin_dir = base.join(format!("gpio{gpio}"));

        if let Err(e) = write_attr(&base.join("export"), &gpio.to_string()) {
            // EBUSY means the line is already exported, which is fine
            if e.raw_os_error() != Some(busy_errno()) && !pin_dir.is_dir() {
                return Err(SignalError::Acquisition {
                    resource: format!("GPIO {gpio}"),
                    reason: format!("export failed: {e}"),
                });
            }
        }

        let pin = Self {
            gpio,
            base: base.to_path_buf(),
            value_path: pin_dir.join("value"),
            exported: true,
        };

        write_attr(&pin_dir.join("direction"), "out").map_err(|e| SignalError::Acquisition {
            resource: format!("GPIO {gpio}"),
            reason: format!("setting direction failed: {e}"),
        })?;

        write_attr(&pin.value_path, "0").map_err(|e| SignalError::Acquisition {
            resource: format!("GPIO {gpio}"),
            reason: format!("driving initial level failed: {e}"),
        })?;

        debug!(gpio, "GPIO pin acquired");
        Ok(pin)
    }

    /// GPIO number this pin drives.
    #[must_use]
    pub fn gpio(&self) -> u32 {
        self.gpio
    }
}

impl StrobePin for SysfsPin {
    fn set(&mut self, high: bool) -> SignalResult<()> {
        write_attr(&self.value_path, if high { "1" } else { "0" })
            .map_err(|e| SignalError::Write(format!("GPIO {}: {e}", self.gpio)))
    }

    fn release(&mut self) -> SignalResult<()> {
        if !self.exported {
            return Ok(());
        }
        self.exported = false;

        // Return the line to input before unexporting, the safer idle mode
        let pin_dir = self.base.join(format!("gpio{}", self.gpio));
        if let Err(e) = write_attr(&pin_dir.join("direction"), "in") {
            warn!(gpio = self.gpio, error = %e, "failed to restore GPIO direction");
        }
        if let Err(e) = write_attr(&self.base.join("unexport"), &self.gpio.to_string()) {
            warn!(gpio = self.gpio, error = %e, "failed to unexport GPIO");
        }

        debug!(gpio = self.gpio, "GPIO pin released");
        Ok(())
    }
}

impl Drop for SysfsPin {
    fn drop(&mut self) {
        let _ = self.release();
    }
}

fn write_attr(path: &Path, contents: &str) -> std::io::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    file.write_all(contents.as_bytes())
}

#[cfg(target_os = "linux")]
fn busy_errno() -> i32 {
    libc::EBUSY
}

#[cfg(not(target_os = "linux"))]
fn busy_errno() -> i32 {
    16 // EBUSY
}
