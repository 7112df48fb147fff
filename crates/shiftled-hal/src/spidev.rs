//! Linux SPI character-device transport.
//!
//! Opens `/dev/spidevB.C`, configures mode, word size, and clock speed via
//! ioctl, and shifts frames out with plain bounded writes. The 74HC595
//! chain needs nothing beyond mode 0, 8-bit words.

use shiftled_common::{SignalError, SignalResult, SpiConfig};

use crate::SerialOutput;

/// SPI transport backed by a spidev character device.
#[cfg(target_os = "linux")]
pub struct SpidevPort {
    file: std::fs::File,
    device: std::path::PathBuf,
}

#[cfg(target_os = "linux")]
impl SpidevPort {
    // _IOW('k', nr, size) request codes from linux/spi/spidev.h
    const SPI_IOC_WR_MODE: libc::c_ulong = 0x4001_6B01;
    const SPI_IOC_WR_BITS_PER_WORD: libc::c_ulong = 0x4001_6B03;
    const SPI_IOC_WR_MAX_SPEED_HZ: libc::c_ulong = 0x4004_6B04;

    /// Open and configure the device named in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::Acquisition`] if the device cannot be opened
    /// or any ioctl fails. Acquisition failures are fatal to the caller;
    /// the loop never starts on a half-configured transport.
    pub fn open(config: &SpiConfig) -> SignalResult<Self> {
        use std::os::unix::io::AsRawFd;

        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(&config.device)
            .map_err(|e| SignalError::Acquisition {
                resource: config.device.display().to_string(),
                reason: e.to_string(),
            })?;

        let fd = file.as_raw_fd();
        let port = Self {
            file,
            device: config.device.clone(),
        };

        let mode: u8 = 0;
        port.ioctl_write(fd, Self::SPI_IOC_WR_MODE, std::ptr::addr_of!(mode).cast())?;

        let bits: u8 = 8;
        port.ioctl_write(fd, Self::SPI_IOC_WR_BITS_PER_WORD, std::ptr::addr_of!(bits).cast())?;

        let speed: u32 = config.speed_hz;
        port.ioctl_write(fd, Self::SPI_IOC_WR_MAX_SPEED_HZ, std::ptr::addr_of!(speed).cast())?;

        tracing::info!(
            device = %port.device.display(),
            speed_hz = config.speed_hz,
            "SPI device configured"
        );

        Ok(port)
    }

    fn ioctl_write(
        &self,
        fd: libc::c_int,
        request: libc::c_ulong,
        arg: *const libc::c_void,
    ) -> SignalResult<()> {
        // SAFETY: fd is owned by self.file and arg points to a live value
        let rc = unsafe { libc::ioctl(fd, request, arg) };
        if rc < 0 {
            return Err(SignalError::Acquisition {
                resource: self.device.display().to_string(),
                reason: format!(
                    "ioctl 0x{request:08x} failed: {}",
                    std::io::Error::last_os_error()
                ),
            });
        }
        Ok(())
    }
}

#[cfg(target_os = "linux")]
impl SerialOutput for SpidevPort {
    fn write(&mut self, bytes: &[u8]) -> SignalResult<usize> {
        use std::io::Write;

        self.file
            .write(bytes)
            .map_err(|e| SignalError::Write(format!("{}: {e}", self.device.display())))
    }

    fn release(&mut self) -> SignalResult<()> {
        // The fd is closed on drop; nothing is buffered for a spidev node.
        tracing::debug!(device = %self.device.display(), "SPI device released");
        Ok(())
    }
}

/// Placeholder for non-Linux systems.
#[cfg(not(target_os = "linux"))]
pub struct SpidevPort {
    _private: (),
}

#[cfg(not(target_os = "linux"))]
impl SpidevPort {
    /// spidev is not available on this platform.
    pub fn open(config: &SpiConfig) -> SignalResult<Self> {
        Err(SignalError::Acquisition {
            resource: config.device.display().to_string(),
            reason: "spidev not available on this platform".into(),
        })
    }
}

#[cfg(not(target_os = "linux"))]
impl SerialOutput for SpidevPort {
    fn write(&mut self, _bytes: &[u8]) -> SignalResult<usize> {
        Err(SignalError::Write("spidev not available".into()))
    }
}
