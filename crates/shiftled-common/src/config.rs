//! Run configuration for the signal loop.
//!
//! Supports TOML deserialization with sensible defaults for development
//! and explicit values for deployment. All values are immutable for the
//! lifetime of a run.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{SignalError, SignalResult};

/// Bit-pattern generation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PatternMode {
    /// Output the tick counter itself.
    #[default]
    Counter,
    /// A single set bit sweeping the register back and forth.
    #[serde(rename = "walking")]
    WalkingBit,
}

impl fmt::Display for PatternMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Counter => write!(f, "counter"),
            Self::WalkingBit => write!(f, "walking"),
        }
    }
}

impl FromStr for PatternMode {
    type Err = SignalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "counter" => Ok(Self::Counter),
            "walking" => Ok(Self::WalkingBit),
            other => Err(SignalError::Config(format!(
                "unknown pattern mode '{other}' (expected 'counter' or 'walking')"
            ))),
        }
    }
}

/// Number of daisy-chained shift registers driven per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RegisterWidth {
    /// One register, one output byte.
    #[default]
    Single,
    /// Two registers, two output bytes (big-endian).
    Double,
}

impl RegisterWidth {
    /// Number of bytes shifted out per tick.
    #[must_use]
    pub fn byte_count(&self) -> usize {
        match self {
            Self::Single => 1,
            Self::Double => 2,
        }
    }

    /// Map a register count (1 or 2) to a width.
    pub fn from_count(count: u8) -> SignalResult<Self> {
        match count {
            1 => Ok(Self::Single),
            2 => Ok(Self::Double),
            other => Err(SignalError::Config(format!(
                "unsupported register count {other} (expected 1 or 2)"
            ))),
        }
    }
}

impl fmt::Display for RegisterWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.byte_count())
    }
}

/// Output polarity applied after pattern generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    /// Bytes emitted as generated.
    #[default]
    Normal,
    /// Every byte bitwise-complemented (active-low hardware).
    Inverted,
}

impl Polarity {
    /// Map the `--invert` flag to a polarity.
    #[must_use]
    pub fn from_invert(invert: bool) -> Self {
        if invert {
            Self::Inverted
        } else {
            Self::Normal
        }
    }
}

/// Top-level run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Tick interval of the periodic loop.
    #[serde(with = "humantime_serde")]
    pub interval: Duration,

    /// Maximum ticks to run (0 = until cancelled).
    pub max_ticks: u64,

    /// Emit a per-tick statistics line to stdout.
    pub stats: bool,

    /// Serial transport configuration.
    pub spi: SpiConfig,

    /// Storage-register strobe pin configuration.
    pub strobe: StrobeConfig,

    /// Pattern generation configuration.
    pub pattern: PatternConfig,

    /// Real-time scheduling configuration.
    pub realtime: RealtimeConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(100),
            max_ticks: 0,
            stats: false,
            spi: SpiConfig::default(),
            strobe: StrobeConfig::default(),
            pattern: PatternConfig::default(),
            realtime: RealtimeConfig::default(),
        }
    }
}

/// SPI transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpiConfig {
    /// Device node, e.g. `/dev/spidev1.0`.
    pub device: PathBuf,

    /// Maximum clock speed in Hz.
    pub speed_hz: u32,
}

impl Default for SpiConfig {
    fn default() -> Self {
        Self {
            device: PathBuf::from("/dev/spidev1.0"),
            speed_hz: 2_400_000,
        }
    }
}

/// Strobe pin configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StrobeConfig {
    /// GPIO number wired to the register clock input, `None` to not strobe.
    pub gpio: Option<u32>,
}

impl StrobeConfig {
    /// GPIO wired to the register clock on the reference board.
    pub const DEFAULT_GPIO: u32 = 18;
}

impl Default for StrobeConfig {
    fn default() -> Self {
        Self {
            gpio: Some(Self::DEFAULT_GPIO),
        }
    }
}

/// Pattern generation configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PatternConfig {
    /// Generation mode.
    pub mode: PatternMode,
    /// Register chain width.
    pub width: RegisterWidth,
    /// Output polarity.
    pub polarity: Polarity,
}

/// Real-time scheduling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeConfig {
    /// Enable real-time scheduling (requires privileges).
    pub enabled: bool,

    /// Scheduler policy: "fifo" or "rr" (round-robin).
    pub policy: SchedPolicy,

    /// Scheduler priority (1-99 for RT policies).
    pub priority: u8,

    /// Lock all memory pages (mlockall).
    pub lock_memory: bool,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            policy: SchedPolicy::Fifo,
            priority: 90,
            lock_memory: true,
        }
    }
}

/// Scheduler policy for the loop thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SchedPolicy {
    /// SCHED_FIFO: First-in-first-out real-time.
    #[default]
    Fifo,
    /// SCHED_RR: Round-robin real-time.
    Rr,
    /// SCHED_OTHER: Normal time-sharing (non-RT).
    Other,
}

impl RunConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::Parse)
    }

    /// Serialize configuration to TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validate values the type system cannot enforce.
    pub fn validate(&self) -> SignalResult<()> {
        if self.interval.is_zero() {
            return Err(SignalError::Config(
                "interval must be greater than zero".into(),
            ));
        }
        if self.spi.speed_hz == 0 {
            return Err(SignalError::Config(
                "SPI speed must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File I/O error.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing error.
    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("failed to serialize TOML: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Serde helper module for `Duration` using humantime format.
mod humantime_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = humantime::format_duration(*duration).to_string();
        serializer.serialize_str(&s)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
