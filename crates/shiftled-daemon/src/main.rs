//! shiftled daemon entry point.
//!
//! Wires the signal loop to real hardware: spidev transport, sysfs strobe
//! pin, Unix signals for cancellation, and optional real-time priority.

mod signals;

use anyhow::{Context, Result};
use clap::Parser;
use shiftled_common::config::{RegisterWidth, RunConfig};
use shiftled_common::daytime::{format_daytime, DaytimeClock, SystemDaytime};
use shiftled_common::report::final_report;
use shiftled_common::Polarity;
use shiftled_hal::{SpidevPort, SysfsPin};
use shiftled_runtime::realtime::init_realtime;
use shiftled_runtime::scheduler::SignalLoop;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::signals::SignalHandler;

/// Daemon command-line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "shiftled",
    about = "Drive a 74HC595 shift-register chain over SPI on a fixed cadence",
    version,
    long_about = None
)]
struct Args {
    /// Tick interval in milliseconds.
    #[arg(value_name = "INTERVAL-MS")]
    interval_ms: Option<u64>,

    /// Path to a configuration file (TOML).
    #[arg(long, short = 'c', value_name = "FILE")]
    config: Option<PathBuf>,

    /// SPI device name like '/dev/spidev0.0'.
    #[arg(long, short = 'd', value_name = "DEV")]
    spi_dev: Option<PathBuf>,

    /// SPI max speed in Hz.
    #[arg(long, short = 's', value_name = "HZ")]
    spi_speed: Option<u32>,

    /// GPIO wired to the register clock input (-1 to not strobe).
    #[arg(long, short = 'g', value_name = "GPIO", allow_hyphen_values = true)]
    strobe_gpio: Option<i64>,

    /// Number of daisy-chained registers (1 or 2).
    #[arg(long, short = 'm', value_name = "N")]
    registers: Option<u8>,

    /// Pattern mode: 'counter' or 'walking'.
    #[arg(long, short = 'a', value_name = "MODE")]
    mode: Option<String>,

    /// Invert the output (active-low hardware).
    #[arg(long, short = 'n')]
    invert: bool,

    /// Stream per-tick delay statistics to stdout.
    #[arg(long, short = 'S')]
    stat: bool,

    /// Request real-time scheduling (root required).
    #[arg(long, short = 'r')]
    realtime: bool,

    /// Maximum ticks to run (0 = until interrupted).
    #[arg(long, default_value = "0")]
    max_ticks: u64,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose);

    info!(version = env!("CARGO_PKG_VERSION"), "starting shiftled");

    let mut config = load_config(&args)?;
    apply_overrides(&args, &mut config)?;
    config.validate()?;

    info!(
        interval_ms = config.interval.as_millis(),
        spi_dev = %config.spi.device.display(),
        spi_speed_hz = config.spi.speed_hz,
        strobe_gpio = ?config.strobe.gpio,
        mode = %config.pattern.mode,
        registers = %config.pattern.width,
        inverted = (config.pattern.polarity == Polarity::Inverted),
        stats = config.stats,
        realtime = config.realtime.enabled,
        "configuration resolved"
    );
    info!(
        daytime = %format_daytime(SystemDaytime::new().sample()),
        "local day time"
    );

    run(&config)
}

/// Initialize logging to stderr (stdout belongs to the statistics stream).
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = format!(
        "shiftled_daemon={level},shiftled_runtime={level},shiftled_hal={level},shiftled_common={level}"
    );

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

/// Load configuration from file or use defaults.
///
/// Resolution priority (first existing file wins):
/// 1. Command-line `--config` argument
/// 2. `SHIFTLED_CONFIG_PATH` environment variable
/// 3. `/etc/shiftled/config.toml` (system path)
/// 4. Built-in defaults
fn load_config(args: &Args) -> Result<RunConfig> {
    if let Some(config_path) = &args.config {
        info!(?config_path, "loading config from command-line argument");
        return RunConfig::from_file(config_path)
            .with_context(|| format!("failed to load config from {config_path:?}"));
    }

    if let Ok(env_path) = std::env::var("SHIFTLED_CONFIG_PATH") {
        let config_path = PathBuf::from(&env_path);
        if config_path.exists() {
            info!(?config_path, "loading config from SHIFTLED_CONFIG_PATH");
            return RunConfig::from_file(&config_path).with_context(|| {
                format!("failed to load config from SHIFTLED_CONFIG_PATH={env_path:?}")
            });
        }
        warn!(
            path = %env_path,
            "SHIFTLED_CONFIG_PATH set but file does not exist, checking other locations"
        );
    }

    let system_path = PathBuf::from("/etc/shiftled/config.toml");
    if system_path.exists() {
        info!(?system_path, "loading config from system path");
        return RunConfig::from_file(&system_path)
            .with_context(|| format!("failed to load config from {system_path:?}"));
    }

    info!("no config file found, using built-in defaults");
    Ok(RunConfig::default())
}

/// Layer command-line overrides on top of the loaded configuration.
fn apply_overrides(args: &Args, config: &mut RunConfig) -> Result<()> {
    if let Some(ms) = args.interval_ms {
        config.interval = std::time::Duration::from_millis(ms);
    }
    if let Some(dev) = &args.spi_dev {
        config.spi.device = dev.clone();
    }
    if let Some(speed) = args.spi_speed {
        config.spi.speed_hz = speed;
    }
    if let Some(gpio) = args.strobe_gpio {
        config.strobe.gpio = u32::try_from(gpio).ok();
    }
    if let Some(count) = args.registers {
        config.pattern.width = RegisterWidth::from_count(count)?;
    }
    if let Some(mode) = &args.mode {
        config.pattern.mode = mode.parse()?;
    }
    if args.invert {
        config.pattern.polarity = Polarity::Inverted;
    }
    if args.stat {
        config.stats = true;
    }
    if args.realtime {
        config.realtime.enabled = true;
    }
    if args.max_ticks > 0 {
        config.max_ticks = args.max_ticks;
    }
    Ok(())
}

/// Acquire hardware, run the loop, report.
fn run(config: &RunConfig) -> Result<()> {
    init_realtime(&config.realtime).context("real-time initialization failed")?;

    // Acquire the strobe pin first, then the transport; the loop releases
    // in reverse order.
    let strobe = match config.strobe.gpio {
        Some(gpio) => Some(
            SysfsPin::acquire(gpio).with_context(|| format!("failed to acquire GPIO {gpio}"))?,
        ),
        None => None,
    };

    let port = SpidevPort::open(&config.spi).with_context(|| {
        format!("failed to open SPI device {}", config.spi.device.display())
    })?;

    let mut sloop = SignalLoop::new(SystemDaytime::new(), port, strobe, config);

    let handler = SignalHandler::install(sloop.cancel_token())
        .context("failed to set up signal handlers")?;

    info!("running; press CTRL-C to stop");
    let summary = sloop.run()?;

    // Let the signal bridge thread wind down on non-signal exits too
    handler.cancel();

    if summary.write_failures > 0 {
        warn!(
            failures = summary.write_failures,
            "hardware writes failed during the run"
        );
    }

    // When the statistics stream owns stdout, the report goes to stderr
    let report = final_report(summary.ticks, summary.jitter.as_ref());
    if config.stats {
        eprint!("{report}");
    } else {
        print!("{report}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shiftled_common::PatternMode;

    #[test]
    fn test_args_parsing() {
        let args = Args::parse_from(["shiftled", "--stat", "250"]);
        assert!(args.stat);
        assert_eq!(args.interval_ms, Some(250));
        assert!(args.config.is_none());
    }

    #[test]
    fn test_args_with_hardware_options() {
        let args = Args::parse_from([
            "shiftled", "-d", "/dev/spidev0.0", "-s", "1000000", "-g", "-1", "-m", "2",
        ]);
        assert_eq!(args.spi_dev, Some(PathBuf::from("/dev/spidev0.0")));
        assert_eq!(args.spi_speed, Some(1_000_000));
        assert_eq!(args.strobe_gpio, Some(-1));
        assert_eq!(args.registers, Some(2));
    }

    #[test]
    fn test_overrides_layer_onto_defaults() {
        let args = Args::parse_from([
            "shiftled", "-a", "walking", "-n", "-g", "-1", "--max-ticks", "10", "50",
        ]);
        let mut config = RunConfig::default();
        apply_overrides(&args, &mut config).unwrap();

        assert_eq!(config.interval, std::time::Duration::from_millis(50));
        assert_eq!(config.pattern.mode, PatternMode::WalkingBit);
        assert_eq!(config.pattern.polarity, Polarity::Inverted);
        assert_eq!(config.strobe.gpio, None);
        assert_eq!(config.max_ticks, 10);
    }

    #[test]
    fn test_unknown_mode_is_fatal() {
        let args = Args::parse_from(["shiftled", "-a", "blink"]);
        let mut config = RunConfig::default();
        assert!(apply_overrides(&args, &mut config).is_err());
    }
}
