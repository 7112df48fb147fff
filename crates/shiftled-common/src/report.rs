//! Statistics output formatting.
//!
//! Two surfaces: the per-tick statistics line streamed to stdout while the
//! loop runs, and the end-of-run summary. Both are plain strings so the
//! caller decides the destination.

use crate::jitter::JitterSnapshot;

/// Format one statistics line: tick, day time, min, max, and current
/// interval, all in milliseconds, as fixed-width columns.
#[must_use]
pub fn stats_line(tick: u32, daytime: f64, snap: &JitterSnapshot, delta: f64) -> String {
    format!(
        "{tick:10} {:12.3} {:12.3} {:12.3} {:12.3}",
        daytime * 1e3,
        snap.min * 1e3,
        snap.max * 1e3,
        delta * 1e3
    )
}

/// Format the end-of-run report: tick count and interval statistics in
/// seconds with 9 decimal digits.
#[must_use]
pub fn final_report(ticks: u64, snap: Option<&JitterSnapshot>) -> String {
    let mut out = String::from("--- run statistics ---\n");
    out.push_str(&format!("=> ticks           = {ticks}\n"));
    match snap {
        Some(s) => {
            out.push_str(&format!("=> dt_min          = {:.9}\n", s.min));
            out.push_str(&format!("=> dt_max          = {:.9}\n", s.max));
            out.push_str(&format!("=> dt_max - dt_min = {:.9}\n", s.range()));
            out.push_str(&format!("=> dt_mean         = {:.9}\n", s.mean));
        }
        None => out.push_str("=> no intervals measured\n"),
    }
    out
}
