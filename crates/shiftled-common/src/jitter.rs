//! Tick-interval jitter tracking.
//!
//! The tracker consumes successive daytime samples and maintains running
//! min/max/sum of the measured intervals in O(1) space, so a run may
//! execute unboundedly many ticks without growing memory.

use crate::daytime::wrap_delta;

/// Measurement phase of the tracker.
///
/// The first sample has no predecessor, so no interval can be measured
/// until the second sample arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackerPhase {
    /// No sample observed yet.
    #[default]
    Uninitialized,
    /// Exactly one sample observed; no interval measured.
    FirstSample,
    /// Two or more samples observed; statistics are defined.
    SteadyState,
}

/// Running interval statistics over successive daytime samples.
#[derive(Debug, Clone, Default)]
pub struct JitterTracker {
    phase: TrackerPhase,
    /// Most recent sample, used as the base of the next delta.
    prev_sample: f64,
    min_delta: f64,
    max_delta: f64,
    sum_delta: f64,
    /// Number of samples observed (not intervals; intervals = samples - 1).
    samples: u64,
}

/// Immutable statistics snapshot, defined once two samples exist.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JitterSnapshot {
    /// Smallest measured interval in seconds.
    pub min: f64,
    /// Largest measured interval in seconds.
    pub max: f64,
    /// Arithmetic mean of all measured intervals in seconds.
    pub mean: f64,
}

impl JitterSnapshot {
    /// Spread between the largest and smallest interval.
    #[must_use]
    pub fn range(&self) -> f64 {
        self.max - self.min
    }
}

impl JitterTracker {
    /// Create a tracker with no samples observed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next daytime sample.
    ///
    /// Returns the interval measured against the previous sample, or
    /// `None` for the very first sample.
    pub fn observe(&mut self, sample: f64) -> Option<f64> {
        self.samples = self.samples.saturating_add(1);

        let delta = match self.phase {
            TrackerPhase::Uninitialized => {
                self.phase = TrackerPhase::FirstSample;
                None
            }
            TrackerPhase::FirstSample => {
                let dt = wrap_delta(sample, self.prev_sample);
                self.min_delta = dt;
                self.max_delta = dt;
                self.sum_delta += dt;
                self.phase = TrackerPhase::SteadyState;
                Some(dt)
            }
            TrackerPhase::SteadyState => {
                let dt = wrap_delta(sample, self.prev_sample);
                self.min_delta = self.min_delta.min(dt);
                self.max_delta = self.max_delta.max(dt);
                self.sum_delta += dt;
                Some(dt)
            }
        };

        self.prev_sample = sample;
        delta
    }

    /// Current measurement phase.
    #[must_use]
    pub fn phase(&self) -> TrackerPhase {
        self.phase
    }

    /// Number of samples observed so far.
    #[must_use]
    pub fn samples(&self) -> u64 {
        self.samples
    }

    /// Current statistics, or `None` while fewer than two samples exist
    /// and no interval has been measured.
    #[must_use]
    pub fn snapshot(&self) -> Option<JitterSnapshot> {
        if self.samples < 2 {
            return None;
        }
        Some(JitterSnapshot {
            min: self.min_delta,
            max: self.max_delta,
            mean: self.sum_delta / (self.samples - 1) as f64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_sample_yields_no_delta() {
        let mut tracker = JitterTracker::new();
        assert_eq!(tracker.observe(100.0), None);
        assert_eq!(tracker.phase(), TrackerPhase::FirstSample);
        assert!(tracker.snapshot().is_none());
    }

    #[test]
    fn test_second_sample_defines_min_and_max() {
        let mut tracker = JitterTracker::new();
        tracker.observe(100.0);
        let dt = tracker.observe(100.1).unwrap();
        assert!((dt - 0.1).abs() < 1e-9);

        let snap = tracker.snapshot().unwrap();
        assert_eq!(snap.min, snap.max);
        assert!((snap.min - 0.1).abs() < 1e-9);
        assert!((snap.mean - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_steady_state_bounds_and_sum() {
        let mut tracker = JitterTracker::new();
        let samples = [10.0, 10.1, 10.25, 10.3, 10.5];
        let mut deltas = Vec::new();
        for s in samples {
            if let Some(dt) = tracker.observe(s) {
                deltas.push(dt);
            }
        }
        assert_eq!(deltas.len(), 4);

        let snap = tracker.snapshot().unwrap();
        for &dt in &deltas {
            assert!(snap.min <= dt + 1e-12);
            assert!(dt <= snap.max + 1e-12);
        }

        let sum: f64 = deltas.iter().sum();
        assert!((snap.mean - sum / 4.0).abs() < 1e-12);
        assert!((snap.min - 0.05).abs() < 1e-9);
        assert!((snap.max - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_interval_across_midnight() {
        let mut tracker = JitterTracker::new();
        tracker.observe(86_399.95);
        let dt = tracker.observe(0.05).unwrap();
        assert!((dt - 0.1).abs() < 1e-9, "dt = {dt}");
    }

    #[test]
    fn test_constant_interval_has_zero_range() {
        let mut tracker = JitterTracker::new();
        for i in 0..100u32 {
            tracker.observe(f64::from(i) * 0.1);
        }
        let snap = tracker.snapshot().unwrap();
        assert!(snap.range() < 1e-9);
        assert!((snap.mean - 0.1).abs() < 1e-9);
    }
}
