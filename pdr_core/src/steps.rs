//! Step detection: peak detection on accelerometer magnitude with a
//! refractory interval.
//!
//! # Algorithm
//! A step registers when the filtered magnitude rises above the threshold
//! while the detector is not already inside a peak and the refractory
//! interval since the last step has elapsed (strictly greater than). Falling
//! to or below the threshold re-arms the detector. Wall-clock regressions
//! are clamped so a backward jump can never register a spurious step.

use crate::types::Vec3;

/// Configuration for the step detector.
#[derive(Clone, Debug)]
pub struct StepDetectorConfig {
    /// Accel magnitude a sample must exceed to open a peak (m/s^2).
    pub magnitude_threshold: f64,
    /// Minimum time between steps in milliseconds (prevents double-counting).
    pub min_interval_ms: u64,
}

impl Default for StepDetectorConfig {
    fn default() -> Self {
        Self {
            magnitude_threshold: 11.0, // gravity plus a firm heel strike
            min_interval_ms: 300,      // max ~3.3 steps/sec
        }
    }
}

/// Threshold/refractory peak detector over the filtered accel stream.
pub struct StepDetector {
    config: StepDetectorConfig,
    /// Refractory flag: magnitude is currently above threshold.
    in_peak: bool,
    last_step_ms: u64,
    count: u64,
}

impl StepDetector {
    pub fn new(config: StepDetectorConfig) -> Self {
        Self {
            config,
            in_peak: false,
            last_step_ms: 0,
            count: 0,
        }
    }

    /// Process one filtered accelerometer sample.
    /// Returns the new cumulative count when this sample registered a step.
    pub fn process(&mut self, timestamp_ms: u64, accel: Vec3) -> Option<u64> {
        let m = accel.norm();
        // Clamp against wall-clock regressions.
        let now_ms = timestamp_ms.max(self.last_step_ms);

        if m > self.config.magnitude_threshold {
            if !self.in_peak && now_ms - self.last_step_ms > self.config.min_interval_ms {
                self.in_peak = true;
                self.last_step_ms = now_ms;
                self.count += 1;
                return Some(self.count);
            }
        } else {
            self.in_peak = false;
        }
        None
    }

    /// Cumulative number of steps registered.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Reset all detector state, including the count.
    pub fn reset(&mut self) {
        self.in_peak = false;
        self.last_step_ms = 0;
        self.count = 0;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
