//! Sensor ingress: low-pass filtering and latest-value broadcast of the raw
//! device streams.
//!
//! # Contract
//! - Accelerometer samples pass through a first-order IIR low-pass
//!   `y[n] = (1 - alpha) * y[n-1] + alpha * x[n]`; the first sample bootstraps
//!   the filter state.
//! - Magnetometer samples are forwarded unchanged.
//! - Gyroscope samples are accepted for future fusion and dropped.
//! - Samples with a NaN/Inf component are dropped; filter state is retained.
//! - Both post-processed streams replay their latest value to new subscribers.

use crate::events::Subject;
use crate::types::{SensorSample, Vec3};
use tracing::trace;

/// Configuration for the ingress stage.
#[derive(Clone, Debug)]
pub struct IngressConfig {
    /// Low-pass smoothing factor for the accelerometer (0-1, lower = smoother).
    pub lowpass_alpha: f64,
}

impl Default for IngressConfig {
    fn default() -> Self {
        Self {
            lowpass_alpha: 0.10,
        }
    }
}

/// Filters and re-broadcasts the raw sensor streams.
pub struct SensorIngress {
    config: IngressConfig,
    /// IIR state; None until the first accel sample bootstraps it.
    filtered_accel: Option<Vec3>,
    /// Post-filter accelerometer stream (replaying).
    pub accel: Subject<SensorSample>,
    /// Pass-through magnetometer stream (replaying).
    pub mag: Subject<SensorSample>,
}

impl SensorIngress {
    pub fn new(config: IngressConfig) -> Self {
        Self {
            config,
            filtered_accel: None,
            accel: Subject::replaying(),
            mag: Subject::replaying(),
        }
    }

    /// Filter and broadcast one accelerometer sample.
    /// Returns the filtered sample, or None when the sample was dropped.
    pub fn on_accelerometer(&mut self, sample: SensorSample) -> Option<SensorSample> {
        if !sample.is_finite() {
            trace!(t = sample.timestamp_ms, "dropping non-finite accel sample");
            return None;
        }
        let x = sample.vec();
        let y = match self.filtered_accel {
            Some(prev) => prev * (1.0 - self.config.lowpass_alpha) + x * self.config.lowpass_alpha,
            None => x,
        };
        self.filtered_accel = Some(y);
        let filtered = SensorSample::new(sample.timestamp_ms, [y.x, y.y, y.z]);
        self.accel.emit(filtered);
        Some(filtered)
    }

    /// Broadcast one magnetometer sample unchanged.
    /// Returns the sample, or None when it was dropped.
    pub fn on_magnetometer(&mut self, sample: SensorSample) -> Option<SensorSample> {
        if !sample.is_finite() {
            trace!(t = sample.timestamp_ms, "dropping non-finite mag sample");
            return None;
        }
        self.mag.emit(sample);
        Some(sample)
    }

    /// Gyroscope is accepted for possible future fusion but unused.
    pub fn on_gyroscope(&mut self, _sample: SensorSample) {}

    /// Clear the filter state so a subsequent start begins from the next
    /// sample.
    pub fn reset(&mut self) {
        self.filtered_accel = None;
    }

    /// Close both broadcast streams. Idempotent.
    pub fn close(&mut self) {
        self.accel.close();
        self.mag.close();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn s(t: u64, v: [f64; 3]) -> SensorSample {
        SensorSample::new(t, v)
    }

    #[test]
    fn first_sample_bootstraps_filter() {
        let mut ingress = SensorIngress::new(IngressConfig::default());
        let out = ingress.on_accelerometer(s(0, [1.0, 2.0, 3.0])).unwrap();
        assert_eq!(out.v, [1.0, 2.0, 3.0]);
    }

    #[test]
    fn filter_converges_toward_constant_input() {
        let mut ingress = SensorIngress::new(IngressConfig::default());
        ingress.on_accelerometer(s(0, [0.0, 0.0, 0.0]));
        let mut last = [0.0; 3];
        for i in 1..200 {
            last = ingress.on_accelerometer(s(i, [0.0, 0.0, 10.0])).unwrap().v;
        }
        assert_abs_diff_eq!(last[2], 10.0, epsilon = 1e-6);
    }

    #[test]
    fn second_sample_blends_with_alpha() {
        let mut ingress = SensorIngress::new(IngressConfig {
            lowpass_alpha: 0.10,
        });
        ingress.on_accelerometer(s(0, [0.0, 0.0, 0.0]));
        let out = ingress.on_accelerometer(s(20, [0.0, 0.0, 10.0])).unwrap();
        assert_abs_diff_eq!(out.v[2], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn non_finite_sample_dropped_and_state_retained() {
        let mut ingress = SensorIngress::new(IngressConfig::default());
        ingress.on_accelerometer(s(0, [0.0, 0.0, 10.0]));
        assert!(ingress
            .on_accelerometer(s(20, [f64::NAN, 0.0, 10.0]))
            .is_none());
        // Next good sample blends against the retained state, not a reset one.
        let out = ingress.on_accelerometer(s(40, [0.0, 0.0, 10.0])).unwrap();
        assert_abs_diff_eq!(out.v[2], 10.0, epsilon = 1e-12);
    }

    #[test]
    fn mag_forwarded_unchanged() {
        let mut ingress = SensorIngress::new(IngressConfig::default());
        let out = ingress.on_magnetometer(s(5, [22.0, -3.0, -40.0])).unwrap();
        assert_eq!(out.v, [22.0, -3.0, -40.0]);
    }

    #[test]
    fn reset_clears_filter_state() {
        let mut ingress = SensorIngress::new(IngressConfig::default());
        ingress.on_accelerometer(s(0, [0.0, 0.0, 10.0]));
        ingress.reset();
        // Bootstrap again: output equals input exactly.
        let out = ingress.on_accelerometer(s(20, [1.0, 0.0, 0.0])).unwrap();
        assert_eq!(out.v, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn late_subscriber_sees_latest_filtered_sample() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let mut ingress = SensorIngress::new(IngressConfig::default());
        ingress.on_accelerometer(s(0, [0.0, 0.0, 9.8]));

        let seen = Rc::new(RefCell::new(Vec::new()));
        let c = seen.clone();
        ingress
            .accel
            .subscribe(move |v: &SensorSample| c.borrow_mut().push(v.timestamp_ms));
        assert_eq!(*seen.borrow(), vec![0]);
    }
}
