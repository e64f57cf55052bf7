//! Heading estimation: tilt-compensated magnetic heading fused through a
//! circular one-dimensional Kalman filter.
//!
//! # Design choices
//! - Heading is a single wrapped scalar in (-pi, pi], 0 = magnetic north.
//! - The measurement is the tilt-compensated compass angle; pitch and roll
//!   are recovered from the gravity direction of the filtered accel sample.
//! - The filter is re-entered per measurement:
//!   predict `p += q`, innovation `d = z - x` wrapped once, gain
//!   `k = p / (p + r)`, update `x += k * d` wrapped, `p = (1 - k) * p`.
//!   Wrapping the innovation makes the filter take the short way across
//!   the +/-pi seam instead of unwinding through zero.

use crate::types::Vec3;

/// Configuration for the heading filter.
#[derive(Clone, Debug)]
pub struct HeadingConfig {
    /// Process noise q added to the covariance each measurement.
    pub process_noise: f64,
    /// Measurement noise r of the compass angle.
    pub measurement_noise: f64,
    /// Initial error covariance p0.
    pub initial_covariance: f64,
}

impl Default for HeadingConfig {
    fn default() -> Self {
        Self {
            process_noise: 0.01,
            measurement_noise: 0.10,
            initial_covariance: 1.0,
        }
    }
}

/// Wrap an angle into (-pi, pi] by adding or subtracting 2*pi once.
pub fn wrap_angle(mut a: f64) -> f64 {
    if a > std::f64::consts::PI {
        a -= std::f64::consts::TAU;
    } else if a <= -std::f64::consts::PI {
        a += std::f64::consts::TAU;
    }
    a
}

/// Tilt-compensated compass heading from one accel/mag sample pair.
///
/// Returns None when the accel magnitude is zero (normalization undefined).
pub fn tilt_compensated_heading(accel: Vec3, mag: Vec3) -> Option<f64> {
    let n = accel.norm();
    if n == 0.0 {
        return None;
    }
    let a = accel / n;

    // Guard asin against |a.y| creeping past 1 by a rounding ulp.
    let pitch = (-a.y).clamp(-1.0, 1.0).asin();
    let roll = a.x.atan2(a.z);

    let mx = mag.x * pitch.cos() + mag.z * pitch.sin();
    let my =
        mag.x * roll.sin() * pitch.sin() + mag.y * roll.cos() - mag.z * roll.sin() * pitch.cos();

    Some((-my).atan2(mx))
}

// ---------------------------------------------------------------------------
// Scalar circular Kalman filter
// ---------------------------------------------------------------------------

/// One-dimensional Kalman filter over a wrapped angle.
#[derive(Clone, Debug)]
pub struct ScalarKalman {
    /// Current estimate, wrapped to (-pi, pi].
    x: f64,
    /// Error covariance.
    p: f64,
    q: f64,
    r: f64,
}

impl ScalarKalman {
    pub fn new(config: &HeadingConfig) -> Self {
        Self {
            x: 0.0,
            p: config.initial_covariance,
            q: config.process_noise,
            r: config.measurement_noise,
        }
    }

    /// Fold in one measurement `z` (radians) and return the new estimate.
    pub fn update(&mut self, z: f64) -> f64 {
        self.p += self.q;
        let d = wrap_angle(z - self.x);
        let k = self.p / (self.p + self.r);
        self.x = wrap_angle(self.x + k * d);
        self.p = (1.0 - k) * self.p;
        self.x
    }

    pub fn estimate(&self) -> f64 {
        self.x
    }

    pub fn covariance(&self) -> f64 {
        self.p
    }

    pub fn reset(&mut self, config: &HeadingConfig) {
        self.x = 0.0;
        self.p = config.initial_covariance;
    }
}

// ---------------------------------------------------------------------------
// Estimator: latest-sample fusion
// ---------------------------------------------------------------------------

/// Fuses the most recent accel and mag samples into a filtered heading.
///
/// Recomputes on every arrival of either sensor once both have been seen at
/// least once.
pub struct HeadingEstimator {
    config: HeadingConfig,
    filter: ScalarKalman,
    last_accel: Option<Vec3>,
    last_mag: Option<Vec3>,
}

impl HeadingEstimator {
    pub fn new(config: HeadingConfig) -> Self {
        let filter = ScalarKalman::new(&config);
        Self {
            config,
            filter,
            last_accel: None,
            last_mag: None,
        }
    }

    /// Feed an accelerometer sample (filtered). Returns the new heading when
    /// an update was possible.
    pub fn on_accelerometer(&mut self, accel: Vec3) -> Option<f64> {
        self.last_accel = Some(accel);
        self.recompute()
    }

    /// Feed a magnetometer sample. Returns the new heading when an update was
    /// possible.
    pub fn on_magnetometer(&mut self, mag: Vec3) -> Option<f64> {
        self.last_mag = Some(mag);
        self.recompute()
    }

    /// Current filtered heading in (-pi, pi].
    pub fn heading(&self) -> f64 {
        self.filter.estimate()
    }

    /// Reset the filter and forget both cached samples.
    pub fn reset(&mut self) {
        self.filter.reset(&self.config);
        self.last_accel = None;
        self.last_mag = None;
    }

    fn recompute(&mut self) -> Option<f64> {
        let accel = self.last_accel?;
        let mag = self.last_mag?;
        let raw = tilt_compensated_heading(accel, mag)?;
        Some(self.filter.update(raw))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    #[test]
    fn wrap_covers_both_seams() {
        assert_abs_diff_eq!(wrap_angle(PI + 0.1), -PI + 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(wrap_angle(-PI - 0.1), PI - 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(wrap_angle(PI), PI, epsilon = 0.0);
        assert_abs_diff_eq!(wrap_angle(-PI), PI, epsilon = 0.0);
    }

    #[test]
    fn flat_device_heading_is_compass_angle() {
        // Device flat: gravity along +z, field pointing north maps to 0.
        let accel = Vec3::new(0.0, 0.0, 9.8);
        let north = Vec3::new(30.0, 0.0, -40.0);
        let h = tilt_compensated_heading(accel, north).unwrap();
        assert_abs_diff_eq!(h, 0.0, epsilon = 1e-12);

        // Field rotated a quarter turn: heading pi/2.
        let east = Vec3::new(0.0, -30.0, -40.0);
        let h = tilt_compensated_heading(accel, east).unwrap();
        assert_abs_diff_eq!(h, PI / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn zero_accel_magnitude_skips_update() {
        assert!(tilt_compensated_heading(Vec3::zeros(), Vec3::new(30.0, 0.0, 0.0)).is_none());
    }

    #[test]
    fn kalman_converges_to_constant_measurement() {
        let mut kf = ScalarKalman::new(&HeadingConfig::default());
        let mut h = 0.0;
        for _ in 0..100 {
            h = kf.update(1.0);
        }
        assert_abs_diff_eq!(h, 1.0, epsilon = 1e-3);
    }

    #[test]
    fn kalman_covariance_shrinks_on_update() {
        let mut kf = ScalarKalman::new(&HeadingConfig::default());
        let before = kf.covariance();
        kf.update(0.5);
        assert!(kf.covariance() < before);
    }

    #[test]
    fn innovation_takes_short_way_across_pi_seam() {
        // Measurements hopping across +/-pi must not drag the estimate
        // through zero.
        let mut kf = ScalarKalman::new(&HeadingConfig::default());
        let mut outputs = Vec::new();
        let mut prev = kf.estimate();
        for z in [3.10, -3.10, 3.13] {
            let out = kf.update(z);
            outputs.push((prev, out));
            prev = out;
        }
        // First update pulls strongly toward 3.10 (high initial covariance).
        assert!(outputs[0].1 > 2.5);
        // Each later delta is a wrapped short-way step, never a long unwind.
        for (before, after) in &outputs[1..] {
            let delta = wrap_angle(after - before).abs();
            assert!(
                delta < 1.0,
                "delta {} should cross the seam, not unwind through 0",
                delta
            );
        }
        // The estimate stays near the seam.
        assert!(outputs[2].1.abs() > 2.5);
    }

    #[test]
    fn output_always_wrapped() {
        let mut kf = ScalarKalman::new(&HeadingConfig::default());
        for z in [3.0, -3.0, 3.1, -3.1, 2.9, -2.9] {
            let out = kf.update(z);
            assert!(out > -PI && out <= PI, "estimate {} out of range", out);
        }
    }

    #[test]
    fn estimator_needs_both_sensors() {
        let mut est = HeadingEstimator::new(HeadingConfig::default());
        assert!(est.on_accelerometer(Vec3::new(0.0, 0.0, 9.8)).is_none());
        assert!(est.on_magnetometer(Vec3::new(30.0, 0.0, -40.0)).is_some());
        // Either sensor alone now triggers a recompute.
        assert!(est.on_accelerometer(Vec3::new(0.0, 0.0, 9.8)).is_some());
    }

    #[test]
    fn estimator_converges_toward_field_direction() {
        let mut est = HeadingEstimator::new(HeadingConfig::default());
        let accel = Vec3::new(0.0, 0.0, 9.8);
        let mag = Vec3::new(30.0, -30.0, -40.0); // raw heading pi/4
        est.on_accelerometer(accel);
        let mut h = 0.0;
        for _ in 0..200 {
            h = est.on_magnetometer(mag).unwrap();
        }
        assert_abs_diff_eq!(h, PI / 4.0, epsilon = 1e-3);
    }
}
