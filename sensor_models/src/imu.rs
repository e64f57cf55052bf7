//! IMU sensor parameters.

use serde::{Deserialize, Serialize};

/// Physical configuration of a phone-grade IMU.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImuParams {
    /// Accelerometer sample rate (Hz)
    pub accel_rate_hz: f64,
    /// Magnetometer sample rate (Hz)
    pub mag_rate_hz: f64,
    /// Gravity magnitude reported by the accelerometer (m/s²)
    pub gravity: f64,
    /// Peak amplitude of a heel-strike impulse above gravity (m/s²)
    pub step_impulse_accel: f64,
    /// Rebound amplitude below gravity after the strike (m/s²).
    /// Must stay below gravity so the magnitude never spikes on the rebound.
    pub step_undershoot_accel: f64,
    /// Duration of the positive impulse lobe (seconds); the rebound lobe
    /// lasts twice as long.
    pub step_impulse_s: f64,
    /// Accelerometer noise amplitude, uniform in [-n, n] (m/s²)
    pub accel_noise: f64,
    /// Horizontal component of the ambient magnetic field (arbitrary units)
    pub mag_horizontal: f64,
    /// Vertical component of the ambient magnetic field (arbitrary units)
    pub mag_vertical: f64,
    /// Magnetometer noise amplitude, uniform in [-n, n] (field units)
    pub mag_noise: f64,
}

impl Default for ImuParams {
    fn default() -> Self {
        Self {
            accel_rate_hz: 50.0,
            mag_rate_hz: 20.0,
            gravity: 9.81,
            step_impulse_accel: 60.0,
            step_undershoot_accel: 9.0,
            step_impulse_s: 0.08,
            accel_noise: 0.05,
            mag_horizontal: 22.0, // typical mid-latitude horizontal intensity
            mag_vertical: -42.0,
            mag_noise: 0.3,
        }
    }
}
