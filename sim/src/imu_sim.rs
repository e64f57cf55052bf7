//! IMU sample synthesis.
//!
//! Generates asynchronous accelerometer and magnetometer streams from walker
//! ground truth:
//! - Accel: gravity along device z plus a heel-strike impulse per true step
//!   (raised-cosine strike lobe, then a longer rebound below gravity so the
//!   engine's low-pass output re-arms between steps), plus uniform noise.
//! - Mag: the ambient field rotated into the device frame by the true
//!   heading, plus uniform noise. For a flat-held device the horizontal
//!   field components are (B_h·cos h, -B_h·sin h).
//!
//! All randomness comes from a seeded ChaCha8 stream, so a scenario replays
//! identically for the same seed.

use crate::walker::Walker;
use pdr_core::types::SensorSample;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use sensor_models::ImuParams;
use serde::{Deserialize, Serialize};

/// Which stream a synthesized sample belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleKind {
    Accel,
    Mag,
}

/// One synthesized sample, tagged with its stream.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SimSample {
    pub kind: SampleKind,
    pub sample: SensorSample,
}

/// Generates IMU sample streams from a walker.
pub struct ImuSimulator {
    pub params: ImuParams,
    rng: ChaCha8Rng,
    next_accel_time: f64,
    next_mag_time: f64,
    /// Start time of the impulse currently being played out.
    last_step_time: Option<f64>,
}

impl ImuSimulator {
    pub fn new(params: ImuParams, seed: u64) -> Self {
        Self {
            params,
            rng: ChaCha8Rng::seed_from_u64(seed),
            next_accel_time: 0.0,
            next_mag_time: 0.0,
            last_step_time: None,
        }
    }

    /// Record a true step so the next accel samples carry its impulse.
    pub fn note_step(&mut self, t: f64) {
        self.last_step_time = Some(t);
    }

    /// Generate all samples due at or before `t`, in timestamp order per
    /// stream (mag before accel on exact ties, matching device delivery).
    pub fn generate(&mut self, walker: &Walker, t: f64) -> Vec<SimSample> {
        let mut out = Vec::new();

        while self.next_mag_time <= t {
            let ts = self.next_mag_time;
            self.next_mag_time += 1.0 / self.params.mag_rate_hz;
            out.push(self.mag_sample(walker, ts));
        }
        while self.next_accel_time <= t {
            let ts = self.next_accel_time;
            self.next_accel_time += 1.0 / self.params.accel_rate_hz;
            out.push(self.accel_sample(ts));
        }
        out
    }

    fn accel_sample(&mut self, t: f64) -> SimSample {
        let z = self.params.gravity + self.impulse_at(t);
        let n = self.params.accel_noise;
        let v = [
            self.noise(n),
            self.noise(n),
            z + self.noise(n),
        ];
        SimSample {
            kind: SampleKind::Accel,
            sample: SensorSample::new(to_ms(t), v),
        }
    }

    fn mag_sample(&mut self, walker: &Walker, t: f64) -> SimSample {
        let h = walker.profile.heading_at(t);
        let bh = self.params.mag_horizontal;
        let n = self.params.mag_noise;
        let v = [
            bh * h.cos() + self.noise(n),
            -bh * h.sin() + self.noise(n),
            self.params.mag_vertical + self.noise(n),
        ];
        SimSample {
            kind: SampleKind::Mag,
            sample: SensorSample::new(to_ms(t), v),
        }
    }

    /// Heel-strike waveform relative to the last true step.
    fn impulse_at(&self, t: f64) -> f64 {
        let step_t = match self.last_step_time {
            Some(s) => s,
            None => return 0.0,
        };
        let dt = t - step_t;
        let strike = self.params.step_impulse_s;
        let rebound = 2.0 * strike;
        if dt < 0.0 {
            0.0
        } else if dt < strike {
            let u = dt / strike;
            self.params.step_impulse_accel * 0.5 * (1.0 - (std::f64::consts::TAU * u).cos())
        } else if dt < strike + rebound {
            let u = (dt - strike) / rebound;
            -self.params.step_undershoot_accel * 0.5 * (1.0 - (std::f64::consts::TAU * u).cos())
        } else {
            0.0
        }
    }

    fn noise(&mut self, amplitude: f64) -> f64 {
        self.rng.gen::<f64>() * amplitude * 2.0 - amplitude
    }
}

fn to_ms(t: f64) -> u64 {
    (t * 1000.0).round() as u64
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
