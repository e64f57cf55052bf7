//! Ground-truth pedestrian model.
//!
//! A walker takes steps at a fixed cadence along a heading profile. Position
//! propagates with the same step convention the engine integrates with, so
//! engine output is directly comparable to ground truth.

use serde::{Deserialize, Serialize};

/// Describes the walker's heading over time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum HeadingProfile {
    /// One fixed heading for the whole walk.
    Constant { heading: f64 },
    /// Piecewise-constant heading. `segments` is sorted by time ascending:
    /// [(t_start_s, heading_rad), ...]. The active heading is the last one
    /// whose t_start <= current t.
    Segmented { segments: Vec<(f64, f64)> },
}

impl HeadingProfile {
    /// Heading at simulation time `t` seconds.
    pub fn heading_at(&self, t: f64) -> f64 {
        match self {
            HeadingProfile::Constant { heading } => *heading,
            HeadingProfile::Segmented { segments } => segments
                .iter()
                .filter(|(t_start, _)| *t_start <= t)
                .last()
                .map(|(_, h)| *h)
                .unwrap_or(0.0),
        }
    }
}

/// A simulated pedestrian with ground-truth position.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Walker {
    /// Steps per second while walking.
    pub cadence_hz: f64,
    /// True stride length (meters).
    pub stride_m: f64,
    pub profile: HeadingProfile,
    /// Standing-still windows [(t_start_s, t_end_s), ...]; no steps inside.
    pub rests: Vec<(f64, f64)>,
    /// True position [x, y] (meters, engine axis convention).
    pub position: [f64; 2],
    pub steps_taken: u64,
    next_step_time: f64,
}

impl Walker {
    pub fn new(profile: HeadingProfile, cadence_hz: f64, stride_m: f64) -> Self {
        let first_step = 1.0 / cadence_hz;
        Self {
            cadence_hz,
            stride_m,
            profile,
            rests: Vec::new(),
            position: [0.0, 0.0],
            steps_taken: 0,
            next_step_time: first_step,
        }
    }

    pub fn with_rests(mut self, rests: Vec<(f64, f64)>) -> Self {
        self.rests = rests;
        self
    }

    /// True if the walker is resting at time `t`.
    pub fn is_resting(&self, t: f64) -> bool {
        self.rests.iter().any(|(s, e)| t >= *s && t < *e)
    }

    /// Advance to time `t`. Returns the times of all steps taken in the
    /// interval since the previous call.
    pub fn advance(&mut self, t: f64) -> Vec<f64> {
        let mut steps = Vec::new();
        let period = 1.0 / self.cadence_hz;
        while self.next_step_time <= t {
            let ts = self.next_step_time;
            self.next_step_time += period;
            if self.is_resting(ts) {
                continue;
            }
            self.take_step(ts);
            steps.push(ts);
        }
        steps
    }

    fn take_step(&mut self, t: f64) {
        let h = self.profile.heading_at(t);
        // Matches the engine integrator: +x east, screen-oriented y.
        self.position[0] += self.stride_m * h.sin();
        self.position[1] -= self.stride_m * h.cos();
        self.steps_taken += 1;
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
    fn constant_profile_walks_straight() {
        let mut w = Walker::new(HeadingProfile::Constant { heading: 0.0 }, 2.0, 0.7);
        let steps = w.advance(5.0);
        assert_eq!(steps.len(), 10);
        assert_abs_diff_eq!(w.position[0], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(w.position[1], -7.0, epsilon = 1e-9);
    }

    #[test]
    fn segmented_profile_turns() {
        let profile = HeadingProfile::Segmented {
            segments: vec![(0.0, 0.0), (5.0, PI / 2.0)],
        };
        let mut w = Walker::new(profile, 2.0, 0.5);
        w.advance(10.0);
        // 10 steps north (y -= 5), then 10 east (x += 5).
        assert_abs_diff_eq!(w.position[0], 5.0, epsilon = 1e-9);
        assert_abs_diff_eq!(w.position[1], -5.0, epsilon = 1e-9);
    }

    #[test]
    fn rest_window_suppresses_steps() {
        let w = Walker::new(HeadingProfile::Constant { heading: 0.0 }, 2.0, 0.7);
        let mut w = w.with_rests(vec![(2.0, 4.0)]);
        let steps = w.advance(6.0);
        // 12 step slots in 6 s, 4 of them inside the rest window.
        assert_eq!(steps.len(), 8);
        assert!(steps.iter().all(|t| *t < 2.0 || *t >= 4.0));
    }

    #[test]
    fn advance_is_incremental() {
        let mut w = Walker::new(HeadingProfile::Constant { heading: 0.0 }, 2.0, 0.7);
        let a = w.advance(1.0).len();
        let b = w.advance(2.0).len();
        assert_eq!(a + b, w.steps_taken as usize);
        assert_eq!(a + b, 4);
    }
}
