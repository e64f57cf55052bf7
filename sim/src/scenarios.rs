//! Scenario definitions.
//!
//! Each scenario is a named configuration of a walker and IMU parameters.
//! All scenarios are deterministic given the same seed.

use crate::walker::{HeadingProfile, Walker};
use sensor_models::ImuParams;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Which pre-defined scenario to load.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
pub enum ScenarioKind {
    /// Straight corridor walk, one heading, ~30 m
    Corridor,
    /// Corridor with one right-angle turn halfway
    LShape,
    /// Closed rectangular loop, four right-angle turns
    Loop,
    /// Walk out, stand still, walk back the same line
    OutAndBack,
}

/// A fully configured simulation scenario.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub seed: u64,
    /// Total simulated time (seconds)
    pub duration_s: f64,
    pub walker: Walker,
    pub imu: ImuParams,
}

impl Scenario {
    /// Build the named scenario. Uses `seed` for repeatability.
    pub fn build(kind: ScenarioKind, seed: u64) -> Self {
        match kind {
            ScenarioKind::Corridor => Self::corridor(seed),
            ScenarioKind::LShape => Self::l_shape(seed),
            ScenarioKind::Loop => Self::loop_walk(seed),
            ScenarioKind::OutAndBack => Self::out_and_back(seed),
        }
    }

    // -----------------------------------------------------------------------
    // Scenario 1: Corridor
    // -----------------------------------------------------------------------
    fn corridor(seed: u64) -> Self {
        Scenario {
            name: "corridor".into(),
            seed,
            duration_s: 30.0,
            walker: Walker::new(HeadingProfile::Constant { heading: 0.0 }, 1.8, 0.7),
            imu: ImuParams::default(),
        }
    }

    // -----------------------------------------------------------------------
    // Scenario 2: L-shape
    // -----------------------------------------------------------------------
    /// The walker pauses at the corner for longer than the recording
    /// inactivity timeout, so each leg finalizes as its own segment.
    fn l_shape(seed: u64) -> Self {
        let profile = HeadingProfile::Segmented {
            segments: vec![(0.0, 0.0), (14.0, PI / 2.0)],
        };
        let walker = Walker::new(profile, 1.8, 0.7).with_rests(vec![(14.0, 17.0)]);
        Scenario {
            name: "l_shape".into(),
            seed,
            duration_s: 32.0,
            walker,
            imu: ImuParams::default(),
        }
    }

    // -----------------------------------------------------------------------
    // Scenario 3: Loop
    // -----------------------------------------------------------------------
    /// Four 10 s legs separated by 3 s corner pauses.
    fn loop_walk(seed: u64) -> Self {
        let profile = HeadingProfile::Segmented {
            segments: vec![
                (0.0, 0.0),
                (13.0, PI / 2.0),
                (26.0, PI),
                (39.0, -PI / 2.0),
            ],
        };
        let walker = Walker::new(profile, 1.8, 0.7)
            .with_rests(vec![(10.0, 13.0), (23.0, 26.0), (36.0, 39.0)]);
        Scenario {
            name: "loop".into(),
            seed,
            duration_s: 52.0,
            walker,
            imu: ImuParams::default(),
        }
    }

    // -----------------------------------------------------------------------
    // Scenario 4: Out-and-back
    // -----------------------------------------------------------------------
    /// The rest window in the middle is longer than the engine's recording
    /// inactivity timeout, so a recorded session finalizes two segments.
    fn out_and_back(seed: u64) -> Self {
        let profile = HeadingProfile::Segmented {
            segments: vec![(0.0, 0.0), (13.0, PI)],
        };
        let walker = Walker::new(profile, 1.8, 0.7).with_rests(vec![(10.0, 14.0)]);
        Scenario {
            name: "out_and_back".into(),
            seed,
            duration_s: 26.0,
            walker,
            imu: ImuParams::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_builds() {
        for kind in [
            ScenarioKind::Corridor,
            ScenarioKind::LShape,
            ScenarioKind::Loop,
            ScenarioKind::OutAndBack,
        ] {
            let s = Scenario::build(kind, 42);
            assert!(s.duration_s > 0.0);
            assert!(!s.name.is_empty());
        }
    }
}
