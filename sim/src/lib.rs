//! `sim` — Synthetic pedestrian walks: walker kinematics, IMU sample
//! synthesis, named scenarios, replay logs.

pub mod imu_sim;
pub mod replay;
pub mod scenarios;
pub mod walker;

pub use imu_sim::{ImuSimulator, SampleKind, SimSample};
pub use replay::{load_log, save_log, synthesize_log, SampleLog};
pub use scenarios::{Scenario, ScenarioKind};
pub use walker::{HeadingProfile, Walker};
