//! Replay: serialize/deserialize sample logs for offline analysis.

use crate::imu_sim::{ImuSimulator, SimSample};
use crate::scenarios::Scenario;
use serde::{Deserialize, Serialize};
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// A full recorded sample log.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SampleLog {
    pub scenario_name: String,
    pub seed: u64,
    pub duration_s: f64,
    /// All samples in chronological order
    pub samples: Vec<SimSample>,
    /// Ground-truth final position of the walker
    pub final_position: [f64; 2],
    /// Ground-truth step count
    pub true_steps: u64,
}

/// Synthesize the full sample log for a scenario.
///
/// Steps the walker on a 10 ms heartbeat, injecting heel-strike impulses as
/// true steps occur, and drains the sensor schedules each tick.
pub fn synthesize_log(scenario: &Scenario) -> SampleLog {
    let mut walker = scenario.walker.clone();
    let mut sim = ImuSimulator::new(scenario.imu.clone(), scenario.seed);
    let mut samples = Vec::new();

    let dt = 0.01;
    let mut t = 0.0;
    while t <= scenario.duration_s {
        for step_t in walker.advance(t) {
            sim.note_step(step_t);
        }
        samples.extend(sim.generate(&walker, t));
        t += dt;
    }

    SampleLog {
        scenario_name: scenario.name.clone(),
        seed: scenario.seed,
        duration_s: scenario.duration_s,
        samples,
        final_position: walker.position,
        true_steps: walker.steps_taken,
    }
}

/// Save a sample log to a JSON file.
pub fn save_log(log: &SampleLog, path: &Path) -> anyhow::Result<()> {
    let file = std::fs::File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, log)?;
    Ok(())
}

/// Load a sample log from a JSON file.
pub fn load_log(path: &Path) -> anyhow::Result<SampleLog> {
    let file = std::fs::File::open(path)?;
    let reader = BufReader::new(file);
    let log: SampleLog = serde_json::from_reader(reader)?;
    Ok(log)
}
