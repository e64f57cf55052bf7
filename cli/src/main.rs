//! `stridetrack` CLI: batch scenario runs, replay, metric export.

use anyhow::Result;
use clap::{Parser, Subcommand};
use pdr_core::engine::{EngineConfig, PdrEngine};
use pdr_core::types::Vec2;
use sim::imu_sim::SampleKind;
use sim::replay::{load_log, save_log, synthesize_log, SampleLog};
use sim::scenarios::{Scenario, ScenarioKind};
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

#[derive(Parser)]
#[command(name = "stridetrack", about = "Pedestrian dead-reckoning CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synthesize a named scenario, drive the engine, print a summary.
    RunScenario {
        #[arg(value_enum)]
        scenario: ScenarioKind,
        /// Random seed for reproducibility
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Feed the walk without recording it into the path graph
        #[arg(long)]
        no_record: bool,
        /// Output metrics to a JSON file
        #[arg(long)]
        output: Option<PathBuf>,
        /// Also save the synthesized sample log
        #[arg(long)]
        save_replay: Option<PathBuf>,
    },
    /// Re-drive the engine from a previously saved sample log.
    Replay {
        /// Path to replay JSON file
        input: PathBuf,
        /// Output metrics to a JSON file
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::RunScenario {
            scenario,
            seed,
            no_record,
            output,
            save_replay,
        } => {
            run_scenario(
                scenario,
                seed,
                !no_record,
                output.as_deref(),
                save_replay.as_deref(),
            )?;
        }
        Commands::Replay { input, output } => {
            run_replay(&input, output.as_deref())?;
        }
    }

    Ok(())
}

/// Everything the observers collected while a log was driven through the
/// engine.
#[derive(Clone, Default)]
struct DriveOutcome {
    positions_emitted: u64,
    last_emitted: Option<(f64, f64)>,
    path_changes: u64,
    headings_emitted: u64,
}

/// Feed every sample of a log into the engine, recording if requested.
fn drive_log(engine: &mut PdrEngine, log: &SampleLog, record: bool) -> DriveOutcome {
    let outcome = Rc::new(RefCell::new(DriveOutcome::default()));

    let o = outcome.clone();
    engine.position_out.subscribe(move |p: &Vec2| {
        let mut out = o.borrow_mut();
        out.positions_emitted += 1;
        out.last_emitted = Some((p.x, p.y));
    });
    let o = outcome.clone();
    engine.heading_out.subscribe(move |_: &f64| {
        o.borrow_mut().headings_emitted += 1;
    });
    let o = outcome.clone();
    engine.path_changed.subscribe(move |_| {
        o.borrow_mut().path_changes += 1;
    });

    engine.start();
    if record {
        engine.toggle_recording();
    }
    for s in &log.samples {
        match s.kind {
            SampleKind::Accel => engine.on_accelerometer(s.sample),
            SampleKind::Mag => engine.on_magnetometer(s.sample),
        }
    }
    if record {
        engine.toggle_recording();
    }

    // The subjects still hold subscriber clones of the Rc; snapshot instead
    // of unwrapping.
    let snapshot = outcome.borrow().clone();
    snapshot
}

fn run_scenario(
    kind: ScenarioKind,
    seed: u64,
    record: bool,
    output_path: Option<&std::path::Path>,
    replay_path: Option<&std::path::Path>,
) -> Result<()> {
    let scenario = Scenario::build(kind, seed);
    println!(
        "Running scenario '{}' (seed={}, duration={:.0}s)...",
        scenario.name, seed, scenario.duration_s
    );

    let start = std::time::Instant::now();
    let log = synthesize_log(&scenario);
    let mut engine = PdrEngine::new(EngineConfig::default());
    let outcome = drive_log(&mut engine, &log, record);
    let elapsed = start.elapsed();

    print_summary(&engine, &log, &outcome, elapsed.as_secs_f64());

    if let Some(rpath) = replay_path {
        save_log(&log, rpath)?;
        println!("Replay saved to {}", rpath.display());
    }

    if let Some(opath) = output_path {
        let json = metrics_json(&engine, &log, &outcome, elapsed.as_secs_f64());
        std::fs::write(opath, serde_json::to_string_pretty(&json)?)?;
        println!("Metrics saved to {}", opath.display());
    }

    // The engine teardown closes streams and cancels the inactivity timer.
    engine.dispose();
    Ok(())
}

fn run_replay(input: &std::path::Path, output_path: Option<&std::path::Path>) -> Result<()> {
    let log = load_log(input)?;
    println!(
        "Replaying '{}' ({} samples)...",
        log.scenario_name,
        log.samples.len()
    );

    let start = std::time::Instant::now();
    let mut engine = PdrEngine::new(EngineConfig::default());
    let outcome = drive_log(&mut engine, &log, true);
    let elapsed = start.elapsed();

    print_summary(&engine, &log, &outcome, elapsed.as_secs_f64());

    if let Some(opath) = output_path {
        let json = metrics_json(&engine, &log, &outcome, elapsed.as_secs_f64());
        std::fs::write(opath, serde_json::to_string_pretty(&json)?)?;
        println!("Metrics saved to {}", opath.display());
    }

    engine.dispose();
    Ok(())
}

fn print_summary(engine: &PdrEngine, log: &SampleLog, outcome: &DriveOutcome, elapsed_s: f64) {
    let pos = engine.position();
    let truth = log.final_position;
    let drift = ((pos.x - truth[0]).powi(2) + (pos.y - truth[1]).powi(2)).sqrt();

    println!(
        "Done: {} samples, {} steps detected ({} true), elapsed={:.2}s",
        log.samples.len(),
        engine.step_count(),
        log.true_steps,
        elapsed_s,
    );
    println!(
        "Position: engine=({:.2}, {:.2})  truth=({:.2}, {:.2})  drift={:.2}m",
        pos.x, pos.y, truth[0], truth[1], drift
    );
    if let Some((x, y)) = outcome.last_emitted {
        println!(
            "Last emitted position (snapped when snapping on): ({:.2}, {:.2})",
            x, y
        );
    }
    println!(
        "Graph: {} nodes, {} edges | {} path changes",
        engine.graph().node_count(),
        engine.graph().edge_count(),
        outcome.path_changes
    );

    if engine.has_path() {
        let route = engine.find_path(Vec2::zeros(), pos);
        println!("--- Route origin -> final position ---");
        for (i, p) in route.iter().enumerate() {
            println!("  {} ({:.2}, {:.2})", i, p.x, p.y);
        }
        println!("--------------------------------------");
    }
}

fn metrics_json(
    engine: &PdrEngine,
    log: &SampleLog,
    outcome: &DriveOutcome,
    elapsed_s: f64,
) -> serde_json::Value {
    let pos = engine.position();
    let stats = engine.stats();
    serde_json::json!({
        "scenario": log.scenario_name,
        "seed": log.seed,
        "elapsed_s": elapsed_s,
        "samples": log.samples.len(),
        "steps_detected": engine.step_count(),
        "steps_true": log.true_steps,
        "final_position": [pos.x, pos.y],
        "final_position_true": log.final_position,
        "graph": engine.graph().export(),
        "path_changes": outcome.path_changes,
        "positions_emitted": outcome.positions_emitted,
        "headings_emitted": outcome.headings_emitted,
        "dropped_samples": stats.dropped_samples,
    })
}
