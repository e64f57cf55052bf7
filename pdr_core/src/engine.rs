//! Engine orchestrator: glues ingress, step detection, heading estimation
//! and the path manager into the dead-reckoning loop.
//!
//! # Processing per accelerometer sample
//! 1. Poll the inactivity deadline against the sample clock
//! 2. Low-pass filter through ingress (drops non-finite samples)
//! 3. Recompute heading from the latest accel/mag pair, emit
//! 4. Run step detection on the filtered magnitude
//! 5. On a step: integrate position, record, snap, emit count then position
//!
//! # Scheduling model
//! Single-threaded cooperative: every handler runs to completion on the host
//! event loop. The 2 s inactivity timer is a stored deadline polled on each
//! sample arrival and via [`PdrEngine::poll_timer`]; there is no timer
//! thread. Subscribers must not re-enter engine mutators synchronously.

use crate::events::Subject;
use crate::heading::{HeadingConfig, HeadingEstimator};
use crate::ingress::{IngressConfig, SensorIngress};
use crate::path_manager::{PathManager, PathManagerConfig};
use crate::steps::{StepDetector, StepDetectorConfig};
use crate::types::{SensorSample, Vec2};
use tracing::{debug, info};

/// Configuration for the whole engine.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Fixed stride length per detected step (m).
    pub stride_m: f64,
    /// Recording inactivity window before a segment auto-finalizes (ms).
    pub inactivity_timeout_ms: u64,
    pub ingress: IngressConfig,
    pub steps: StepDetectorConfig,
    pub heading: HeadingConfig,
    pub paths: PathManagerConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stride_m: 0.7,
            inactivity_timeout_ms: 2000,
            ingress: IngressConfig::default(),
            steps: StepDetectorConfig::default(),
            heading: HeadingConfig::default(),
            paths: PathManagerConfig::default(),
        }
    }
}

/// Counters exposed for display and batch summaries.
#[derive(Clone, Copy, Debug, Default)]
pub struct EngineStats {
    pub accel_samples: u64,
    pub mag_samples: u64,
    pub dropped_samples: u64,
    pub steps: u64,
    pub finalized_segments: u64,
    pub rejected_finalizes: u64,
    pub splits: u64,
    pub path_changes: u64,
}

/// The dead-reckoning engine.
///
/// Owns every sub-component and all output subjects. Created once; lives as
/// long as the host needs it; [`PdrEngine::dispose`] tears it down.
pub struct PdrEngine {
    config: EngineConfig,
    ingress: SensorIngress,
    steps: StepDetector,
    heading: HeadingEstimator,
    paths: PathManager,

    /// Dead-reckoned position in the local frame (origin = position at start).
    position: Vec2,
    current_heading: f64,
    recording: bool,
    snapping: bool,
    running: bool,
    disposed: bool,
    /// Pending inactivity deadline (ms), None when the timer is idle.
    inactivity_deadline_ms: Option<u64>,

    /// Estimated positions (snapped when snapping is enabled).
    pub position_out: Subject<Vec2>,
    /// Filtered heading, radians in (-pi, pi].
    pub heading_out: Subject<f64>,
    /// Monotonic step count, from 0.
    pub step_count_out: Subject<u64>,
    /// Unit event per graph mutation (finalize or split).
    pub path_changed: Subject<()>,

    stats: EngineStats,
}

impl PdrEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            ingress: SensorIngress::new(config.ingress.clone()),
            steps: StepDetector::new(config.steps.clone()),
            heading: HeadingEstimator::new(config.heading.clone()),
            paths: PathManager::new(config.paths.clone()),
            config,
            position: Vec2::zeros(),
            current_heading: 0.0,
            recording: false,
            snapping: false,
            running: false,
            disposed: false,
            inactivity_deadline_ms: None,
            position_out: Subject::new(),
            heading_out: Subject::new(),
            step_count_out: Subject::new(),
            path_changed: Subject::new(),
            stats: EngineStats::default(),
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Begin a session. The local frame origin is the position at start:
    /// kinematic state resets, the graph persists.
    pub fn start(&mut self) {
        if self.disposed || self.running {
            return;
        }
        self.position = Vec2::zeros();
        self.current_heading = 0.0;
        self.steps.reset();
        self.heading.reset();
        self.ingress.reset();
        self.inactivity_deadline_ms = None;
        self.stats = EngineStats::default();
        self.running = true;
        info!("engine started");
    }

    /// Stop the session. Filter state clears so a subsequent start begins
    /// from the next sample; the graph persists.
    pub fn stop(&mut self) {
        if self.disposed || !self.running {
            return;
        }
        self.running = false;
        self.inactivity_deadline_ms = None;
        self.ingress.reset();
        info!("engine stopped");
    }

    /// Tear down: close output streams, drop sensor subscriptions, cancel
    /// timers, in that order. Idempotent.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.running = false;
        self.position_out.close();
        self.heading_out.close();
        self.step_count_out.close();
        self.path_changed.close();
        self.ingress.close();
        self.inactivity_deadline_ms = None;
        info!("engine disposed");
    }

    // -----------------------------------------------------------------------
    // Sensor input
    // -----------------------------------------------------------------------

    pub fn on_accelerometer(&mut self, sample: SensorSample) {
        if !self.running || self.disposed {
            return;
        }
        self.poll_timer(sample.timestamp_ms);

        let filtered = match self.ingress.on_accelerometer(sample) {
            Some(f) => f,
            None => {
                self.stats.dropped_samples += 1;
                return;
            }
        };
        self.stats.accel_samples += 1;

        if let Some(h) = self.heading.on_accelerometer(filtered.vec()) {
            self.current_heading = h;
            self.heading_out.emit(h);
        }

        if let Some(count) = self.steps.process(filtered.timestamp_ms, filtered.vec()) {
            self.handle_step(filtered.timestamp_ms, count);
        }
    }

    pub fn on_magnetometer(&mut self, sample: SensorSample) {
        if !self.running || self.disposed {
            return;
        }
        self.poll_timer(sample.timestamp_ms);

        let forwarded = match self.ingress.on_magnetometer(sample) {
            Some(f) => f,
            None => {
                self.stats.dropped_samples += 1;
                return;
            }
        };
        self.stats.mag_samples += 1;

        if let Some(h) = self.heading.on_magnetometer(forwarded.vec()) {
            self.current_heading = h;
            self.heading_out.emit(h);
        }
    }

    /// Gyroscope is accepted for possible future fusion; unused by the core.
    pub fn on_gyroscope(&mut self, sample: SensorSample) {
        if !self.running || self.disposed {
            return;
        }
        self.ingress.on_gyroscope(sample);
    }

    // -----------------------------------------------------------------------
    // Step handling
    // -----------------------------------------------------------------------

    fn handle_step(&mut self, now_ms: u64, count: u64) {
        // Dead-reckoning update: +x east; the y sign keeps the historical
        // screen-oriented axis (see DESIGN.md, axis convention).
        let h = self.current_heading;
        self.position.x += self.config.stride_m * h.sin();
        self.position.y -= self.config.stride_m * h.cos();
        self.stats.steps = count;

        if self.recording {
            self.paths.record_step(self.position);
            self.arm_timer(now_ms);
        }

        // Snapping constrains only the emitted position, never the
        // dead-reckoned state.
        let emitted = if self.snapping && self.paths.has_path() {
            self.paths.snap(self.position, true)
        } else {
            self.position
        };

        // Observers see the count first, then the matching position.
        self.step_count_out.emit(count);
        self.position_out.emit(emitted);
    }

    // -----------------------------------------------------------------------
    // Inactivity timer (polled deadline)
    // -----------------------------------------------------------------------

    fn arm_timer(&mut self, now_ms: u64) {
        self.inactivity_deadline_ms = Some(now_ms + self.config.inactivity_timeout_ms);
    }

    /// Fire the inactivity auto-finalize when its deadline has passed.
    /// Called on every sample arrival; hosts without a steady sample stream
    /// should call it from their own timer tick.
    pub fn poll_timer(&mut self, now_ms: u64) {
        match self.inactivity_deadline_ms {
            Some(d) if now_ms >= d => {}
            _ => return,
        }
        self.inactivity_deadline_ms = None;
        if !self.recording {
            return;
        }
        // Auto-finalize: remain in recording mode; the next step starts a
        // new segment. A rejected finalize keeps the buffer for continuation.
        if self.paths.finalize_segment() {
            self.stats.finalized_segments += 1;
            self.emit_path_changed();
            debug!("inactivity finalize");
        } else {
            self.stats.rejected_finalizes += 1;
        }
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Toggle trail recording.
    ///
    /// Turning recording on disables snapping and tries to split the nearest
    /// edge at the current position so the new trail hangs off the existing
    /// path. Turning it off cancels the timer, finalizes the trail, clears
    /// the buffer and re-enables snapping.
    pub fn toggle_recording(&mut self) {
        if self.disposed {
            return;
        }
        if !self.recording {
            self.recording = true;
            self.snapping = false;
            if self.paths.prepare_for_new_recording(self.position).is_some() {
                self.stats.splits += 1;
                self.emit_path_changed();
            }
            info!("recording started");
        } else {
            self.recording = false;
            self.inactivity_deadline_ms = None;
            let changed = self.paths.finalize_segment();
            self.paths.clear_buffer();
            if changed {
                self.stats.finalized_segments += 1;
                self.emit_path_changed();
            } else {
                self.stats.rejected_finalizes += 1;
            }
            self.snapping = true;
            info!(changed, "recording stopped");
        }
    }

    /// Toggle output snapping onto the path graph.
    pub fn toggle_snapping(&mut self) {
        if self.disposed {
            return;
        }
        self.snapping = !self.snapping;
    }

    /// Shortest walkable route between two local positions; `[end]` when no
    /// routing is possible.
    pub fn find_path(&self, start: Vec2, end: Vec2) -> Vec<Vec2> {
        self.paths.find_path(start, end)
    }

    fn emit_path_changed(&mut self) {
        self.stats.path_changes += 1;
        self.path_changed.emit(());
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn is_snapping(&self) -> bool {
        self.snapping
    }

    pub fn has_path(&self) -> bool {
        self.paths.has_path()
    }

    pub fn graph(&self) -> &crate::graph::PathGraph {
        self.paths.graph()
    }

    /// Current dead-reckoned position (never overwritten by snapping).
    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn heading(&self) -> f64 {
        self.current_heading
    }

    pub fn step_count(&self) -> u64 {
        self.steps.count()
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
