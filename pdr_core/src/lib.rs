//! `pdr_core` — Pedestrian dead reckoning with a walkable-path graph.
//!
//! Converts raw accelerometer and magnetometer streams into 2-D position
//! estimates, and maintains a user-recorded graph of walkable paths that the
//! estimates can be snapped to or routed over.
//!
//! # Module layout
//! - [`types`]        — Fundamental types (vectors, ids, sensor samples)
//! - [`events`]       — Broadcast subjects (synchronous observer registry)
//! - [`ingress`]      — Low-pass filtering of the raw sensor streams
//! - [`steps`]        — Step detection (magnitude peaks, refractory timing)
//! - [`heading`]      — Tilt-compensated heading, circular Kalman filter
//! - [`graph`]        — Walkable-path graph (nodes, edges, adjacency)
//! - [`path_manager`] — Record, finalize (PCA), snap, split, route
//! - [`engine`]       — Orchestrator and command surface
//! - [`geo`]          — Equirectangular local/geodetic mapping (collaborator)

pub mod engine;
pub mod events;
pub mod geo;
pub mod graph;
pub mod heading;
pub mod ingress;
pub mod path_manager;
pub mod steps;
pub mod types;

pub use engine::{EngineConfig, EngineStats, PdrEngine};
pub use events::Subject;
pub use graph::{Edge, GraphExport, Node, PathGraph};
pub use heading::{HeadingConfig, HeadingEstimator};
pub use ingress::{IngressConfig, SensorIngress};
pub use path_manager::{PathManager, PathManagerConfig};
pub use steps::{StepDetector, StepDetectorConfig};
pub use types::{EdgeId, NodeId, SensorSample, Vec2, Vec3};
