//! Fundamental types used across the entire workspace.

use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Scalar type: f64 throughout for numerical precision in the heading filter
// and the graph geometry.
// ---------------------------------------------------------------------------

/// 2-D local position / direction (meters, local East-North frame).
pub type Vec2 = Vector2<f64>;

/// Tri-axial sensor vector (device axes).
pub type Vec3 = Vector3<f64>;

// ---------------------------------------------------------------------------
// Identifier types: newtype wrappers so IDs are never confused at compile time
// ---------------------------------------------------------------------------

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct NodeId(pub u64);

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct EdgeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N{}", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Sensor samples
// ---------------------------------------------------------------------------

/// A single timestamped tri-axial sensor reading.
///
/// Components are stored as a plain array so the type serializes without
/// pulling nalgebra into the wire format; [`SensorSample::vec`] converts to
/// [`Vec3`] for the math paths.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SensorSample {
    /// Wall-clock timestamp, milliseconds since epoch.
    pub timestamp_ms: u64,
    /// Component values in device axes.
    pub v: [f64; 3],
}

impl SensorSample {
    pub fn new(timestamp_ms: u64, v: [f64; 3]) -> Self {
        Self { timestamp_ms, v }
    }

    /// Component values as a nalgebra vector.
    pub fn vec(&self) -> Vec3 {
        Vec3::new(self.v[0], self.v[1], self.v[2])
    }

    /// All three components are finite (no NaN, no Inf).
    pub fn is_finite(&self) -> bool {
        self.v.iter().all(|c| c.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_display_with_prefix() {
        assert_eq!(NodeId(3).to_string(), "N3");
        assert_eq!(EdgeId(17).to_string(), "E17");
    }

    #[test]
    fn sample_finite_check_rejects_nan_and_inf() {
        assert!(SensorSample::new(0, [0.0, 1.0, 9.8]).is_finite());
        assert!(!SensorSample::new(0, [f64::NAN, 1.0, 9.8]).is_finite());
        assert!(!SensorSample::new(0, [0.0, f64::INFINITY, 9.8]).is_finite());
    }
}
