//! Equirectangular mapping between the local East-North frame and geodetic
//! coordinates.
//!
//! This is a collaborator for display layers; the engine core neither
//! performs nor depends on this mapping. The approximation is valid for the
//! short ranges a walking session covers.
//!
//! Note: the mapping treats local +y as north, while the dead-reckoning
//! integrator uses a screen-oriented y axis (see DESIGN.md). Callers convert
//! deliberately.

use crate::types::Vec2;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A configurable geodetic origin for the local frame.
#[derive(Clone, Copy, Debug)]
pub struct GeoOrigin {
    pub lat_deg: f64,
    pub lon_deg: f64,
}

impl GeoOrigin {
    pub fn new(lat_deg: f64, lon_deg: f64) -> Self {
        Self { lat_deg, lon_deg }
    }

    /// Map a local offset (meters East, meters North) to (lat, lon) degrees.
    pub fn to_geodetic(&self, local: Vec2) -> (f64, f64) {
        let lat0 = self.lat_deg.to_radians();
        let dlat = local.y / EARTH_RADIUS_M;
        let dlon = local.x / (EARTH_RADIUS_M * lat0.cos());
        (
            self.lat_deg + dlat.to_degrees(),
            self.lon_deg + dlon.to_degrees(),
        )
    }

    /// Map (lat, lon) degrees back to a local offset in meters.
    pub fn to_local(&self, lat_deg: f64, lon_deg: f64) -> Vec2 {
        let lat0 = self.lat_deg.to_radians();
        let y = (lat_deg - self.lat_deg).to_radians() * EARTH_RADIUS_M;
        let x = (lon_deg - self.lon_deg).to_radians() * EARTH_RADIUS_M * lat0.cos();
        Vec2::new(x, y)
    }
}
