//! Geometry helpers for site area and flight path length.
//!
//! Both functions are planar/spherical approximations suitable for survey
//! sites a few kilometres across.

use crate::models::Position;

/// Mean Earth radius used for great-circle distances.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Area of a polygon ring using the Shoelace formula.
///
/// Vertices are `(x, y)` pairs, by convention `(lng, lat)`. The ring may be
/// open or closed; the wraparound edge is always included, and a repeated
/// closing vertex contributes nothing. Rings with fewer than 3 vertices have
/// zero area. No geodesic correction is applied.
pub fn polygon_area(ring: &[(f64, f64)]) -> f64 {
    let n = ring.len();
    if n < 3 {
        return 0.0;
    }

    let twice_area: f64 = (0..n)
        .map(|i| {
            let (x1, y1) = ring[i];
            let (x2, y2) = ring[(i + 1) % n];
            x1 * y2 - y1 * x2
        })
        .sum();

    twice_area.abs() / 2.0
}

/// Great-circle distance between two points in meters (haversine).
///
/// The Earth is treated as a sphere of radius [`EARTH_RADIUS_M`]. Results
/// differ from the WGS-84 ellipsoidal geodesic by up to about 0.6%, largest
/// along meridians near the equator and the poles. Callers needing survey-grade
/// lengths should use a geodesic library instead.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Cumulative ground-track length of a path in meters.
///
/// Altitude is ignored: this is 2D distance along the surface, not slant
/// range. Paths with fewer than 2 points have zero length. Each segment is a
/// [`haversine_distance`], so the same spherical error bound applies.
pub fn path_distance(points: &[Position]) -> f64 {
    points
        .windows(2)
        .map(|pair| haversine_distance(pair[0].lat, pair[0].lng, pair[1].lat, pair[1].lng))
        .sum()
}
