//! Great-circle distance and local planar deviation.
//!
//! Every distance in the crate goes through [`haversine_m`] so that the
//! simplifier's tolerance, the trip distance and the chart's x axis agree.

/// Mean Earth radius used throughout, in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance between two (lat, lon) positions in degrees.
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).max(0.0).sqrt());
    EARTH_RADIUS_M * c
}

/// Longitude difference folded into [-180, 180] so that a chord crossing the
/// antimeridian is measured the short way round.
fn wrapped_dlon(from: f64, to: f64) -> f64 {
    let mut d = to - from;
    if d > 180.0 {
        d -= 360.0;
    } else if d < -180.0 {
        d += 360.0;
    }
    d
}

/// Equirectangular projection centered on a reference position. Longitude is
/// scaled by `cos(ref_lat)`; good to well under a meter for the chord lengths
/// a simplifier sees on a ride.
#[derive(Debug, Clone, Copy)]
pub struct LocalPlane {
    ref_lat: f64,
    ref_lon: f64,
    lon_scale: f64,
}

impl LocalPlane {
    pub fn new(ref_lat: f64, ref_lon: f64) -> Self {
        Self {
            ref_lat,
            ref_lon,
            lon_scale: ref_lat.to_radians().cos(),
        }
    }

    /// Plane centered on the midpoint of a chord.
    pub fn for_chord(a: (f64, f64), b: (f64, f64)) -> Self {
        let mid_lat = (a.0 + b.0) / 2.0;
        let mid_lon = a.1 + wrapped_dlon(a.1, b.1) / 2.0;
        Self::new(mid_lat, mid_lon)
    }

    /// (x east, y north) in meters.
    pub fn project(&self, lat: f64, lon: f64) -> (f64, f64) {
        let x = wrapped_dlon(self.ref_lon, lon).to_radians() * self.lon_scale * EARTH_RADIUS_M;
        let y = (lat - self.ref_lat).to_radians() * EARTH_RADIUS_M;
        (x, y)
    }
}

/// Distance in meters from `p` to the segment `a`-`b`, all (lat, lon).
///
/// Computed in a plane centered on the chord. When the chord collapses to a
/// point the haversine distance to `a` is returned instead.
pub fn segment_deviation_m(p: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    if a == b {
        return haversine_m(a.0, a.1, p.0, p.1);
    }
    let plane = LocalPlane::for_chord(a, b);
    let (ax, ay) = plane.project(a.0, a.1);
    let (bx, by) = plane.project(b.0, b.1);
    let (px, py) = plane.project(p.0, p.1);

    let (dx, dy) = (bx - ax, by - ay);
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return haversine_m(a.0, a.1, p.0, p.1);
    }
    let t = (((px - ax) * dx + (py - ay) * dy) / len_sq).clamp(0.0, 1.0);
    let (cx, cy) = (ax + t * dx, ay + t * dy);
    ((px - cx).powi(2) + (py - cy).powi(2)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{point, HaversineDistance};

    #[test]
    fn test_haversine_one_degree_at_equator() {
        let dist = haversine_m(0.0, 0.0, 0.0, 1.0);
        assert!((dist - 111_195.0).abs() < 1.0);
    }

    #[test]
    fn test_haversine_agrees_with_geo() {
        // geo uses a 6371.0088 km radius, so allow the ratio difference
        let ours = haversine_m(48.8566, 2.3522, 51.5074, -0.1278);
        let a = point!(x: 2.3522, y: 48.8566);
        let b = point!(x: -0.1278, y: 51.5074);
        let theirs = a.haversine_distance(&b);
        assert!((ours / theirs - 6_371_000.0 / 6_371_008.8).abs() < 1e-9);
    }

    #[test]
    fn test_haversine_zero_for_same_point() {
        assert_eq!(haversine_m(45.0, 7.0, 45.0, 7.0), 0.0);
    }

    #[test]
    fn test_deviation_scales_longitude_by_latitude() {
        // 0.001 deg of longitude off a north-south chord at 60N is ~55.6 m,
        // not the ~111 m a degree-space distance would imply
        let a = (59.99, 10.0);
        let b = (60.01, 10.0);
        let p = (60.0, 10.001);
        let d = segment_deviation_m(p, a, b);
        let expected = 0.001_f64.to_radians() * 60.0_f64.to_radians().cos() * EARTH_RADIUS_M;
        assert!((d - expected).abs() < 0.05, "got {d}, expected {expected}");
    }

    #[test]
    fn test_deviation_beyond_chord_end_uses_endpoint() {
        let a = (0.0, 0.0);
        let b = (0.0, 0.001);
        let p = (0.0, 0.002);
        let d = segment_deviation_m(p, a, b);
        let expected = haversine_m(0.0, 0.001, 0.0, 0.002);
        assert!((d - expected).abs() < 0.01);
    }

    #[test]
    fn test_deviation_across_antimeridian() {
        let a = (0.0, 179.9995);
        let b = (0.0, -179.9995);
        let p = (0.0001, 180.0);
        let d = segment_deviation_m(p, a, b);
        let expected = 0.0001_f64.to_radians() * EARTH_RADIUS_M;
        assert!((d - expected).abs() < 0.05, "got {d}");
    }

    #[test]
    fn test_degenerate_chord_falls_back_to_point_distance() {
        let a = (45.0, 7.0);
        let p = (45.001, 7.0);
        let d = segment_deviation_m(p, a, a);
        assert!((d - haversine_m(45.0, 7.0, 45.001, 7.0)).abs() < 1e-9);
    }
}
