//! Chart-ready elevation profile.
//!
//! The downsampling is a strided pick, not an average: a spike that falls
//! between picked indices disappears from the chart, and one that lands on a
//! picked index is drawn at full height. Good enough for a chart, not for
//! reading off precise values.

use serde::Serialize;
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::geodesy::haversine_m;
use crate::segmenter::is_gap;
use crate::track::Track;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ElevationProfilePoint {
    /// Rounded to 0.1 km.
    pub cumulative_distance_km: f64,
    /// Truncated toward zero to whole meters.
    pub elevation_m: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElevationProfile {
    pub points: Vec<ElevationProfilePoint>,
    pub cap: usize,
    /// Length of the full series before downsampling.
    pub source_len: usize,
    /// Index step used for the pick; 1.0 when no downsampling happened.
    pub stride: f64,
}

impl ElevationProfile {
    pub fn is_downsampled(&self) -> bool {
        self.source_len > self.cap
    }
}

/// Full-resolution (distance km, elevation m) series. Distance accumulates
/// over every sample, with or without elevation, but not across gaps.
fn full_series(track: &Track, gap_threshold_s: i64) -> Vec<(f64, f64)> {
    let samples = track.samples();
    samples
        .iter()
        .enumerate()
        .scan(0.0_f64, |dist_m, (i, s)| {
            if i > 0 {
                let prev = &samples[i - 1];
                if !is_gap(prev, s, gap_threshold_s) {
                    *dist_m += haversine_m(prev.lat(), prev.lon(), s.lat(), s.lon());
                }
            }
            Some(s.elevation().map(|e| (*dist_m / 1000.0, e)))
        })
        .flatten()
        .collect()
}

fn chart_point((km, ele): (f64, f64)) -> ElevationProfilePoint {
    ElevationProfilePoint {
        cumulative_distance_km: (km * 10.0).round() / 10.0,
        elevation_m: ele as i32,
    }
}

pub fn build_profile(track: &Track, gap_threshold_s: i64, cap: usize) -> Result<ElevationProfile> {
    if cap == 0 {
        return Err(PipelineError::invalid("profile", "chart_point_cap", cap));
    }
    let series = full_series(track, gap_threshold_s);
    let source_len = series.len();

    let (points, stride) = if source_len > cap {
        let stride = source_len as f64 / cap as f64;
        let picked = (0..cap)
            .map(|i| chart_point(series[(i as f64 * stride) as usize]))
            .collect();
        (picked, stride)
    } else {
        (series.into_iter().map(chart_point).collect(), 1.0)
    };

    debug!(source_len, cap, stride, "built elevation profile");
    Ok(ElevationProfile {
        points,
        cap,
        source_len,
        stride,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::fixtures::{sample, sample_ele};
    use crate::sample::Sample;

    const GAP: i64 = 5 * 3600;

    fn long_track(n: usize) -> Track {
        let samples: Vec<Sample> = (0..n)
            .map(|i| sample_ele(i as i64, 0.0, i as f64 * 0.0001, 100.0 + (i % 50) as f64))
            .collect();
        Track::from_sorted(samples)
    }

    #[test]
    fn test_short_series_is_kept_whole() {
        let track = Track::from_sorted(vec![
            sample_ele(0, 0.0, 0.0, 100.7),
            sample(10, 0.0, 0.005),
            sample_ele(20, 0.0, 0.01, 120.2),
        ]);
        let profile = build_profile(&track, GAP, 400).unwrap();
        assert_eq!(profile.source_len, 2);
        assert!(!profile.is_downsampled());
        assert_eq!(profile.points[0], ElevationProfilePoint { cumulative_distance_km: 0.0, elevation_m: 100 });
        // distance through the elevation-less sample still counts: 0.01 deg ~ 1.1 km
        assert_eq!(profile.points[1].cumulative_distance_km, 1.1);
        assert_eq!(profile.points[1].elevation_m, 120);
    }

    #[test]
    fn test_long_series_capped_with_uniform_stride() {
        let track = long_track(1000);
        let profile = build_profile(&track, GAP, 400).unwrap();
        assert_eq!(profile.points.len(), 400);
        assert_eq!(profile.source_len, 1000);
        assert_eq!(profile.stride, 2.5);
        // i = 3 -> index floor(7.5) = 7 -> elevation 107
        assert_eq!(profile.points[3].elevation_m, 107);
        assert!(profile
            .points
            .windows(2)
            .all(|w| w[0].cumulative_distance_km <= w[1].cumulative_distance_km));
    }

    #[test]
    fn test_exactly_cap_is_not_downsampled() {
        let profile = build_profile(&long_track(400), GAP, 400).unwrap();
        assert_eq!(profile.points.len(), 400);
        assert_eq!(profile.stride, 1.0);
    }

    #[test]
    fn test_gap_distance_not_accumulated() {
        let day = 24 * 3600;
        let track = Track::from_sorted(vec![
            sample_ele(0, 0.0, 0.0, 10.0),
            sample_ele(day, 5.0, 5.0, 20.0),
        ]);
        let profile = build_profile(&track, GAP, 400).unwrap();
        assert_eq!(profile.points[1].cumulative_distance_km, 0.0);
    }

    #[test]
    fn test_no_elevation_gives_empty_profile() {
        let track = Track::from_sorted(vec![sample(0, 0.0, 0.0), sample(1, 0.0, 0.001)]);
        let profile = build_profile(&track, GAP, 400).unwrap();
        assert!(profile.points.is_empty());
    }

    #[test]
    fn test_zero_cap_rejected() {
        let track = long_track(3);
        assert!(build_profile(&track, GAP, 0).is_err());
    }
}
