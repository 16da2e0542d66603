//! Trip statistics: distance, moving time and filtered elevation gain.
//!
//! Pairs of consecutive samples separated by more than the segment gap
//! threshold are recording breaks, not travel, and are left out of every sum.
//!
//! Elevation uses a deadband: a reference elevation is held until a sample
//! differs from it by more than the noise floor, at which point the whole
//! difference is booked as gain (or loss) and the reference moves. Slow
//! steady climbs still accumulate because the reference does not follow the
//! noise. With a 3 m floor, `[100, 101, 100, 105, 95]` gives 5 m gain and
//! 10 m loss.

use serde::Serialize;
use tracing::info;

use crate::config::{AnalyticsSource, PipelineConfig};
use crate::geodesy::haversine_m;
use crate::segmenter::is_gap;
use crate::track::Track;

/// Pairs closer in time than this have no meaningful speed and count as
/// stopped.
pub const MIN_PAIR_DURATION_S: f64 = 1e-3;

/// The constants the numbers below were computed with.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AppliedFilters {
    pub source: AnalyticsSource,
    pub stopped_speed_threshold_mps: f64,
    pub elevation_noise_floor_m: f64,
    pub segment_gap_threshold_s: i64,
    pub min_pair_duration_s: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TripStats {
    pub total_distance_m: f64,
    pub moving_distance_m: f64,
    pub moving_time_s: f64,
    /// Time covered by non-gap pairs, stopped or not.
    pub elapsed_time_s: f64,
    pub elevation_gain_m: f64,
    pub elevation_loss_m: f64,
    pub segment_count: usize,
    pub filters: AppliedFilters,
}

impl TripStats {
    pub fn average_moving_speed_kmh(&self) -> f64 {
        if self.moving_time_s <= 0.0 {
            return 0.0;
        }
        self.moving_distance_m / self.moving_time_s * 3.6
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Motion {
    total_distance_m: f64,
    moving_distance_m: f64,
    moving_time_s: f64,
    elapsed_time_s: f64,
}

fn motion(track: &Track, stopped_speed_mps: f64, gap_threshold_s: i64) -> Motion {
    track
        .samples()
        .windows(2)
        .filter(|w| !is_gap(&w[0], &w[1], gap_threshold_s))
        .fold(Motion::default(), |acc, w| {
            let (a, b) = (&w[0], &w[1]);
            let d = haversine_m(a.lat(), a.lon(), b.lat(), b.lon());
            let dt = a.seconds_until(b);
            let moving = dt > MIN_PAIR_DURATION_S && d / dt > stopped_speed_mps;
            Motion {
                total_distance_m: acc.total_distance_m + d,
                elapsed_time_s: acc.elapsed_time_s + dt.max(0.0),
                moving_distance_m: acc.moving_distance_m + if moving { d } else { 0.0 },
                moving_time_s: acc.moving_time_s + if moving { dt } else { 0.0 },
            }
        })
}

#[derive(Debug, Default, Clone, Copy)]
struct Deadband {
    reference: Option<f64>,
    gain: f64,
    loss: f64,
}

impl Deadband {
    fn step(self, elevation: f64, floor: f64) -> Self {
        let Some(reference) = self.reference else {
            return Deadband { reference: Some(elevation), ..self };
        };
        let delta = elevation - reference;
        if delta > floor {
            Deadband { reference: Some(elevation), gain: self.gain + delta, ..self }
        } else if delta < -floor {
            Deadband { reference: Some(elevation), loss: self.loss - delta, ..self }
        } else {
            self
        }
    }

    fn reset(self) -> Self {
        Deadband { reference: None, ..self }
    }
}

/// Gain and loss of an elevation series through the deadband filter.
pub fn deadband_gain_loss(elevations: &[f64], noise_floor_m: f64) -> (f64, f64) {
    let band = elevations
        .iter()
        .fold(Deadband::default(), |band, &e| band.step(e, noise_floor_m));
    (band.gain, band.loss)
}

/// Gain and loss over the samples that carry elevation. The reference is
/// dropped at every recording break so a jump between days is not counted.
fn track_gain_loss(track: &Track, noise_floor_m: f64, gap_threshold_s: i64) -> (f64, f64) {
    let samples = track.samples();
    let band = samples.iter().enumerate().fold(Deadband::default(), |band, (i, s)| {
        let band = if i > 0 && is_gap(&samples[i - 1], s, gap_threshold_s) {
            band.reset()
        } else {
            band
        };
        match s.elevation() {
            Some(e) => band.step(e, noise_floor_m),
            None => band,
        }
    });
    (band.gain, band.loss)
}

/// Compute the trip statistics for `track`. `source` only labels which track
/// the caller passed in; the numbers are computed from `track` as given.
pub fn compute_stats(
    track: &Track,
    segment_count: usize,
    config: &PipelineConfig,
    source: AnalyticsSource,
) -> TripStats {
    let gap = config.segment_gap_threshold_s;
    let m = motion(track, config.stopped_speed_threshold_mps, gap);
    let (gain, loss) = track_gain_loss(track, config.elevation_noise_floor_m, gap);

    let stats = TripStats {
        total_distance_m: m.total_distance_m,
        moving_distance_m: m.moving_distance_m,
        moving_time_s: m.moving_time_s,
        elapsed_time_s: m.elapsed_time_s,
        elevation_gain_m: gain,
        elevation_loss_m: loss,
        segment_count,
        filters: AppliedFilters {
            source,
            stopped_speed_threshold_mps: config.stopped_speed_threshold_mps,
            elevation_noise_floor_m: config.elevation_noise_floor_m,
            segment_gap_threshold_s: gap,
            min_pair_duration_s: MIN_PAIR_DURATION_S,
        },
    };

    info!(
        source = ?source,
        distance_km = stats.total_distance_m / 1000.0,
        moving_km = stats.moving_distance_m / 1000.0,
        moving_time_s = stats.moving_time_s,
        gain_m = stats.elevation_gain_m,
        noise_floor_m = config.elevation_noise_floor_m,
        "computed trip stats"
    );
    stats
}

/// "3h 07m" style duration, minutes truncated.
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{}h {:02}m", total / 3600, (total % 3600) / 60)
}
