//! Douglas–Peucker simplification on geographic coordinates.
//!
//! Deviation is measured in meters against the chord between the current
//! anchor and floater, in a local plane centered on that chord (see
//! [`segment_deviation_m`]). Raw degree space is never used, so the same
//! tolerance means the same thing at the equator and at 60°N.
//!
//! The track is first cut at time anchors: both sides of every recording gap,
//! plus enough intermediate samples that consecutive anchors are never more
//! than the gap threshold apart. Douglas–Peucker then runs between each pair
//! of anchors. The anchor set does not depend on the tolerance, so two kept
//! samples are more than the gap threshold apart only where the recording
//! itself broke.

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::geodesy::segment_deviation_m;
use crate::segmenter::is_gap;
use crate::track::Track;

#[derive(Debug, Clone, Serialize)]
pub struct Simplified {
    pub track: Track,
    pub tolerance_m: f64,
    pub gap_threshold_s: i64,
    pub input_len: usize,
    /// Input had ≤ 2 points or all points coincide; returned unchanged.
    pub degenerate: bool,
}

impl Simplified {
    pub fn reduction_percent(&self) -> f64 {
        if self.input_len == 0 {
            return 0.0;
        }
        (1.0 - self.track.len() as f64 / self.input_len as f64) * 100.0
    }
}

/// Indices kept by Douglas–Peucker for `positions` at tolerance `epsilon_m`.
/// Always contains the first and last index. Iterative so deep recursion on
/// long tracks cannot overflow the stack.
fn retained_indices(positions: &[(f64, f64)], epsilon_m: f64) -> Vec<usize> {
    let n = positions.len();
    if n <= 2 {
        return (0..n).collect();
    }

    let mut keep = vec![false; n];
    keep[0] = true;
    keep[n - 1] = true;
    let mut stack = vec![(0usize, n - 1)];

    while let Some((first, last)) = stack.pop() {
        if last - first < 2 {
            continue;
        }
        let (a, b) = (positions[first], positions[last]);
        let mut max_dev = 0.0;
        let mut max_idx = first;
        for (i, &p) in positions.iter().enumerate().take(last).skip(first + 1) {
            let dev = segment_deviation_m(p, a, b);
            if dev > max_dev {
                max_dev = dev;
                max_idx = i;
            }
        }
        if max_dev > epsilon_m {
            keep[max_idx] = true;
            stack.push((max_idx, last));
            stack.push((first, max_idx));
        }
    }

    keep.iter()
        .enumerate()
        .filter_map(|(i, &k)| k.then_some(i))
        .collect()
}

/// Samples that survive at any tolerance. Walking from the first sample, the
/// next anchor is the farthest sample still within `gap_threshold_s` of the
/// current one, or the very next sample when that step is itself a gap.
fn anchor_indices(track: &Track, gap_threshold_s: i64) -> Vec<usize> {
    let samples = track.samples();
    let n = samples.len();
    let mut anchors = vec![0];
    let mut anchor = 0;

    while anchor + 1 < n {
        let mut next = anchor + 1;
        while next + 1 < n && !is_gap(&samples[anchor], &samples[next + 1], gap_threshold_s) {
            next += 1;
        }
        anchors.push(next);
        anchor = next;
    }
    anchors
}

/// Reduce `track` so no removed point lies farther than `tolerance_m` from
/// the polyline through the retained ones. The output is a subsequence of
/// the input with both endpoints kept, and it never introduces a step longer
/// than `gap_threshold_s` that the input did not already have.
pub fn simplify(track: &Track, tolerance_m: f64, gap_threshold_s: i64) -> Result<Simplified> {
    if !tolerance_m.is_finite() || tolerance_m <= 0.0 {
        return Err(PipelineError::invalid(
            "simplify",
            "simplification_tolerance_m",
            tolerance_m,
        ));
    }
    if gap_threshold_s <= 0 {
        return Err(PipelineError::invalid(
            "simplify",
            "segment_gap_threshold_s",
            gap_threshold_s,
        ));
    }

    let input_len = track.len();
    let positions: Vec<(f64, f64)> = track.iter().map(|s| s.position()).collect();
    let all_coincident = positions.windows(2).all(|w| w[0] == w[1]);

    if input_len <= 2 || all_coincident {
        debug!(points = input_len, "degenerate geometry, simplification skipped");
        return Ok(Simplified {
            track: track.clone(),
            tolerance_m,
            gap_threshold_s,
            input_len,
            degenerate: true,
        });
    }

    let anchors = anchor_indices(track, gap_threshold_s);
    let mut indices = vec![0];
    for w in anchors.windows(2) {
        let (a, b) = (w[0], w[1]);
        indices.extend(
            retained_indices(&positions[a..=b], tolerance_m)
                .into_iter()
                .skip(1)
                .map(|i| i + a),
        );
    }

    let simplified = track.subsequence(&indices);
    info!(
        tolerance_m,
        anchors = anchors.len(),
        before = input_len,
        after = simplified.len(),
        "simplified track"
    );

    Ok(Simplified {
        track: simplified,
        tolerance_m,
        gap_threshold_s,
        input_len,
        degenerate: false,
    })
}
