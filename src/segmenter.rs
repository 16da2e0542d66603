//! Split a track into day segments at recording gaps.

use std::ops::Range;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::sample::Sample;
use crate::track::Track;

/// A contiguous run of the track with no internal gap above the threshold.
#[derive(Debug, Clone, Serialize)]
pub struct Segment {
    /// Dense, 0-based, chronological over emitted segments only.
    pub index: usize,
    /// UTC date of the first sample.
    pub start_date: NaiveDate,
    /// Position of the run in the segmented track.
    pub range: Range<usize>,
    pub samples: Vec<Sample>,
}

impl Segment {
    pub fn label(&self) -> String {
        format!("Day {}: {}", self.index + 1, self.start_date.format("%Y-%m-%d"))
    }
}

/// Connector across a recording break, for drawing a dashed jump line.
/// Never simplified or counted in analytics.
#[derive(Debug, Clone, Serialize)]
pub struct Bridge {
    pub from: Sample,
    pub to: Sample,
    pub gap_s: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Segmentation {
    pub segments: Vec<Segment>,
    pub bridges: Vec<Bridge>,
    pub gap_threshold_s: i64,
}

impl Segmentation {
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }
}

/// True when the step from `a` to `b` is a recording break.
pub(crate) fn is_gap(a: &Sample, b: &Sample, gap_threshold_s: i64) -> bool {
    (b.timestamp() - a.timestamp()).num_milliseconds() > gap_threshold_s.saturating_mul(1000)
}

/// Runs of the track between gaps, each tagged with whether a gap closed it.
fn runs(samples: &[Sample], gap_threshold_s: i64) -> Vec<(Range<usize>, bool)> {
    let breaks: Vec<usize> = (1..samples.len())
        .filter(|&i| is_gap(&samples[i - 1], &samples[i], gap_threshold_s))
        .collect();

    let starts = std::iter::once(0).chain(breaks.iter().copied());
    let ends = breaks.iter().map(|&b| (b, true)).chain(std::iter::once((samples.len(), false)));
    starts
        .zip(ends)
        .map(|(start, (end, by_gap))| (start..end, by_gap))
        .filter(|(range, _)| !range.is_empty())
        .collect()
}

pub fn segment(track: &Track, gap_threshold_s: i64) -> Result<Segmentation> {
    if gap_threshold_s <= 0 {
        return Err(PipelineError::invalid("segment", "segment_gap_threshold_s", gap_threshold_s));
    }
    let samples = track.samples();

    let (segments, bridges) = runs(samples, gap_threshold_s).into_iter().fold(
        (Vec::new(), Vec::new()),
        |(mut segments, mut bridges): (Vec<Segment>, Vec<Bridge>), (range, by_gap)| {
            // a single point has no line to draw
            if range.len() < 2 {
                return (segments, bridges);
            }
            let first = &samples[range.start];
            if by_gap {
                let from = samples[range.end - 1].clone();
                let to = samples[range.end].clone();
                let gap_s = from.seconds_until(&to);
                bridges.push(Bridge { from, to, gap_s });
            }
            segments.push(Segment {
                index: segments.len(),
                start_date: first.timestamp().date_naive(),
                samples: samples[range.clone()].to_vec(),
                range,
            });
            (segments, bridges)
        },
    );

    info!(
        segments = segments.len(),
        bridges = bridges.len(),
        gap_threshold_s,
        "segmented track"
    );

    Ok(Segmentation {
        segments,
        bridges,
        gap_threshold_s,
    })
}
