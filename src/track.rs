//! Time-ordered, deduplicated sample sequence.

use geo::{BoundingRect, Centroid, MultiPoint, Point, Rect};
use serde::Serialize;

use crate::sample::Sample;

/// Samples with strictly increasing timestamps.
///
/// Only the merger and the simplifier build tracks, so the ordering
/// invariant holds for every `Track` value in the crate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Track {
    samples: Vec<Sample>,
}

impl Track {
    pub(crate) fn from_sorted(samples: Vec<Sample>) -> Self {
        debug_assert!(
            samples.windows(2).all(|w| w[0].timestamp() < w[1].timestamp()),
            "track samples must be strictly increasing in time"
        );
        Self { samples }
    }

    /// Keep only the samples at `indices` (ascending, in range).
    pub(crate) fn subsequence(&self, indices: &[usize]) -> Self {
        debug_assert!(indices.windows(2).all(|w| w[0] < w[1]));
        Self {
            samples: indices.iter().map(|&i| self.samples[i].clone()).collect(),
        }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first(&self) -> Option<&Sample> {
        self.samples.first()
    }

    pub fn last(&self) -> Option<&Sample> {
        self.samples.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sample> {
        self.samples.iter()
    }

    /// Wall-clock span from first to last sample, gaps included.
    pub fn span_s(&self) -> f64 {
        match (self.first(), self.last()) {
            (Some(a), Some(b)) => a.seconds_until(b),
            _ => 0.0,
        }
    }

    /// Mean position, used to center a map on the trip.
    pub fn center(&self) -> Option<Point<f64>> {
        self.multi_point().centroid()
    }

    /// Lon/lat bounding box, for framing a map.
    pub fn bounds(&self) -> Option<Rect<f64>> {
        self.multi_point().bounding_rect()
    }

    fn multi_point(&self) -> MultiPoint<f64> {
        self.samples.iter().map(Sample::point).collect()
    }
}

impl<'a> IntoIterator for &'a Track {
    type Item = &'a Sample;
    type IntoIter = std::slice::Iter<'a, Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}
