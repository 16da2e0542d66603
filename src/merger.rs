//! Merge overlapping sources into one deduplicated track.
//!
//! Tie-break policy: when two samples share an exact timestamp, the one from
//! the higher-ranked source is kept and the other is discarded. Ranking is
//! the order of `MergeConfig::source_priority`, then input order for sources
//! the list does not name. Changing the ranking changes which sample wins a
//! collision, never which timestamps end up in the track.

use tracing::info;

use crate::config::MergeConfig;
use crate::error::{PipelineError, Result};
use crate::sample::Sample;
use crate::source::SourceSamples;
use crate::track::Track;

#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub track: Track,
    /// Total samples across all sources before deduplication.
    pub input_samples: usize,
    pub duplicates_dropped: usize,
    /// Sources that contributed at least one sample, in rank order.
    pub sources_used: Vec<String>,
}

/// Rank of every source: listed names first in list order, the rest after
/// them in input order. Ties are impossible since input position is unique.
fn source_ranks(sources: &[SourceSamples], config: &MergeConfig) -> Vec<(usize, usize)> {
    sources
        .iter()
        .enumerate()
        .map(|(input_pos, source)| {
            let listed = config
                .source_priority
                .iter()
                .position(|name| name == &source.name)
                .unwrap_or(config.source_priority.len());
            (listed, input_pos)
        })
        .collect()
}

pub fn merge(sources: &[SourceSamples], config: &MergeConfig) -> Result<MergeOutcome> {
    let ranks = source_ranks(sources, config);
    let mut order: Vec<usize> = (0..sources.len())
        .filter(|&i| !sources[i].samples.is_empty())
        .collect();
    order.sort_by_key(|&i| ranks[i]);

    let sources_used: Vec<String> = order.iter().map(|&i| sources[i].name.clone()).collect();

    // Concatenate in rank order, then stable sort: among equal timestamps the
    // higher-ranked source's sample comes first.
    let mut all: Vec<&Sample> = order.iter().flat_map(|&i| sources[i].samples.iter()).collect();
    let input_samples = all.len();
    all.sort_by_key(|s| s.timestamp());

    let merged: Vec<Sample> = all.into_iter().fold(Vec::with_capacity(input_samples), |mut acc, s| {
        if acc.last().map_or(true, |prev: &Sample| prev.timestamp() < s.timestamp()) {
            acc.push(s.clone());
        }
        acc
    });

    if merged.len() < 2 {
        return Err(PipelineError::InsufficientData {
            stage: "merge",
            count: merged.len(),
        });
    }

    let duplicates_dropped = input_samples - merged.len();
    info!(
        sources = sources_used.len(),
        input = input_samples,
        merged = merged.len(),
        duplicates = duplicates_dropped,
        "merged sources"
    );

    Ok(MergeOutcome {
        track: Track::from_sorted(merged),
        input_samples,
        duplicates_dropped,
        sources_used,
    })
}
