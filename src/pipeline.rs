//! merge → simplify → segment → analytics → profile.
//!
//! Each stage consumes the complete output of the previous one; nothing is
//! streamed and nothing is shared between runs.

use serde::Serialize;
use tracing::info;

use crate::analytics::{compute_stats, TripStats};
use crate::config::{AnalyticsSource, PipelineConfig};
use crate::error::Result;
use crate::merger::{merge, MergeOutcome};
use crate::profile::{build_profile, ElevationProfile};
use crate::segmenter::{segment, Segmentation};
use crate::simplifier::{simplify, Simplified};
use crate::source::{decode_all, SampleSource, SourceSamples};

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub merged: MergeOutcome,
    pub simplified: Simplified,
    pub segmentation: Segmentation,
    pub stats: TripStats,
    pub profile: ElevationProfile,
}

/// Compact, serializable view of a run for reports.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary<'a> {
    pub sources_used: &'a [String],
    pub input_samples: usize,
    pub merged_samples: usize,
    pub duplicates_dropped: usize,
    pub simplified_samples: usize,
    pub simplification_tolerance_m: f64,
    pub stats: &'a TripStats,
}

impl PipelineOutput {
    pub fn summary(&self) -> RunSummary<'_> {
        RunSummary {
            sources_used: &self.merged.sources_used,
            input_samples: self.merged.input_samples,
            merged_samples: self.merged.track.len(),
            duplicates_dropped: self.merged.duplicates_dropped,
            simplified_samples: self.simplified.track.len(),
            simplification_tolerance_m: self.simplified.tolerance_m,
            stats: &self.stats,
        }
    }
}

/// Decode every source in parallel, then run the core on the results.
pub fn run(sources: &[Box<dyn SampleSource>], config: &PipelineConfig) -> Result<PipelineOutput> {
    config.validate()?;
    info!(sources = sources.len(), workers = num_cpus::get(), "decoding sources");
    let decoded = decode_all(sources);
    run_samples(&decoded, config)
}

/// Run the core on already-decoded sources.
pub fn run_samples(sources: &[SourceSamples], config: &PipelineConfig) -> Result<PipelineOutput> {
    config.validate()?;

    let merged = merge(sources, &config.merge)?;
    let simplified = simplify(
        &merged.track,
        config.simplification_tolerance_m,
        config.segment_gap_threshold_s,
    )?;
    let segmentation = segment(&simplified.track, config.segment_gap_threshold_s)?;

    let analytics_track = match config.analytics.source {
        AnalyticsSource::Merged => &merged.track,
        AnalyticsSource::Simplified => &simplified.track,
    };
    let stats = compute_stats(
        analytics_track,
        segmentation.segment_count(),
        config,
        config.analytics.source,
    );
    let profile = build_profile(
        &simplified.track,
        config.segment_gap_threshold_s,
        config.chart_point_cap,
    )?;

    Ok(PipelineOutput {
        merged,
        simplified,
        segmentation,
        stats,
        profile,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::sample::fixtures::{sample, sample_ele};
    use crate::sample::Sample;

    fn ride(start: i64, n: usize, lon0: f64) -> Vec<Sample> {
        (0..n)
            .map(|i| {
                let wiggle = if i % 2 == 0 { 0.0002 } else { -0.0002 };
                sample_ele(start + i as i64 * 5, 45.0 + wiggle, lon0 + i as f64 * 0.0005, 300.0 + i as f64)
            })
            .collect()
    }

    #[test]
    fn test_end_to_end_two_overlapping_devices() {
        let bike = SourceSamples::new("bike", ride(0, 40, 7.0));
        let watch = SourceSamples::new("watch", ride(100, 40, 7.0 + 20.0 * 0.0005));
        let out = run_samples(&[bike, watch], &PipelineConfig::default()).unwrap();

        // 0..195 and 100..295 step 5 overlap on 100..195
        assert_eq!(out.merged.track.len(), 60);
        assert_eq!(out.merged.duplicates_dropped, 20);
        assert!(out.simplified.track.len() <= out.merged.track.len());
        assert_eq!(out.stats.segment_count, 1);
        assert_eq!(out.segmentation.segment_count(), 1);
        assert!(out.stats.elevation_gain_m > 0.0);
        assert!(!out.profile.points.is_empty());
        assert_eq!(out.summary().merged_samples, 60);
    }

    #[test]
    fn test_analytics_source_switch() {
        let src = SourceSamples::new("a", ride(0, 50, 7.0));
        let merged_cfg = PipelineConfig::default();
        let mut simplified_cfg = PipelineConfig::default();
        simplified_cfg.analytics.source = AnalyticsSource::Simplified;
        simplified_cfg.simplification_tolerance_m = 100.0;

        let a = run_samples(std::slice::from_ref(&src), &merged_cfg).unwrap();
        let b = run_samples(std::slice::from_ref(&src), &simplified_cfg).unwrap();
        assert_eq!(a.stats.filters.source, AnalyticsSource::Merged);
        assert_eq!(b.stats.filters.source, AnalyticsSource::Simplified);
        // zigzag removed by simplification shortens the measured path
        assert!(b.stats.total_distance_m < a.stats.total_distance_m);
    }

    #[test]
    fn test_insufficient_data_is_fatal() {
        let src = SourceSamples::new("a", vec![sample(0, 1.0, 1.0)]);
        let err = run_samples(&[src], &PipelineConfig::default()).unwrap_err();
        assert!(matches!(err, PipelineError::InsufficientData { .. }));
    }

    #[test]
    fn test_invalid_config_is_fatal_before_merge() {
        let src = SourceSamples::new("a", ride(0, 5, 7.0));
        let mut config = PipelineConfig::default();
        config.simplification_tolerance_m = 0.0;
        let err = run_samples(&[src], &config).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfiguration { stage: "simplify", .. }));
    }
}
