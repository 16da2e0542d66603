//! Merge overlapping ride recordings into one track.
//!
//! Samples from several devices or sessions are merged into a single
//! deduplicated, time-ordered track, simplified with a geographic
//! Douglas–Peucker pass, split into day segments at recording gaps, and
//! summarized as trip statistics and a chart-sized elevation profile.
//!
//! ```ignore
//! use ride_merge::{run_samples, PipelineConfig, SourceSamples};
//!
//! let output = run_samples(&sources, &PipelineConfig::default())?;
//! println!("{} segments", output.stats.segment_count);
//! ```

pub mod analytics;
pub mod config;
pub mod error;
pub mod export;
pub mod fit_source;
pub mod geodesy;
pub mod gpx_source;
pub mod merger;
pub mod pipeline;
pub mod profile;
pub mod sample;
pub mod segmenter;
pub mod simplifier;
pub mod source;
pub mod track;

pub use analytics::{format_duration, AppliedFilters, TripStats};
pub use config::{AnalyticsSource, PipelineConfig};
pub use error::{PipelineError, SourceDecodeError};
pub use merger::MergeOutcome;
pub use pipeline::{run, run_samples, PipelineOutput};
pub use profile::{ElevationProfile, ElevationProfilePoint};
pub use sample::{RawSample, Sample};
pub use segmenter::{Bridge, Segment, Segmentation};
pub use simplifier::Simplified;
pub use source::{decode_all, source_for_path, MemorySource, SampleSource, SourceSamples};
pub use track::Track;
