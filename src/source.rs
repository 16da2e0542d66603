//! Sample sources and the parallel decode fan-out.
//!
//! Each input file is decoded on its own rayon worker. A worker never shares
//! state with another and never fails the batch: a source that cannot be
//! decoded is logged and comes back with zero samples. The `collect()` at the
//! end of [`decode_all`] is the only join point.

use std::path::Path;

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::error::SourceDecodeError;
use crate::fit_source::FitFileSource;
use crate::gpx_source::GpxFileSource;
use crate::sample::{normalize_all, RawSample, Sample};

/// Anything that can yield raw samples for one recording session.
pub trait SampleSource: Send + Sync {
    /// Stable identifier, used for logging and for merge priority.
    fn name(&self) -> &str;

    /// Decode every record. Timestamps are expected to be monotonic within
    /// the source but this is not relied on.
    fn read_samples(&self) -> Result<Vec<RawSample>, SourceDecodeError>;
}

/// Normalized samples from one source, in the order the source produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSamples {
    pub name: String,
    pub samples: Vec<Sample>,
}

impl SourceSamples {
    pub fn new(name: impl Into<String>, samples: Vec<Sample>) -> Self {
        Self {
            name: name.into(),
            samples,
        }
    }
}

/// In-memory source, for embedding callers that decode elsewhere.
#[derive(Debug, Clone)]
pub struct MemorySource {
    name: String,
    records: Result<Vec<RawSample>, String>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, records: Vec<RawSample>) -> Self {
        Self {
            name: name.into(),
            records: Ok(records),
        }
    }

    /// A source that always fails to decode.
    pub fn failing(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: Err(reason.into()),
        }
    }
}

impl SampleSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_samples(&self) -> Result<Vec<RawSample>, SourceDecodeError> {
        self.records
            .clone()
            .map_err(|reason| SourceDecodeError::new(&self.name, reason))
    }
}

/// Decode and normalize one source. Failure yields an empty sample list.
pub fn decode_source(source: &dyn SampleSource) -> SourceSamples {
    match source.read_samples() {
        Ok(raws) => {
            let samples = normalize_all(&raws);
            debug!(
                source = source.name(),
                raw = raws.len(),
                kept = samples.len(),
                "decoded source"
            );
            SourceSamples::new(source.name(), samples)
        }
        Err(e) => {
            warn!(source = source.name(), error = %e, "skipping undecodable source");
            SourceSamples::new(source.name(), Vec::new())
        }
    }
}

/// Decode all sources in parallel. Output order matches input order.
pub fn decode_all(sources: &[Box<dyn SampleSource>]) -> Vec<SourceSamples> {
    sources
        .par_iter()
        .map(|source| decode_source(source.as_ref()))
        .collect()
}

/// Pick a decoder from the file extension. `None` for unsupported files.
pub fn source_for_path(path: &Path) -> Option<Box<dyn SampleSource>> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "fit" => Some(Box::new(FitFileSource::new(path))),
        "gpx" => Some(Box::new(GpxFileSource::new(path))),
        _ => None,
    }
}
