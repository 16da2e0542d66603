//! GPX track files, read with the `gpx` crate.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use gpx::read;

use crate::error::SourceDecodeError;
use crate::sample::RawSample;
use crate::source::SampleSource;

pub struct GpxFileSource {
    path: PathBuf,
    name: String,
}

impl GpxFileSource {
    pub fn new(path: &Path) -> Self {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown.gpx")
            .to_string();
        Self {
            path: path.to_path_buf(),
            name,
        }
    }
}

impl SampleSource for GpxFileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_samples(&self) -> Result<Vec<RawSample>, SourceDecodeError> {
        let file = File::open(&self.path).map_err(|e| SourceDecodeError::new(&self.name, e))?;
        parse_gpx(BufReader::new(file)).map_err(|e| SourceDecodeError::new(&self.name, e))
    }
}

/// Every track point of every track and segment, in document order.
/// Points without a parseable time keep `timestamp: None` and are dropped
/// by the normalizer.
pub fn parse_gpx<R: Read>(reader: R) -> Result<Vec<RawSample>, String> {
    let gpx = read(reader).map_err(|e| format!("Failed to parse GPX: {}", e))?;
    let mut out = Vec::new();

    for track in gpx.tracks {
        for segment in track.segments {
            for point in segment.points {
                let timestamp = point.time.and_then(|time| {
                    let iso = time.format().ok()?;
                    DateTime::parse_from_rfc3339(&iso)
                        .ok()
                        .map(|dt| dt.with_timezone(&Utc))
                });
                let geo_point = point.point();
                out.push(RawSample {
                    timestamp,
                    lat: Some(geo_point.y()),
                    lon: Some(geo_point.x()),
                    elevation: point.elevation,
                    ..Default::default()
                });
            }
        }
    }

    Ok(out)
}
