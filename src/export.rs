//! Writers for the pipeline outputs.
//!
//! The merged GPX carries one `<trkseg>` per day segment so a renderer can
//! draw days separately without recomputing the gaps. Heart rate, cadence
//! and temperature would belong in `gpxtpx:TrackPointExtension` elements,
//! which the `gpx` crate cannot write, so they go to the track CSV instead.
//!
//! Every writer flushes before returning. A buffered writer dropped without
//! a flush would swallow the final I/O error.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use gpx::{Gpx, GpxVersion, Track as GpxTrack, TrackSegment, Waypoint};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::info;

use crate::error::Result;
use crate::pipeline::PipelineOutput;
use crate::profile::ElevationProfile;
use crate::sample::Sample;
use crate::segmenter::Segmentation;
use crate::track::Track;

pub const MERGED_GPX: &str = "merged_ride.gpx";
pub const TRACK_CSV: &str = "merged_track.csv";
pub const PROFILE_JSON: &str = "elevation_profile.json";
pub const SUMMARY_JSON: &str = "trip_summary.json";

fn to_gpx_time(ts: DateTime<Utc>) -> Option<gpx::Time> {
    let odt = OffsetDateTime::from_unix_timestamp(ts.timestamp())
        .ok()?
        .replace_nanosecond(ts.timestamp_subsec_nanos())
        .ok()?;
    Some(gpx::Time::from(odt))
}

fn waypoint(sample: &Sample) -> Waypoint {
    let mut wp = Waypoint::new(sample.point());
    wp.elevation = sample.elevation();
    wp.time = to_gpx_time(sample.timestamp());
    wp
}

/// Build the GPX document: one track, one segment per day.
pub fn build_gpx(name: &str, segmentation: &Segmentation) -> Gpx {
    let mut track = GpxTrack::new();
    track.name = Some(name.to_string());
    let labels: Vec<String> = segmentation.segments.iter().map(|s| s.label()).collect();
    track.description = Some(format!(
        "{} (split at gaps over {}s)",
        labels.join(", "),
        segmentation.gap_threshold_s
    ));
    for seg in &segmentation.segments {
        let mut trkseg = TrackSegment::new();
        trkseg.points = seg.samples.iter().map(waypoint).collect();
        track.segments.push(trkseg);
    }

    let mut gpx = Gpx::default();
    gpx.version = GpxVersion::Gpx11;
    gpx.creator = Some("ride-merge".to_string());
    gpx.tracks.push(track);
    gpx
}

pub fn write_gpx<W: Write>(name: &str, segmentation: &Segmentation, mut writer: W) -> Result<()> {
    gpx::write(&build_gpx(name, segmentation), &mut writer)?;
    writer.flush()?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct TrackRow {
    timestamp: String,
    lat: f64,
    lon: f64,
    elevation: Option<f64>,
    heart_rate: Option<u8>,
    cadence: Option<u8>,
    temperature: Option<f64>,
}

/// Every sample with all of its fields, one row each.
pub fn write_track_csv<W: Write>(track: &Track, mut writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(&mut writer);
    for s in track {
        wtr.serialize(TrackRow {
            timestamp: s.timestamp().to_rfc3339(),
            lat: s.lat(),
            lon: s.lon(),
            elevation: s.elevation(),
            heart_rate: s.heart_rate(),
            cadence: s.cadence(),
            temperature: s.temperature(),
        })?;
    }
    wtr.flush()?;
    drop(wtr);
    writer.flush()?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct ChartPoint {
    x: f64,
    y: i32,
}

/// Chart series as `[{"x": km, "y": m}, ...]`.
pub fn write_profile_json<W: Write>(profile: &ElevationProfile, mut writer: W) -> Result<()> {
    let series: Vec<ChartPoint> = profile
        .points
        .iter()
        .map(|p| ChartPoint {
            x: p.cumulative_distance_km,
            y: p.elevation_m,
        })
        .collect();
    serde_json::to_writer(&mut writer, &series)?;
    writer.flush()?;
    Ok(())
}

pub fn write_summary_json<W: Write>(output: &PipelineOutput, mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, &output.summary())?;
    writer.flush()?;
    Ok(())
}

/// Write all four outputs into `dir`, creating it if needed.
pub fn write_outputs(dir: &Path, name: &str, output: &PipelineOutput) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let paths: Vec<PathBuf> = [MERGED_GPX, TRACK_CSV, PROFILE_JSON, SUMMARY_JSON]
        .iter()
        .map(|f| dir.join(f))
        .collect();

    write_gpx(name, &output.segmentation, BufWriter::new(File::create(&paths[0])?))?;
    write_track_csv(&output.merged.track, BufWriter::new(File::create(&paths[1])?))?;
    write_profile_json(&output.profile, BufWriter::new(File::create(&paths[2])?))?;
    write_summary_json(output, BufWriter::new(File::create(&paths[3])?))?;

    info!(dir = %dir.display(), "wrote outputs");
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpx_source::parse_gpx;
    use crate::sample::fixtures::{sample, sample_ele};
    use crate::segmenter::segment;

    fn two_day_track() -> Track {
        let day = 24 * 3600;
        Track::from_sorted(vec![
            sample_ele(0, 45.0, 7.0, 400.0),
            sample_ele(30, 45.001, 7.001, 404.0),
            sample(day, 45.1, 7.1),
            sample_ele(day + 30, 45.101, 7.101, 410.0),
        ])
    }

    #[test]
    fn test_gpx_has_one_segment_per_day() {
        let seg = segment(&two_day_track(), 5 * 3600).unwrap();
        let gpx = build_gpx("Trip", &seg);
        assert_eq!(gpx.tracks.len(), 1);
        assert_eq!(gpx.tracks[0].segments.len(), 2);
        assert_eq!(gpx.tracks[0].segments[1].points[0].elevation, None);
        let desc = gpx.tracks[0].description.as_deref().unwrap();
        assert!(desc.starts_with("Day 1: 2023-11-14, Day 2: 2023-11-15"));
    }

    #[test]
    fn test_gpx_written_and_read_back() {
        let track = two_day_track();
        let seg = segment(&track, 5 * 3600).unwrap();
        let mut buf = Vec::new();
        write_gpx("Trip", &seg, &mut buf).unwrap();

        let raws = parse_gpx(buf.as_slice()).unwrap();
        assert_eq!(raws.len(), 4);
        assert_eq!(raws[0].timestamp, Some(track.samples()[0].timestamp()));
        assert_eq!(raws[1].elevation, Some(404.0));
        assert!((raws[3].lat.unwrap() - 45.101).abs() < 1e-9);
    }

    #[test]
    fn test_track_csv_has_all_columns() {
        let mut buf = Vec::new();
        write_track_csv(&two_day_track(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "timestamp,lat,lon,elevation,heart_rate,cadence,temperature"
        );
        assert_eq!(text.lines().count(), 5);
        // missing elevation becomes an empty field
        assert!(text.lines().nth(3).unwrap().contains(",45.1,7.1,,,,"));
    }

    /// Accepts nothing, like a full disk.
    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "no space left on device"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_buffered_write_failure_is_reported() {
        // everything fits in the buffer, so only the final flush can fail
        let seg = segment(&two_day_track(), 5 * 3600).unwrap();
        assert!(write_gpx("Trip", &seg, BufWriter::new(FullDisk)).is_err());
        assert!(write_track_csv(&two_day_track(), BufWriter::new(FullDisk)).is_err());

        let profile = ElevationProfile {
            points: Vec::new(),
            cap: 400,
            source_len: 0,
            stride: 1.0,
        };
        assert!(write_profile_json(&profile, BufWriter::new(FullDisk)).is_err());
    }

    #[test]
    fn test_profile_json_shape() {
        let profile = ElevationProfile {
            points: vec![crate::profile::ElevationProfilePoint {
                cumulative_distance_km: 12.3,
                elevation_m: 455,
            }],
            cap: 400,
            source_len: 1,
            stride: 1.0,
        };
        let mut buf = Vec::new();
        write_profile_json(&profile, &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), r#"[{"x":12.3,"y":455}]"#);
    }
}
