//! FIT activity files, decoded with `fitparser`.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use fitparser::profile::MesgNum;
use fitparser::Value;

use crate::error::SourceDecodeError;
use crate::sample::RawSample;
use crate::source::SampleSource;

/// Degrees per semicircle (180 / 2^31).
pub const SEMICIRCLE_TO_DEG: f64 = 180.0 / 2_147_483_648.0;

pub struct FitFileSource {
    path: PathBuf,
    name: String,
}

impl FitFileSource {
    pub fn new(path: &Path) -> Self {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown.fit")
            .to_string();
        Self {
            path: path.to_path_buf(),
            name,
        }
    }
}

impl SampleSource for FitFileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_samples(&self) -> Result<Vec<RawSample>, SourceDecodeError> {
        let bytes = fs::read(&self.path).map_err(|e| SourceDecodeError::new(&self.name, e))?;
        parse_fit_bytes(&bytes).map_err(|e| SourceDecodeError::new(&self.name, e))
    }
}

/// Decode the `record` messages of a FIT file.
pub fn parse_fit_bytes(bytes: &[u8]) -> Result<Vec<RawSample>, String> {
    let records = fitparser::de::from_bytes(bytes).map_err(|e| e.to_string())?;
    let mut out = Vec::new();

    for record in records.into_iter() {
        if record.kind() != MesgNum::Record {
            continue;
        }
        let mut raw = RawSample::default();
        let mut altitude = None;
        let mut enhanced_altitude = None;
        for field in record.fields() {
            match field.name() {
                "altitude" => altitude = value_to_f64(field.value()),
                "enhanced_altitude" => enhanced_altitude = value_to_f64(field.value()),
                name => apply_field(&mut raw, name, field.value()),
            }
        }
        raw.elevation = enhanced_altitude.or(altitude);
        out.push(raw);
    }

    Ok(out)
}

fn apply_field(raw: &mut RawSample, name: &str, value: &Value) {
    match name {
        "timestamp" => {
            if let Value::Timestamp(ts) = value {
                raw.timestamp = Some(ts.with_timezone(&Utc));
            }
        }
        "position_lat" => raw.lat = value_to_f64(value).map(|v| v * SEMICIRCLE_TO_DEG),
        "position_long" => raw.lon = value_to_f64(value).map(|v| v * SEMICIRCLE_TO_DEG),
        "heart_rate" => raw.heart_rate = value_to_u8(value),
        "cadence" => raw.cadence = value_to_u8(value),
        "temperature" => raw.temperature = value_to_f64(value),
        _ => {}
    }
}

fn value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Float32(v) => Some(*v as f64),
        Value::Float64(v) => Some(*v),
        Value::SInt8(v) => Some(*v as f64),
        Value::UInt8(v) => Some(*v as f64),
        Value::UInt8z(v) => Some(*v as f64),
        Value::Byte(v) => Some(*v as f64),
        Value::SInt16(v) => Some(*v as f64),
        Value::UInt16(v) => Some(*v as f64),
        Value::UInt16z(v) => Some(*v as f64),
        Value::SInt32(v) => Some(*v as f64),
        Value::UInt32(v) => Some(*v as f64),
        Value::UInt32z(v) => Some(*v as f64),
        Value::SInt64(v) => Some(*v as f64),
        Value::UInt64(v) => Some(*v as f64),
        Value::UInt64z(v) => Some(*v as f64),
        Value::Array(values) => values.iter().find_map(value_to_f64),
        _ => None,
    }
}

fn value_to_u8(value: &Value) -> Option<u8> {
    value_to_f64(value)
        .filter(|v| (0.0..=255.0).contains(v))
        .map(|v| v.round() as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};

    #[test]
    fn test_semicircle_conversion() {
        let mut raw = RawSample::default();
        // 536870912 semicircles = 45 degrees
        apply_field(&mut raw, "position_lat", &Value::SInt32(536_870_912));
        apply_field(&mut raw, "position_long", &Value::SInt32(-1_073_741_824));
        assert!((raw.lat.unwrap() - 45.0).abs() < 1e-9);
        assert!((raw.lon.unwrap() + 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_optional_fields() {
        let mut raw = RawSample::default();
        let ts = Local.timestamp_opt(1_700_000_000, 0).unwrap();
        apply_field(&mut raw, "timestamp", &Value::Timestamp(ts));
        apply_field(&mut raw, "heart_rate", &Value::UInt8(151));
        apply_field(&mut raw, "cadence", &Value::UInt8(90));
        apply_field(&mut raw, "temperature", &Value::SInt8(-3));
        apply_field(&mut raw, "power", &Value::UInt16(250));

        assert_eq!(raw.timestamp.unwrap().timestamp(), 1_700_000_000);
        assert_eq!(raw.heart_rate, Some(151));
        assert_eq!(raw.cadence, Some(90));
        assert_eq!(raw.temperature, Some(-3.0));
        assert!(raw.lat.is_none());
    }

    #[test]
    fn test_out_of_range_u8_is_dropped() {
        assert_eq!(value_to_u8(&Value::UInt16(300)), None);
        assert_eq!(value_to_u8(&Value::Float64(-1.0)), None);
        assert_eq!(value_to_u8(&Value::Float64(72.4)), Some(72));
    }

    #[test]
    fn test_garbage_bytes_fail_to_decode() {
        assert!(parse_fit_bytes(b"definitely not a fit file").is_err());
    }
}
