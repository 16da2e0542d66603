//! Canonical sample record and the normalizer that produces it.

use chrono::{DateTime, Utc};
use geo::{point, Point};
use serde::Serialize;

/// A record as handed over by a decoder. Nothing is guaranteed present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSample {
    pub timestamp: Option<DateTime<Utc>>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub elevation: Option<f64>,
    pub heart_rate: Option<u8>,
    pub cadence: Option<u8>,
    pub temperature: Option<f64>,
}

impl RawSample {
    pub fn at(timestamp: DateTime<Utc>, lat: f64, lon: f64) -> Self {
        Self {
            timestamp: Some(timestamp),
            lat: Some(lat),
            lon: Some(lon),
            ..Default::default()
        }
    }

    pub fn with_elevation(mut self, elevation: f64) -> Self {
        self.elevation = Some(elevation);
        self
    }
}

/// One geostamped measurement with a valid position.
///
/// Fields are private so the range invariant on `lat`/`lon` established by
/// [`normalize`] cannot be broken afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    timestamp: DateTime<Utc>,
    lat: f64,
    lon: f64,
    elevation: Option<f64>,
    heart_rate: Option<u8>,
    cadence: Option<u8>,
    temperature: Option<f64>,
}

impl Sample {
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    /// (lat, lon) in degrees.
    pub fn position(&self) -> (f64, f64) {
        (self.lat, self.lon)
    }

    /// Position as a geo point (x = lon, y = lat).
    pub fn point(&self) -> Point<f64> {
        point!(x: self.lon, y: self.lat)
    }

    pub fn elevation(&self) -> Option<f64> {
        self.elevation
    }

    pub fn heart_rate(&self) -> Option<u8> {
        self.heart_rate
    }

    pub fn cadence(&self) -> Option<u8> {
        self.cadence
    }

    pub fn temperature(&self) -> Option<f64> {
        self.temperature
    }

    /// Seconds from `self` to `later`, fractional.
    pub fn seconds_until(&self, later: &Sample) -> f64 {
        (later.timestamp - self.timestamp).num_milliseconds() as f64 / 1000.0
    }
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Turn a raw record into a [`Sample`], or `None` if it has no usable
/// timestamp or position.
pub fn normalize(raw: &RawSample) -> Option<Sample> {
    let timestamp = raw.timestamp?;
    let lat = finite(raw.lat)?;
    let lon = finite(raw.lon)?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return None;
    }
    Some(Sample {
        timestamp,
        lat,
        lon,
        elevation: finite(raw.elevation),
        heart_rate: raw.heart_rate,
        cadence: raw.cadence,
        temperature: finite(raw.temperature),
    })
}

/// Normalize a whole source, keeping input order and dropping what fails.
pub fn normalize_all(raws: &[RawSample]) -> Vec<Sample> {
    raws.iter().filter_map(normalize).collect()
}
