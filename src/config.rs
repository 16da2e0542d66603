//! Pipeline configuration.
//!
//! Every stage reads its constants from [`PipelineConfig`]. The struct
//! deserializes from TOML with all fields optional, so a config file only
//! needs to name what it overrides:
//!
//! ```toml
//! simplification_tolerance_m = 15.0
//! elevation_noise_floor_m = 2.0
//!
//! [merge]
//! source_priority = ["edge530.fit", "watch.fit"]
//!
//! [analytics]
//! source = "simplified"
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

pub const DEFAULT_SIMPLIFICATION_TOLERANCE_M: f64 = 10.0;
pub const DEFAULT_SEGMENT_GAP_THRESHOLD_S: i64 = 5 * 3600;
pub const DEFAULT_STOPPED_SPEED_THRESHOLD_MPS: f64 = 0.5;
pub const DEFAULT_ELEVATION_NOISE_FLOOR_M: f64 = 3.0;
pub const DEFAULT_CHART_POINT_CAP: usize = 400;

/// Which track the analytics engine walks.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnalyticsSource {
    /// Full merged track, before simplification.
    #[default]
    Merged,
    /// Output of the simplifier. Cheaper, but distance and moving time are
    /// biased low by point removal.
    Simplified,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct MergeConfig {
    /// Source names in descending priority. On an exact timestamp collision
    /// the sample from the higher-priority source wins. Sources not listed
    /// rank below every listed one and keep their input order.
    pub source_priority: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub source: AnalyticsSource,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub simplification_tolerance_m: f64,
    pub segment_gap_threshold_s: i64,
    pub stopped_speed_threshold_mps: f64,
    pub elevation_noise_floor_m: f64,
    pub chart_point_cap: usize,
    pub merge: MergeConfig,
    pub analytics: AnalyticsConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            simplification_tolerance_m: DEFAULT_SIMPLIFICATION_TOLERANCE_M,
            segment_gap_threshold_s: DEFAULT_SEGMENT_GAP_THRESHOLD_S,
            stopped_speed_threshold_mps: DEFAULT_STOPPED_SPEED_THRESHOLD_MPS,
            elevation_noise_floor_m: DEFAULT_ELEVATION_NOISE_FLOOR_M,
            chart_point_cap: DEFAULT_CHART_POINT_CAP,
            merge: MergeConfig::default(),
            analytics: AnalyticsConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load a config file. Missing keys fall back to defaults; the result is
    /// validated before it is returned.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| PipelineError::Config {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::parse(&content, &path.display().to_string())
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Self::parse(content, "<inline>")
    }

    fn parse(content: &str, origin: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(content).map_err(|e| PipelineError::Config {
            path: origin.to_string(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject thresholds that would make a stage meaningless. Zero noise
    /// floor is allowed (raw positive deltas), negative is not.
    pub fn validate(&self) -> Result<()> {
        let tol = self.simplification_tolerance_m;
        if !tol.is_finite() || tol <= 0.0 {
            return Err(PipelineError::invalid("simplify", "simplification_tolerance_m", tol));
        }
        if self.segment_gap_threshold_s <= 0 {
            return Err(PipelineError::invalid(
                "segment",
                "segment_gap_threshold_s",
                self.segment_gap_threshold_s,
            ));
        }
        let speed = self.stopped_speed_threshold_mps;
        if !speed.is_finite() || speed <= 0.0 {
            return Err(PipelineError::invalid("analytics", "stopped_speed_threshold_mps", speed));
        }
        let floor = self.elevation_noise_floor_m;
        if !floor.is_finite() || floor < 0.0 {
            return Err(PipelineError::invalid("analytics", "elevation_noise_floor_m", floor));
        }
        if self.chart_point_cap == 0 {
            return Err(PipelineError::invalid("profile", "chart_point_cap", 0));
        }
        Ok(())
    }
}
