//! Error types for the merge pipeline.
//!
//! Per-source decode failures are never fatal: they are absorbed where the
//! sources are collected and the source contributes zero samples. Everything
//! in [`PipelineError`] stops the run and names the stage that raised it.

use thiserror::Error;

/// A single input could not be decoded. The pipeline keeps going without it.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("failed to decode source '{source_name}': {reason}")]
pub struct SourceDecodeError {
    pub source_name: String,
    pub reason: String,
}

impl SourceDecodeError {
    pub fn new(source_name: impl Into<String>, reason: impl ToString) -> Self {
        Self {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("insufficient data in {stage} stage: {count} sample(s), at least 2 required")]
    InsufficientData { stage: &'static str, count: usize },

    #[error("invalid configuration for {stage} stage: {field} = {value}")]
    InvalidConfiguration {
        stage: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("failed to load configuration from {path}: {reason}")]
    Config { path: String, reason: String },

    #[error("export failed: {0}")]
    Export(String),
}

impl PipelineError {
    pub(crate) fn invalid(stage: &'static str, field: &'static str, value: impl ToString) -> Self {
        PipelineError::InvalidConfiguration {
            stage,
            field,
            value: value.to_string(),
        }
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(e: std::io::Error) -> Self {
        PipelineError::Export(e.to_string())
    }
}

impl From<csv::Error> for PipelineError {
    fn from(e: csv::Error) -> Self {
        PipelineError::Export(e.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(e: serde_json::Error) -> Self {
        PipelineError::Export(e.to_string())
    }
}

impl From<gpx::errors::GpxError> for PipelineError {
    fn from(e: gpx::errors::GpxError) -> Self {
        PipelineError::Export(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
