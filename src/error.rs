use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("File not found: {0}")]
    MissingFile(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("No patient id in file name: {0}")]
    PatternMismatch(String),

    #[error("Empty segment {start}..{end}: no indexed samples in range")]
    EmptySegment { start: i64, end: i64 },

    #[error("More than one sampling frequency in folder: {0:?}")]
    FrequencyMismatch(Vec<f64>),

    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid annotation document: {0}")]
    InvalidAnnotation(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

pub type Result<T> = std::result::Result<T, ExtractError>;
