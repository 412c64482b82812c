use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactFailure {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    ChecksumMismatch { expected: String, actual: String },
    Cancelled,
    Network,
}

impl fmt::Display for ArtifactFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactFailure::InvalidUrl => write!(f, "invalid url"),
            ArtifactFailure::HttpStatus(code) => write!(f, "http status {code}"),
            ArtifactFailure::Timeout => write!(f, "timeout"),
            ArtifactFailure::TooLarge { max_bytes, actual } => {
                write!(f, "artifact too large (max {max_bytes}, actual {actual:?})")
            }
            ArtifactFailure::ChecksumMismatch { expected, actual } => {
                write!(f, "checksum mismatch (expected {expected}, got {actual})")
            }
            ArtifactFailure::Cancelled => write!(f, "cancelled"),
            ArtifactFailure::Network => write!(f, "network error"),
        }
    }
}

/// Failure to fetch one model artifact.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to load {file}: {kind} ({message})")]
pub struct ArtifactError {
    pub file: String,
    pub kind: ArtifactFailure,
    pub message: String,
}

impl ArtifactError {
    pub(crate) fn new(file: &str, kind: ArtifactFailure, message: impl Into<String>) -> Self {
        Self {
            file: file.to_string(),
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("{pipeline} cannot serve a {task} request")]
    WrongTask {
        pipeline: &'static str,
        task: &'static str,
    },
    #[error("inference failed: {0}")]
    Runtime(String),
    #[error("cancelled")]
    Cancelled,
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("field `{0}` must not be empty")]
    EmptyField(&'static str),
    #[error("progress {progress} for {file} is outside 0..=100")]
    ProgressOutOfRange { file: String, progress: f32 },
    #[error("{labels} labels but {scores} scores")]
    ScoreLabelMismatch { labels: usize, scores: usize },
    #[error("non-finite score in {0} output")]
    NonFiniteScore(&'static str),
    #[error("sample rate must be positive")]
    InvalidSampleRate,
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("could not start worker runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("worker is not running")]
    Disconnected,
}
