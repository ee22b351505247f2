use thiserror::Error;
use volwatch_core::DetectorSource;
use volwatch_ports::DetectorError;

/// Failures of a whole detection run
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The price series could not be turned into returns
    #[error("Input rejected: {0}")]
    Input(DetectorError),

    #[error("{detector} detector failed: {error}")]
    Detector {
        detector: DetectorSource,
        error: DetectorError,
    },

    #[error("Detector worker panicked or was cancelled: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl PipelineError {
    /// The underlying detector error, when there is one
    pub fn detector_error(&self) -> Option<&DetectorError> {
        match self {
            PipelineError::Input(e) | PipelineError::Detector { error: e, .. } => Some(e),
            PipelineError::Worker(_) => None,
        }
    }
}
