use thiserror::Error;

/// All errors produced by hushtrim-core.
#[derive(Debug, Error)]
pub enum HushtrimError {
    #[error("invalid sample buffer: {0}")]
    InvalidBuffer(String),

    #[error("invalid detection options: {0}")]
    InvalidConfig(String),

    #[error("background detection failed: {0}")]
    Worker(String),

    #[error("resampler error: {0}")]
    Resample(String),

    #[error("speech classifier error: {0}")]
    Classifier(String),

    #[error("classifier model file not found: {path}")]
    ModelNotFound { path: std::path::PathBuf },

    #[error("classifier strategy selected but no classifier was provided")]
    MissingClassifier,
}

pub type Result<T> = std::result::Result<T, HushtrimError>;
