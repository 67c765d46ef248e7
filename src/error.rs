use thiserror::Error;

/// Failures a caller can cause. Malformed text and unknown grade literals
/// are not errors; they degrade to "no signal" inside the engine.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    #[error("sheet does not match its declared schema: {0}")]
    Schema(String),

    #[error("invalid record at row {row}: {reason}")]
    InvalidRecord { row: usize, reason: String },
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;
