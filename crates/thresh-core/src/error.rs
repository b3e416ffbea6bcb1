use thiserror::Error;

pub type ThresholdResult<T> = Result<T, ThresholdError>;

/// Failures raised before any element is processed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ThresholdError {
    #[error("TypeError: {dtype} elements are not real-valued")]
    NonRealInput { dtype: &'static str },
    #[error("ConfigError: no threshold provided")]
    MissingThreshold,
    #[error("ConfigError: too many thresholds (max 2), got {count}")]
    TooManyThresholds { count: usize },
    #[error("ConfigError: threshold is NaN")]
    NanThreshold,
    #[error("ConfigError: threshold {value} is not finite")]
    NonFiniteThreshold { value: f64 },
    #[error("ConfigError: unrecognized mode token `{token}`")]
    UnrecognizedToken { token: String },
    #[error("invalid shape: {detail}")]
    InvalidShape { detail: &'static str },
    #[error("length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("invalid worker count: {requested}")]
    InvalidWorkers { requested: usize },
}

impl ThresholdError {
    /// True for the configuration-resolution family of errors.
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::MissingThreshold
                | Self::TooManyThresholds { .. }
                | Self::NanThreshold
                | Self::NonFiniteThreshold { .. }
                | Self::UnrecognizedToken { .. }
        )
    }
}
