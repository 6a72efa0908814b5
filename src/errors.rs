/// Domain-specific error types for the pricer.
/// Validation is done upfront. A rejected construction never yields a price,
/// and no default value is substituted on failure.
#[derive(Debug, thiserror::Error)]
pub enum PricingError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("arbitrage violation: risk-neutral probability {prob} outside (0, 1)")]
    ArbitrageViolation { prob: f64 },

    #[error("unsupported option kind: {0}")]
    UnsupportedOptionKind(String),

    #[error("unsupported exercise style: {0}")]
    UnsupportedExerciseStyle(String),

    #[error("non-finite result from {model}: {value}")]
    NonFiniteResult { model: &'static str, value: f64 },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("market data error: {0}")]
    MarketData(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("task failed: {0}")]
    Join(String),
}

impl From<serde_json::Error> for PricingError {
    fn from(e: serde_json::Error) -> Self {
        PricingError::Parse(e.to_string())
    }
}

impl From<chrono::ParseError> for PricingError {
    fn from(e: chrono::ParseError) -> Self {
        PricingError::Parse(e.to_string())
    }
}

impl From<tokio::task::JoinError> for PricingError {
    fn from(e: tokio::task::JoinError) -> Self {
        PricingError::Join(e.to_string())
    }
}

pub type PricingResult<T> = Result<T, PricingError>;
