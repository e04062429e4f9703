// src/error.rs

use thiserror::Error;

/// Errors raised by the network, the data utilities and the predictor.
#[derive(Debug, Error)]
pub enum PredictorError {
    #[error("invalid topology {layers:?}: need at least 2 layers, none of them empty")]
    InvalidTopology { layers: Vec<usize> },

    #[error("learning rate must be positive and finite, got {0}")]
    InvalidLearningRate(f64),

    #[error("not enough data: got {len} points, need at least {required}")]
    InsufficientData { len: usize, required: usize },

    #[error("forecast of {requested} steps exceeds the limit of {max}")]
    TooManySteps { requested: usize, max: usize },

    #[error("model must be trained before making predictions")]
    ModelNotTrained,

    #[error("shape mismatch: expected length {expected}, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("non-finite value at index {index}")]
    NonFiniteValue { index: usize },

    #[error("invalid model snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PredictorError>;

/// Errors from the live market data feed.
#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("Polygon.io API key not set")]
    MissingApiKey,

    #[error("no data found for symbol {0}")]
    NoData(String),

    #[error("Polygon.io error: {0}")]
    Api(String),

    #[error("invalid timestamp {0}")]
    InvalidTimestamp(i64),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
