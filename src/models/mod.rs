// src/models/mod.rs

pub mod network;
pub mod predictor;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One daily close, the shape the host page loads and charts.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

// Re-export model components
pub use network::{NetworkSnapshot, NeuralNetwork};
pub use predictor::{PredictorConfig, StockPredictor, TrainingReport, MAX_FORECAST_STEPS};
