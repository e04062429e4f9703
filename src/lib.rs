//! Price forecasting with a small feed-forward network.
//!
//! The core is [`models::NeuralNetwork`] (a sigmoid multilayer perceptron trained
//! with per-sample gradient descent) and [`models::StockPredictor`], which
//! normalizes a price series, trains on sliding lookback windows and rolls
//! forecasts forward autoregressively. [`api`] exposes both over HTTP.

pub mod api;
pub mod error;
pub mod models;
pub mod settings;
pub mod utils;

pub use error::{MarketDataError, PredictorError, Result};
pub use models::{NetworkSnapshot, NeuralNetwork, PredictorConfig, StockPredictor, TrainingReport};
