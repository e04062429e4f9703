// src/models/predictor.rs

use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::Path;

use crate::error::{PredictorError, Result};
use crate::models::network::{NetworkSnapshot, NeuralNetwork};
use crate::utils::{build_windows, calculate_metrics, split_pairs, MinMaxScaler, DEFAULT_LOOKBACK};

/// Longest rollout `forecast` will run in one call.
pub const MAX_FORECAST_STEPS: usize = 10_000;

/// Settings for the price model. The defaults give the `[5, 10, 1]`
/// network with learning rate 0.1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    pub hidden_neurons: usize,
    pub learning_rate: f64,
    /// Reuse the training-time min/max in `predict` instead of the live series bounds.
    pub strict_bounds: bool,
    /// Seed for the initial weights; unseeded when `None`.
    pub seed: Option<u64>,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        PredictorConfig {
            hidden_neurons: 10,
            learning_rate: 0.1,
            strict_bounds: false,
            seed: None,
        }
    }
}

/// Fit of the model on its own training windows, in normalized units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub epochs: usize,
    pub samples: usize,
    pub mse: f64,
    pub mae: f64,
}

/// One step of an autoregressive rollout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastStep {
    /// Normalized window fed to the network for this step.
    pub window: Vec<f64>,
    pub normalized: f64,
    pub value: f64,
}

#[derive(Debug, Clone)]
pub struct StockPredictor {
    network: NeuralNetwork,
    config: PredictorConfig,
    trained: bool,
    training_scaler: Option<MinMaxScaler>,
}

impl StockPredictor {
    pub fn new() -> Result<Self> {
        Self::with_config(PredictorConfig::default())
    }

    pub fn with_config(config: PredictorConfig) -> Result<Self> {
        let topology = [DEFAULT_LOOKBACK, config.hidden_neurons, 1];
        let network = match config.seed {
            Some(seed) => NeuralNetwork::with_rng(&topology, config.learning_rate, &mut StdRng::seed_from_u64(seed))?,
            None => NeuralNetwork::new(&topology, config.learning_rate)?,
        };

        Ok(StockPredictor {
            network,
            config,
            trained: false,
            training_scaler: None,
        })
    }

    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    pub fn topology(&self) -> &[usize] {
        self.network.layers()
    }

    pub fn is_trained(&self) -> bool {
        self.trained
    }

    /// Bounds of the last successful training series, if any.
    pub fn training_bounds(&self) -> Option<MinMaxScaler> {
        self.training_scaler
    }

    /// Normalizes `prices`, slices lookback windows and trains the network in place.
    ///
    /// Input is validated before any weight changes, so a failed call keeps the
    /// previous model intact. Zero epochs leaves the trained flag as it was.
    pub fn train(&mut self, prices: &[f64], epochs: usize) -> Result<TrainingReport> {
        if prices.len() <= DEFAULT_LOOKBACK {
            return Err(PredictorError::InsufficientData {
                len: prices.len(),
                required: DEFAULT_LOOKBACK + 1,
            });
        }

        let scaler = MinMaxScaler::fit(prices)?;
        let normalized = scaler.transform(prices);
        let pairs = build_windows(&normalized, DEFAULT_LOOKBACK)?;
        let (inputs, targets) = split_pairs(&pairs);

        info!(
            "Training {:?} network on {} windows for {} epochs (prices {:.4}..{:.4})",
            self.network.layers(),
            pairs.len(),
            epochs,
            scaler.min,
            scaler.max
        );
        self.network.train(&inputs, &targets, epochs)?;

        let mut predictions = Vec::with_capacity(inputs.len());
        for input in &inputs {
            predictions.push(self.network.predict(input)?[0]);
        }
        let expected: Vec<f64> = pairs.iter().map(|pair| pair.target).collect();
        let (mse, mae) = calculate_metrics(&predictions, &expected);

        if epochs > 0 {
            self.trained = true;
            self.training_scaler = Some(scaler);
        }

        let report = TrainingReport {
            epochs,
            samples: pairs.len(),
            mse,
            mae,
        };
        info!("Training completed: MSE {:.6}, MAE {:.6}", report.mse, report.mae);
        Ok(report)
    }

    /// Forecasts `steps` prices past the end of `prices`, feeding each
    /// prediction back into the window for the next one.
    pub fn predict(&self, prices: &[f64], steps: usize) -> Result<Vec<f64>> {
        Ok(self
            .forecast(prices, steps)?
            .into_iter()
            .map(|step| step.value)
            .collect())
    }

    /// Same rollout as [`StockPredictor::predict`], keeping the window used at each step.
    ///
    /// Bounds come from `prices` itself unless `strict_bounds` is set and a
    /// training series is known.
    pub fn forecast(&self, prices: &[f64], steps: usize) -> Result<Vec<ForecastStep>> {
        if !self.trained {
            return Err(PredictorError::ModelNotTrained);
        }
        if prices.len() < DEFAULT_LOOKBACK {
            return Err(PredictorError::InsufficientData {
                len: prices.len(),
                required: DEFAULT_LOOKBACK,
            });
        }
        if steps > MAX_FORECAST_STEPS {
            return Err(PredictorError::TooManySteps {
                requested: steps,
                max: MAX_FORECAST_STEPS,
            });
        }

        let live = MinMaxScaler::fit(prices)?;
        let scaler = match (self.config.strict_bounds, self.training_scaler) {
            (true, Some(training)) => training,
            _ => live,
        };

        let tail = &prices[prices.len() - DEFAULT_LOOKBACK..];
        let mut window: VecDeque<f64> = scaler.transform(tail).into();
        let mut steps_out = Vec::new();

        for step in 0..steps {
            let input: Vec<f64> = window.iter().copied().collect();
            let normalized = self.network.predict(&input)?[0];
            let value = scaler.unscale(normalized);
            debug!("Forecast step {}: {:.6} -> {:.4}", step + 1, normalized, value);

            window.pop_front();
            window.push_back(normalized);
            steps_out.push(ForecastStep {
                window: input,
                normalized,
                value,
            });
        }

        Ok(steps_out)
    }

    pub fn model_state(&self) -> NetworkSnapshot {
        self.network.save()
    }

    /// Replaces the network with a saved one and marks the predictor trained.
    /// Training bounds are unknown afterwards, so strict mode falls back to live bounds.
    pub fn load_model_state(&mut self, snapshot: NetworkSnapshot) -> Result<()> {
        let network = NeuralNetwork::load(snapshot)?;
        if network.input_size() != DEFAULT_LOOKBACK || network.output_size() != 1 {
            return Err(PredictorError::InvalidSnapshot(format!(
                "expected {} inputs and 1 output, got {:?}",
                DEFAULT_LOOKBACK,
                network.layers()
            )));
        }

        self.network = network;
        self.trained = true;
        self.training_scaler = None;
        Ok(())
    }

    /// Writes the current network snapshot as JSON.
    pub fn save_model_file(&self, path: impl AsRef<Path>) -> Result<()> {
        self.network.save_to_file(path)
    }

    pub fn load_model_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let data = std::fs::read_to_string(path)?;
        self.load_model_state(serde_json::from_str(&data)?)
    }
}
