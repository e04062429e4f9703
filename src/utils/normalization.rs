// src/utils/normalization.rs

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{PredictorError, Result};

/// Value every point maps to when the series is constant.
pub const DEGENERATE_VALUE: f64 = 0.5;

/// Min-max bounds of a price series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    pub min: f64,
    pub max: f64,
}

impl MinMaxScaler {
    /// Derives the bounds from `series`, rejecting empty or non-finite input.
    pub fn fit(series: &[f64]) -> Result<Self> {
        if series.is_empty() {
            return Err(PredictorError::InsufficientData { len: 0, required: 1 });
        }
        if let Some(index) = series.iter().position(|v| !v.is_finite()) {
            return Err(PredictorError::NonFiniteValue { index });
        }

        let min = series.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = series.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        Ok(MinMaxScaler { min, max })
    }

    pub fn range(&self) -> f64 {
        self.max - self.min
    }

    /// True when every value in the fitted series was identical.
    pub fn is_degenerate(&self) -> bool {
        self.range() == 0.0
    }

    pub fn scale(&self, value: f64) -> f64 {
        if self.is_degenerate() {
            DEGENERATE_VALUE
        } else {
            (value - self.min) / self.range()
        }
    }

    pub fn unscale(&self, value: f64) -> f64 {
        value * self.range() + self.min
    }

    pub fn transform(&self, series: &[f64]) -> Vec<f64> {
        if self.is_degenerate() {
            warn!("Constant series at {}; normalizing every point to {}", self.min, DEGENERATE_VALUE);
        }
        series.iter().map(|v| self.scale(*v)).collect()
    }

    pub fn inverse_transform(&self, normalized: &[f64]) -> Vec<f64> {
        normalized.iter().map(|v| self.unscale(*v)).collect()
    }
}

/// Scales `series` into [0, 1] and returns the normalized values with the bounds used.
pub fn normalize(series: &[f64]) -> Result<(Vec<f64>, MinMaxScaler)> {
    let scaler = MinMaxScaler::fit(series)?;
    Ok((scaler.transform(series), scaler))
}

/// Maps normalized values back onto the `[min, max]` price scale.
pub fn denormalize(normalized: &[f64], min: f64, max: f64) -> Vec<f64> {
    MinMaxScaler { min, max }.inverse_transform(normalized)
}
