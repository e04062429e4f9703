// src/utils/windowing.rs

use crate::error::{PredictorError, Result};

/// Number of preceding prices fed to the network.
pub const DEFAULT_LOOKBACK: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingPair {
    pub input: Vec<f64>,
    pub target: f64,
}

/// Slides a `lookback`-wide window over `series`; pair `i` maps
/// `series[i..i + lookback]` to `series[i + lookback]`.
pub fn build_windows(series: &[f64], lookback: usize) -> Result<Vec<TrainingPair>> {
    if lookback == 0 || series.len() <= lookback {
        return Err(PredictorError::InsufficientData {
            len: series.len(),
            required: lookback + 1,
        });
    }

    Ok(series
        .windows(lookback + 1)
        .map(|window| TrainingPair {
            input: window[..lookback].to_vec(),
            target: window[lookback],
        })
        .collect())
}

/// Splits pairs into the input and single-value target vectors the network trains on.
pub fn split_pairs(pairs: &[TrainingPair]) -> (Vec<Vec<f64>>, Vec<Vec<f64>>) {
    pairs
        .iter()
        .map(|pair| (pair.input.clone(), vec![pair.target]))
        .unzip()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_count_and_targets() {
        let series: Vec<f64> = (0..12).map(|i| i as f64 * 1.5).collect();
        let pairs = build_windows(&series, DEFAULT_LOOKBACK).unwrap();
        assert_eq!(pairs.len(), series.len() - DEFAULT_LOOKBACK);
        for (i, pair) in pairs.iter().enumerate() {
            assert_eq!(pair.input, series[i..i + DEFAULT_LOOKBACK].to_vec());
            assert_eq!(pair.target, series[i + DEFAULT_LOOKBACK]);
        }
    }

    #[test]
    fn test_minimum_length() {
        let pairs = build_windows(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 5).unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].target, 6.0);

        match build_windows(&[1.0, 2.0, 3.0, 4.0, 5.0], 5) {
            Err(PredictorError::InsufficientData { len, required }) => {
                assert_eq!(len, 5);
                assert_eq!(required, 6);
            }
            other => panic!("expected insufficient data, got {:?}", other),
        }
        assert!(build_windows(&[], 5).is_err());
        assert!(build_windows(&[1.0, 2.0], 0).is_err());
    }

    #[test]
    fn test_split_pairs() {
        let pairs = build_windows(&[0.0, 0.1, 0.2, 0.3], 2).unwrap();
        let (inputs, targets) = split_pairs(&pairs);
        assert_eq!(inputs, vec![vec![0.0, 0.1], vec![0.1, 0.2]]);
        assert_eq!(targets, vec![vec![0.2], vec![0.3]]);
    }
}
