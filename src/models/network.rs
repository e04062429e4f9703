use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{PredictorError, Result};

/// Weights of one layer transition, stored row-major and indexed by (output, input).
#[derive(Debug, Clone, PartialEq)]
pub struct WeightMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl WeightMatrix {
    fn from_fn(rows: usize, cols: usize, mut init: impl FnMut() -> f64) -> Self {
        WeightMatrix {
            rows,
            cols,
            data: (0..rows * cols).map(|_| init()).collect(),
        }
    }

    /// Builds a matrix from nested rows, checking every row has `cols` entries.
    fn from_rows(rows: &[Vec<f64>], cols: usize) -> Option<Self> {
        if rows.iter().any(|row| row.len() != cols) {
            return None;
        }
        Some(WeightMatrix {
            rows: rows.len(),
            cols,
            data: rows.iter().flatten().copied().collect(),
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    fn row_mut(&mut self, row: usize) -> &mut [f64] {
        &mut self.data[row * self.cols..(row + 1) * self.cols]
    }

    fn to_rows(&self) -> Vec<Vec<f64>> {
        (0..self.rows).map(|r| self.row(r).to_vec()).collect()
    }
}

/// Plain structural snapshot of a network, serialized with the field names
/// the browser client already stores (`layers`, `weights`, `biases`, `learningRate`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSnapshot {
    pub layers: Vec<usize>,
    pub weights: Vec<Vec<Vec<f64>>>,
    pub biases: Vec<Vec<f64>>,
    pub learning_rate: f64,
}

/// Fully connected feed-forward network with sigmoid activations,
/// trained with per-sample stochastic gradient descent.
#[derive(Debug, Clone, PartialEq)]
pub struct NeuralNetwork {
    layers: Vec<usize>,
    weights: Vec<WeightMatrix>,
    biases: Vec<Vec<f64>>,
    learning_rate: f64,
}

impl NeuralNetwork {
    /// Creates a network with weights and biases drawn uniformly from [-1, 1).
    pub fn new(layers: &[usize], learning_rate: f64) -> Result<Self> {
        Self::with_rng(layers, learning_rate, &mut rand::thread_rng())
    }

    /// Same as [`NeuralNetwork::new`] but draws the initial parameters from `rng`,
    /// so a seeded generator yields reproducible networks.
    pub fn with_rng<R: Rng + ?Sized>(layers: &[usize], learning_rate: f64, rng: &mut R) -> Result<Self> {
        validate_topology(layers)?;
        validate_learning_rate(learning_rate)?;

        let mut weights = Vec::with_capacity(layers.len() - 1);
        let mut biases: Vec<Vec<f64>> = Vec::with_capacity(layers.len() - 1);
        for pair in layers.windows(2) {
            let (inputs, outputs) = (pair[0], pair[1]);
            weights.push(WeightMatrix::from_fn(outputs, inputs, || rng.gen_range(-1.0..1.0)));
            biases.push((0..outputs).map(|_| rng.gen_range(-1.0..1.0)).collect());
        }

        Ok(NeuralNetwork {
            layers: layers.to_vec(),
            weights,
            biases,
            learning_rate,
        })
    }

    pub fn layers(&self) -> &[usize] {
        &self.layers
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn input_size(&self) -> usize {
        self.layers[0]
    }

    pub fn output_size(&self) -> usize {
        self.layers[self.layers.len() - 1]
    }

    pub fn weights(&self) -> &[WeightMatrix] {
        &self.weights
    }

    pub fn biases(&self) -> &[Vec<f64>] {
        &self.biases
    }

    /// Runs a forward pass and returns the activations of every layer,
    /// the input layer included.
    pub fn forward(&self, input: &[f64]) -> Result<Vec<Vec<f64>>> {
        check_len(input, self.input_size())?;
        Ok(self.activations(input))
    }

    fn activations(&self, input: &[f64]) -> Vec<Vec<f64>> {
        let mut activations = Vec::with_capacity(self.layers.len());
        activations.push(input.to_vec());

        for (weights, biases) in self.weights.iter().zip(&self.biases) {
            let previous = &activations[activations.len() - 1];
            let next: Vec<f64> = (0..weights.rows())
                .map(|j| {
                    let sum = weights
                        .row(j)
                        .iter()
                        .zip(previous)
                        .fold(biases[j], |acc, (w, a)| acc + w * a);
                    sigmoid(sum)
                })
                .collect();
            activations.push(next);
        }

        activations
    }

    /// Backpropagates the error of one sample and applies the update in place.
    fn backward(&mut self, target: &[f64], activations: &[Vec<f64>]) {
        let transitions = self.weights.len();
        let mut deltas: Vec<Vec<f64>> = vec![Vec::new(); transitions];

        deltas[transitions - 1] = activations[transitions]
            .iter()
            .zip(target)
            .map(|(output, expected)| (expected - output) * sigmoid_derivative(*output))
            .collect();

        for i in (0..transitions - 1).rev() {
            let next_weights = &self.weights[i + 1];
            let next_delta = &deltas[i + 1];
            let delta: Vec<f64> = (0..self.layers[i + 1])
                .map(|j| {
                    let error: f64 = (0..next_weights.rows())
                        .map(|k| next_weights.get(k, j) * next_delta[k])
                        .sum();
                    error * sigmoid_derivative(activations[i + 1][j])
                })
                .collect();
            deltas[i] = delta;
        }

        let learning_rate = self.learning_rate;
        for (i, delta) in deltas.iter().enumerate() {
            let inputs = &activations[i];
            for (j, d) in delta.iter().enumerate() {
                let step = learning_rate * d;
                for (w, a) in self.weights[i].row_mut(j).iter_mut().zip(inputs) {
                    *w += step * a;
                }
                self.biases[i][j] += step;
            }
        }
    }

    /// Trains for `epochs` passes over the samples in their given order.
    ///
    /// Every sample is validated before the first update, so a rejected call
    /// leaves the weights untouched.
    pub fn train(&mut self, inputs: &[Vec<f64>], targets: &[Vec<f64>], epochs: usize) -> Result<()> {
        if inputs.len() != targets.len() {
            return Err(PredictorError::ShapeMismatch {
                expected: inputs.len(),
                actual: targets.len(),
            });
        }
        for (input, target) in inputs.iter().zip(targets) {
            check_len(input, self.input_size())?;
            check_len(target, self.output_size())?;
            check_finite(input)?;
            check_finite(target)?;
        }

        let log_every = (epochs / 10).max(1);
        for epoch in 0..epochs {
            let mut squared_error = 0.0;
            for (input, target) in inputs.iter().zip(targets) {
                let activations = self.activations(input);
                squared_error += activations[activations.len() - 1]
                    .iter()
                    .zip(target)
                    .map(|(o, t)| (t - o).powi(2))
                    .sum::<f64>();
                self.backward(target, &activations);
            }

            if (epoch + 1) % log_every == 0 {
                let samples = (inputs.len() * self.output_size()).max(1) as f64;
                debug!("Epoch {}/{}: MSE {:.6}", epoch + 1, epochs, squared_error / samples);
            }
        }

        Ok(())
    }

    /// Pure forward pass returning only the output layer.
    pub fn predict(&self, input: &[f64]) -> Result<Vec<f64>> {
        let mut activations = self.forward(input)?;
        Ok(activations.pop().unwrap_or_default())
    }

    pub fn save(&self) -> NetworkSnapshot {
        NetworkSnapshot {
            layers: self.layers.clone(),
            weights: self.weights.iter().map(WeightMatrix::to_rows).collect(),
            biases: self.biases.clone(),
            learning_rate: self.learning_rate,
        }
    }

    /// Restores a network from a snapshot, rejecting any snapshot whose
    /// weights or biases do not match its declared layer sizes.
    pub fn load(snapshot: NetworkSnapshot) -> Result<Self> {
        let NetworkSnapshot {
            layers,
            weights,
            biases,
            learning_rate,
        } = snapshot;
        validate_topology(&layers)?;
        validate_learning_rate(learning_rate)?;

        let transitions = layers.len() - 1;
        if weights.len() != transitions || biases.len() != transitions {
            return Err(PredictorError::InvalidSnapshot(format!(
                "expected {} weight and bias sets, got {} and {}",
                transitions,
                weights.len(),
                biases.len()
            )));
        }

        let mut matrices = Vec::with_capacity(transitions);
        for (i, rows) in weights.iter().enumerate() {
            let (inputs, outputs) = (layers[i], layers[i + 1]);
            let matrix = WeightMatrix::from_rows(rows, inputs)
                .filter(|m| m.rows() == outputs)
                .ok_or_else(|| {
                    PredictorError::InvalidSnapshot(format!("weights[{}] must be {}x{}", i, outputs, inputs))
                })?;
            if biases[i].len() != outputs {
                return Err(PredictorError::InvalidSnapshot(format!(
                    "biases[{}] must have {} entries, got {}",
                    i,
                    outputs,
                    biases[i].len()
                )));
            }
            matrices.push(matrix);
        }

        Ok(NeuralNetwork {
            layers,
            weights: matrices,
            biases,
            learning_rate,
        })
    }

    /// Saves the network snapshot to a file in JSON format.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let serialized = serde_json::to_string(&self.save())?;
        std::fs::write(path, serialized)?;
        Ok(())
    }

    /// Loads a network from a JSON snapshot file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let snapshot: NetworkSnapshot = serde_json::from_str(&data)?;
        Self::load(snapshot)
    }
}

/// Sigmoid activation function
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Sigmoid derivative expressed in terms of the activation `a = sigmoid(x)`.
pub fn sigmoid_derivative(a: f64) -> f64 {
    a * (1.0 - a)
}

fn validate_topology(layers: &[usize]) -> Result<()> {
    if layers.len() < 2 || layers.contains(&0) {
        return Err(PredictorError::InvalidTopology { layers: layers.to_vec() });
    }
    Ok(())
}

fn validate_learning_rate(learning_rate: f64) -> Result<()> {
    if !(learning_rate.is_finite() && learning_rate > 0.0) {
        return Err(PredictorError::InvalidLearningRate(learning_rate));
    }
    Ok(())
}

fn check_len(values: &[f64], expected: usize) -> Result<()> {
    if values.len() != expected {
        return Err(PredictorError::ShapeMismatch {
            expected,
            actual: values.len(),
        });
    }
    Ok(())
}

fn check_finite(values: &[f64]) -> Result<()> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(PredictorError::NonFiniteValue { index }),
        None => Ok(()),
    }
}
