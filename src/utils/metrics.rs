// src/utils/metrics.rs

/// Mean squared error and mean absolute error of `predictions` against `targets`.
/// Empty input scores zero on both.
pub fn calculate_metrics(predictions: &[f64], targets: &[f64]) -> (f64, f64) {
    let (count, squared, absolute) = predictions
        .iter()
        .zip(targets)
        .fold((0usize, 0.0, 0.0), |(n, sq, abs), (pred, target)| {
            let err = pred - target;
            (n + 1, sq + err * err, abs + err.abs())
        });

    if count == 0 {
        return (0.0, 0.0);
    }
    (squared / count as f64, absolute / count as f64)
}
