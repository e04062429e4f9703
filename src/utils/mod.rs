// src/utils/mod.rs

pub mod chart;
pub mod market_data;
pub mod metrics;
pub mod normalization;
pub mod windowing;

pub use chart::render_forecast_svg;
pub use market_data::{closes, fetch_daily_closes, parse_price_points, sample_price_points};
pub use metrics::calculate_metrics;
pub use normalization::{denormalize, normalize, MinMaxScaler};
pub use windowing::{build_windows, split_pairs, TrainingPair, DEFAULT_LOOKBACK};
