// src/utils/market_data.rs

use chrono::{DateTime, Duration, NaiveDate, Utc};
use log::{debug, info};
use reqwest::Client;
use serde::Deserialize;

use crate::error::{MarketDataError, PredictorError, Result};
use crate::models::PricePoint;
use crate::settings::PolygonSettings;

/// Closes served as built-in sample data, one per day from 2024-05-01.
const SAMPLE_CLOSES: [f64; 49] = [
    150.12, 151.34, 152.01, 151.78, 153.22, 154.10, 153.85, 155.00, 154.75, 156.20,
    157.05, 156.80, 158.30, 159.10, 158.95, 160.20, 161.00, 160.85, 162.10, 163.00,
    162.75, 164.20, 165.05, 164.80, 166.30, 167.10, 166.95, 168.20, 169.00, 168.85,
    170.10, 171.00, 170.75, 172.20, 173.05, 172.80, 174.30, 175.10, 174.95, 176.20,
    177.00, 176.75, 178.20, 179.05, 178.80, 180.30, 181.10, 180.95, 182.20,
];

// Single bar of the Polygon.io aggregates endpoint
#[derive(Debug, Deserialize)]
pub struct AggregateBar {
    /// Bar start, milliseconds since the Unix epoch.
    pub t: i64,
    /// Close price.
    pub c: f64,
}

// Response body of the aggregates endpoint
#[derive(Debug, Deserialize)]
pub struct AggregatesResponse {
    #[serde(default)]
    pub results: Option<Vec<AggregateBar>>,
    #[serde(default)]
    pub error: Option<String>,
}

pub fn sample_price_points() -> Vec<PricePoint> {
    let Some(start) = NaiveDate::from_ymd_opt(2024, 5, 1) else {
        return Vec::new();
    };
    SAMPLE_CLOSES
        .iter()
        .zip(start.iter_days())
        .map(|(close, date)| PricePoint { date, close: *close })
        .collect()
}

pub fn closes(points: &[PricePoint]) -> Vec<f64> {
    points.iter().map(|p| p.close).collect()
}

/// Parses an uploaded `[{ "date": "YYYY-MM-DD", "close": 123.4 }, ...]` document.
pub fn parse_price_points(json: &str) -> Result<Vec<PricePoint>> {
    let points: Vec<PricePoint> = serde_json::from_str(json)?;
    if points.len() < 2 {
        return Err(PredictorError::InsufficientData {
            len: points.len(),
            required: 2,
        });
    }
    Ok(points)
}

/// Converts newest-first bars into the `limit` most recent closes, oldest first.
pub fn bars_to_price_points(
    bars: Vec<AggregateBar>,
    limit: usize,
) -> std::result::Result<Vec<PricePoint>, MarketDataError> {
    let mut points = bars
        .into_iter()
        .take(limit)
        .map(|bar| {
            DateTime::<Utc>::from_timestamp_millis(bar.t)
                .map(|ts| PricePoint {
                    date: ts.date_naive(),
                    close: bar.c,
                })
                .ok_or(MarketDataError::InvalidTimestamp(bar.t))
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;
    points.reverse();
    Ok(points)
}

pub fn aggregates_url(settings: &PolygonSettings, symbol: &str, api_key: &str, today: NaiveDate) -> String {
    let from = today - Duration::days(settings.lookback_days);
    format!(
        "{}/v2/aggs/ticker/{}/range/1/day/{}/{}?adjusted=true&sort=desc&limit={}&apiKey={}",
        settings.base_url.trim_end_matches('/'),
        symbol,
        from.format("%Y-%m-%d"),
        today.format("%Y-%m-%d"),
        settings.limit,
        api_key
    )
}

/// Fetches the most recent daily closes for `symbol` from Polygon.io.
pub async fn fetch_daily_closes(
    client: &Client,
    settings: &PolygonSettings,
    symbol: &str,
) -> std::result::Result<Vec<PricePoint>, MarketDataError> {
    let api_key = settings.api_key.as_deref().ok_or(MarketDataError::MissingApiKey)?;
    let symbol = symbol.to_uppercase();
    let url = aggregates_url(settings, &symbol, api_key, Utc::now().date_naive());
    debug!("Fetching daily aggregates for {}", symbol);

    let response = client.get(&url).send().await?;
    let status = response.status();
    let body: AggregatesResponse = response.json().await?;
    if !status.is_success() {
        return Err(MarketDataError::Api(
            body.error.unwrap_or_else(|| format!("status {}", status)),
        ));
    }

    let bars = body.results.unwrap_or_default();
    if bars.is_empty() {
        return Err(MarketDataError::NoData(symbol));
    }

    let points = bars_to_price_points(bars, settings.limit)?;
    info!("Loaded {} daily closes for {}", points.len(), symbol);
    Ok(points)
}
