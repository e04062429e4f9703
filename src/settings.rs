// src/settings.rs

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::models::PredictorConfig;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub hidden_neurons: usize,
    pub learning_rate: f64,
    pub default_epochs: usize,
    /// Largest `epochs` a `/train` request may ask for.
    pub max_epochs: usize,
    /// Largest `steps` a `/predict` request may ask for.
    pub max_forecast_steps: usize,
    pub strict_bounds: bool,
    pub seed: Option<u64>,
    /// Shortest series the API will train on.
    pub min_training_points: usize,
    /// Where the trained snapshot is persisted, if anywhere.
    pub state_path: Option<String>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        let predictor = PredictorConfig::default();
        ModelSettings {
            hidden_neurons: predictor.hidden_neurons,
            learning_rate: predictor.learning_rate,
            default_epochs: 1000,
            max_epochs: 100_000,
            max_forecast_steps: 365,
            strict_bounds: predictor.strict_bounds,
            seed: predictor.seed,
            min_training_points: 50,
            state_path: None,
        }
    }
}

impl ModelSettings {
    pub fn predictor_config(&self) -> PredictorConfig {
        PredictorConfig {
            hidden_neurons: self.hidden_neurons,
            learning_rate: self.learning_rate,
            strict_bounds: self.strict_bounds,
            seed: self.seed,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PolygonSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub limit: usize,
    pub lookback_days: i64,
}

impl Default for PolygonSettings {
    fn default() -> Self {
        PolygonSettings {
            base_url: "https://api.polygon.io".to_string(),
            api_key: None,
            limit: 50,
            lookback_days: 70,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub model: ModelSettings,
    pub polygon: PolygonSettings,
}

impl Settings {
    /// Layers `config/default.toml` (optional) and `STOCK_PREDICTOR__*` variables
    /// over the built-in defaults. `POLYGON_API_KEY` fills the API key when unset.
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings: Settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(Environment::with_prefix("STOCK_PREDICTOR").separator("__").try_parsing(true))
            .build()?
            .try_deserialize()?;

        if settings.polygon.api_key.is_none() {
            settings.polygon.api_key = std::env::var("POLYGON_API_KEY").ok().filter(|k| !k.is_empty());
        }
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.model.default_epochs, 1000);
        assert_eq!(settings.model.min_training_points, 50);
        assert_eq!(settings.model.max_epochs, 100_000);
        assert_eq!(settings.model.max_forecast_steps, 365);
        assert_eq!(settings.polygon.limit, 50);
        assert_eq!(settings.model.predictor_config(), PredictorConfig::default());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: Settings = Config::builder()
            .add_source(File::from_str(
                "[model]\nhidden_neurons = 16\nstrict_bounds = true\nmax_forecast_steps = 30\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(settings.model.hidden_neurons, 16);
        assert!(settings.model.strict_bounds);
        assert_eq!(settings.model.max_forecast_steps, 30);
        assert_eq!(settings.model.max_epochs, 100_000);
        assert_eq!(settings.model.learning_rate, 0.1);
        assert_eq!(settings.server.host, "127.0.0.1");
    }
}
