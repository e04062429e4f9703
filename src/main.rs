// src/main.rs

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use log::{error, info, warn};
use std::path::Path;

use stock_predictor::api::{configure, AppState};
use stock_predictor::settings::Settings;
use stock_predictor::StockPredictor;

#[actix_web::main]
async fn main() -> Result<(), std::io::Error> {
    // Initialize environment variables
    dotenv::dotenv().ok();

    // Initialize the logger
    env_logger::init();

    let settings = Settings::load().map_err(|e| {
        error!("Invalid configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    let mut predictor = StockPredictor::with_config(settings.model.predictor_config()).map_err(|e| {
        error!("Invalid model configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    // Restore a previously trained model if one was saved
    if let Some(path) = settings.model.state_path.as_deref().filter(|p| Path::new(p).exists()) {
        match predictor.load_model_file(path) {
            Ok(()) => info!("Loaded model state from {}", path),
            Err(e) => warn!("Ignoring saved model at {}: {}", path, e),
        }
    }

    if settings.polygon.api_key.is_none() {
        warn!("POLYGON_API_KEY not set; /stock-data will be unavailable");
    }

    let bind = (settings.server.host.clone(), settings.server.port);
    info!(
        "Serving {:?} predictor on {}:{}",
        predictor.topology(),
        bind.0,
        bind.1
    );

    let app_state = web::Data::new(AppState::new(predictor, settings));

    HttpServer::new(move || {
        // Configure CORS to allow requests from the frontend
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .app_data(app_state.clone())
            .configure(configure)
    })
    .bind(bind)?
    .run()
    .await
}
