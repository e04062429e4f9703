// src/api/handlers.rs

use actix_web::{web, HttpResponse};
use log::{error, info};
use serde::{Deserialize, Serialize};

use crate::api::{ApiError, ApiResult, AppState};
use crate::models::{NetworkSnapshot, PricePoint};
use crate::utils::{closes, fetch_daily_closes, parse_price_points, render_forecast_svg, sample_price_points};

#[derive(Serialize)]
pub struct StatusResponse {
    pub trained: bool,
    pub topology: Vec<usize>,
    pub learning_rate: f64,
    pub strict_bounds: bool,
}

#[derive(Deserialize)]
pub struct TrainRequest {
    pub prices: Vec<f64>,
    pub epochs: Option<usize>,
}

#[derive(Deserialize)]
pub struct PredictRequest {
    pub prices: Vec<f64>,
    pub steps: Option<usize>,
}

#[derive(Serialize)]
pub struct PredictResponse {
    pub predictions: Vec<f64>,
}

#[derive(Deserialize)]
pub struct StockDataQuery {
    pub symbol: Option<String>,
}

#[derive(Serialize)]
pub struct StockDataResponse {
    pub symbol: String,
    pub data: Vec<PricePoint>,
}

#[derive(Deserialize)]
pub struct ChartRequest {
    pub data: Vec<PricePoint>,
    #[serde(default)]
    pub predictions: Vec<f64>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/status", web::get().to(get_status))
        .route("/train", web::post().to(train))
        .route("/predict", web::post().to(predict))
        .route("/model", web::get().to(get_model))
        .route("/model", web::put().to(put_model))
        .route("/stock-data", web::get().to(get_stock_data))
        .route("/sample-data", web::get().to(get_sample_data))
        .route("/upload", web::post().to(upload))
        .route("/chart", web::post().to(chart));
}

pub async fn get_status(data: web::Data<AppState>) -> ApiResult {
    let predictor = data.predictor();
    let config = predictor.config();
    Ok(HttpResponse::Ok().json(StatusResponse {
        trained: predictor.is_trained(),
        topology: predictor.topology().to_vec(),
        learning_rate: config.learning_rate,
        strict_bounds: config.strict_bounds,
    }))
}

/// Trains a copy of the current model on a blocking thread and swaps it in on success.
/// If the model was replaced while training (another `/train` or a `PUT /model`),
/// the result is discarded with 409 instead of overwriting the newer model.
pub async fn train(data: web::Data<AppState>, body: web::Json<TrainRequest>) -> ApiResult {
    let TrainRequest { prices, epochs } = body.into_inner();
    let model_settings = &data.settings.model;

    if prices.len() < model_settings.min_training_points {
        return Err(ApiError::BadRequest(format!(
            "Please provide at least {} data points to train the model.",
            model_settings.min_training_points
        )));
    }
    let epochs = epochs.unwrap_or(model_settings.default_epochs);
    if epochs > model_settings.max_epochs {
        return Err(ApiError::BadRequest(format!(
            "epochs must be at most {}",
            model_settings.max_epochs
        )));
    }

    let (mut candidate, generation) = data.checkout();
    let state = data.clone();
    let report = tokio::task::spawn_blocking(move || {
        let report = candidate.train(&prices, epochs)?;
        state.commit(candidate, generation)?;

        if let Some(path) = &state.settings.model.state_path {
            match state.predictor().save_model_file(path) {
                Ok(()) => info!("Model saved to {}", path),
                Err(e) => error!("Failed to save model to {}: {}", path, e),
            }
        }
        Ok::<_, ApiError>(report)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("training task failed: {}", e)))??;

    Ok(HttpResponse::Ok().json(report))
}

/// Rolls the forecast out on a copy of the model so the lock is only held for the clone.
pub async fn predict(data: web::Data<AppState>, body: web::Json<PredictRequest>) -> ApiResult {
    let PredictRequest { prices, steps } = body.into_inner();
    let steps = steps.unwrap_or(1);
    let max_steps = data.settings.model.max_forecast_steps;
    if steps > max_steps {
        return Err(ApiError::BadRequest(format!("steps must be at most {}", max_steps)));
    }

    let predictor = data.predictor().clone();
    let predictions = web::block(move || predictor.predict(&prices, steps))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(PredictResponse { predictions }))
}

pub async fn get_model(data: web::Data<AppState>) -> ApiResult {
    let snapshot = data.predictor().model_state();
    Ok(HttpResponse::Ok().json(snapshot))
}

pub async fn put_model(data: web::Data<AppState>, body: web::Json<NetworkSnapshot>) -> ApiResult {
    data.load_snapshot(body.into_inner())?;
    info!("Model state loaded");
    Ok(HttpResponse::NoContent().finish())
}

pub async fn get_stock_data(data: web::Data<AppState>, query: web::Query<StockDataQuery>) -> ApiResult {
    let symbol = query
        .symbol
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing symbol parameter".to_string()))?;

    let points = fetch_daily_closes(&data.http, &data.settings.polygon, symbol).await?;
    Ok(HttpResponse::Ok().json(StockDataResponse {
        symbol: symbol.to_uppercase(),
        data: points,
    }))
}

pub async fn get_sample_data() -> ApiResult {
    Ok(HttpResponse::Ok().json(sample_price_points()))
}

/// Validates an uploaded price file and echoes the parsed points back.
pub async fn upload(body: String) -> ApiResult {
    let points = parse_price_points(&body)?;
    info!("Loaded {} uploaded data points", points.len());
    Ok(HttpResponse::Ok().json(points))
}

pub async fn chart(body: web::Json<ChartRequest>) -> ApiResult {
    let ChartRequest { data, predictions } = body.into_inner();
    let history = closes(&data);
    let svg = web::block(move || render_forecast_svg(&history, &predictions).map_err(|e| e.to_string()))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(ApiError::BadRequest)?;

    Ok(HttpResponse::Ok().content_type("image/svg+xml").body(svg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PredictorConfig, StockPredictor};
    use crate::settings::Settings;
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use serde_json::{json, Value};

    fn app_state(settings: Settings) -> web::Data<AppState> {
        let predictor = StockPredictor::with_config(PredictorConfig {
            seed: Some(42),
            ..settings.model.predictor_config()
        })
        .unwrap();
        web::Data::new(AppState::new(predictor, settings))
    }

    fn sample_closes() -> Vec<f64> {
        closes(&sample_price_points())
    }

    fn trending_closes(len: usize) -> Vec<f64> {
        (0..len).map(|i| 100.0 + i as f64 * 0.8 + (i % 3) as f64 * 0.3).collect()
    }

    #[actix_web::test]
    async fn test_status_starts_untrained() {
        let app = test::init_service(App::new().app_data(app_state(Settings::default())).configure(configure)).await;
        let req = test::TestRequest::get().uri("/status").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["trained"], json!(false));
        assert_eq!(body["topology"], json!([5, 10, 1]));
    }

    #[actix_web::test]
    async fn test_predict_before_train_conflicts() {
        let app = test::init_service(App::new().app_data(app_state(Settings::default())).configure(configure)).await;
        let req = test::TestRequest::post()
            .uri("/predict")
            .set_json(json!({ "prices": sample_closes(), "steps": 2 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[actix_web::test]
    async fn test_train_requires_minimum_points() {
        let app = test::init_service(App::new().app_data(app_state(Settings::default())).configure(configure)).await;
        let req = test::TestRequest::post()
            .uri("/train")
            .set_json(json!({ "prices": [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0], "epochs": 10 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_train_then_predict() {
        let state = app_state(Settings::default());
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/train")
            .set_json(json!({ "prices": trending_closes(60), "epochs": 200 }))
            .to_request();
        let report: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(report["samples"], json!(55));
        assert_eq!(report["epochs"], json!(200));
        assert!(state.predictor().is_trained());
        assert_eq!(state.generation(), 1);

        let req = test::TestRequest::post()
            .uri("/predict")
            .set_json(json!({ "prices": sample_closes(), "steps": 3 }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let predictions = body["predictions"].as_array().unwrap();
        assert_eq!(predictions.len(), 3);
        assert!(predictions.iter().all(|p| p.as_f64().map_or(false, f64::is_finite)));
    }

    #[actix_web::test]
    async fn test_train_rejects_too_many_epochs() {
        let state = app_state(Settings::default());
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;
        let req = test::TestRequest::post()
            .uri("/train")
            .set_json(json!({ "prices": trending_closes(60), "epochs": 100_001 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(!state.predictor().is_trained());
        assert_eq!(state.generation(), 0);
    }

    #[actix_web::test]
    async fn test_predict_rejects_too_many_steps() {
        let mut settings = Settings::default();
        settings.model.max_forecast_steps = 10;
        let state = app_state(settings);
        state.predictor().train(&trending_closes(20), 20).unwrap();
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        for steps in [json!(11), json!(u64::MAX)] {
            let req = test::TestRequest::post()
                .uri("/predict")
                .set_json(json!({ "prices": sample_closes(), "steps": steps }))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body["error"], json!("steps must be at most 10"));
        }

        let req = test::TestRequest::post()
            .uri("/predict")
            .set_json(json!({ "prices": sample_closes(), "steps": 10 }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["predictions"].as_array().unwrap().len(), 10);
    }

    #[actix_web::test]
    async fn test_model_round_trip() {
        let state = app_state(Settings::default());
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let req = test::TestRequest::get().uri("/model").to_request();
        let snapshot: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(snapshot["layers"], json!([5, 10, 1]));
        assert!(snapshot.get("learningRate").is_some());

        let req = test::TestRequest::put().uri("/model").set_json(&snapshot).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(state.generation(), 1);

        let req = test::TestRequest::get().uri("/status").to_request();
        let status: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(status["trained"], json!(true));

        let mut broken = snapshot.clone();
        broken["layers"] = json!([5, 10, 2]);
        let req = test::TestRequest::put().uri("/model").set_json(&broken).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(state.generation(), 1);
    }

    #[actix_web::test]
    async fn test_stock_data_validation() {
        let app = test::init_service(App::new().app_data(app_state(Settings::default())).configure(configure)).await;

        let req = test::TestRequest::get().uri("/stock-data").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get().uri("/stock-data?symbol=AAPL").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], json!("Polygon.io API key not set"));
    }

    #[actix_web::test]
    async fn test_sample_data() {
        let app = test::init_service(App::new().app_data(app_state(Settings::default())).configure(configure)).await;
        let req = test::TestRequest::get().uri("/sample-data").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.as_array().unwrap().len(), 49);
        assert_eq!(body[0]["date"], json!("2024-05-01"));
    }

    #[actix_web::test]
    async fn test_upload() {
        let app = test::init_service(App::new().app_data(app_state(Settings::default())).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/upload")
            .set_payload(r#"[{"date":"2024-05-01","close":150.12},{"date":"2024-05-02","close":151.34}]"#)
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.as_array().unwrap().len(), 2);

        let req = test::TestRequest::post().uri("/upload").set_payload("{oops").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
