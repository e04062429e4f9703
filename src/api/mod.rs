// src/api/mod.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

use crate::error::{MarketDataError, PredictorError};
use crate::models::{NetworkSnapshot, StockPredictor};
use crate::settings::Settings;

/// Application state shared by every worker
pub struct AppState {
    pub predictor: Arc<Mutex<StockPredictor>>,
    pub settings: Settings,
    pub http: reqwest::Client,
    /// Bumped under the predictor lock every time the model is replaced.
    generation: AtomicU64,
}

impl AppState {
    pub fn new(predictor: StockPredictor, settings: Settings) -> Self {
        AppState {
            predictor: Arc::new(Mutex::new(predictor)),
            settings,
            http: reqwest::Client::new(),
            generation: AtomicU64::new(0),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Copies the current model together with its generation.
    pub fn checkout(&self) -> (StockPredictor, u64) {
        let predictor = self.predictor();
        (predictor.clone(), self.generation())
    }

    /// Installs `candidate` if nothing replaced the model since `expected` was read.
    pub fn commit(&self, candidate: StockPredictor, expected: u64) -> Result<(), ApiError> {
        let mut predictor = self.predictor();
        let current = self.generation();
        if current != expected {
            return Err(ApiError::Conflict(format!(
                "model changed while training (generation {} -> {}); retry the request",
                expected, current
            )));
        }
        *predictor = candidate;
        self.generation.store(current + 1, Ordering::Release);
        Ok(())
    }

    /// Loads a snapshot into the live model and bumps the generation.
    pub fn load_snapshot(&self, snapshot: NetworkSnapshot) -> Result<(), ApiError> {
        let mut predictor = self.predictor();
        predictor.load_model_state(snapshot)?;
        self.generation.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    /// Locks the predictor. A panic mid-update cannot leave it half trained
    /// because training runs on a copy, so a poisoned lock is still usable.
    pub fn predictor(&self) -> MutexGuard<'_, StockPredictor> {
        self.predictor.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Predictor(#[from] PredictorError),

    #[error(transparent)]
    MarketData(#[from] MarketDataError),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Internal(String),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Predictor(PredictorError::ModelNotTrained) => StatusCode::CONFLICT,
            ApiError::Predictor(PredictorError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Predictor(_) => StatusCode::BAD_REQUEST,
            ApiError::MarketData(MarketDataError::NoData(_)) => StatusCode::NOT_FOUND,
            ApiError::MarketData(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

/// Re-export handlers
pub mod handlers;

pub use handlers::configure;

pub type ApiResult = Result<HttpResponse, ApiError>;
