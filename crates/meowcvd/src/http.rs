//! HTTP interface of the daemon.
//!
//! Every endpoint answers with a JSON body carrying `success`; malformed
//! bodies are reported the same way rather than as bare rejections.

use crate::engine::{EngineError, EngineHandle};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use meowcv_core::{ClassificationResult, DetectError, ThresholdConfig, ThresholdUpdate};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

#[derive(Clone)]
pub struct AppState {
    pub engine: EngineHandle,
    pub assets_root: String,
    pub bind: SocketAddr,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/detect", post(detect))
        .route("/update_thresholds", post(update_thresholds))
        .route("/camera_status", get(camera_status))
        .route("/server_info", get(server_info))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DetectRequest {
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct DetectResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cat_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DetectResponse {
    fn error(error: impl ToString) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct ThresholdsResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<ThresholdConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn detect_status(error: &DetectError) -> StatusCode {
    match error {
        DetectError::MissingImage | DetectError::Decode(_) => StatusCode::BAD_REQUEST,
        DetectError::Inference(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn detect(
    State(state): State<AppState>,
    body: Result<Json<DetectRequest>, JsonRejection>,
) -> (StatusCode, Json<DetectResponse>) {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "detect: bad request body");
            return (StatusCode::BAD_REQUEST, Json(DetectResponse::error(rejection.body_text())));
        }
    };

    let result = match state.engine.detect(request.image).await {
        Ok(result) => result,
        Err(e @ (EngineError::Timeout(_) | EngineError::ChannelClosed)) => {
            tracing::warn!(error = %e, "detect: engine unavailable");
            return (StatusCode::SERVICE_UNAVAILABLE, Json(DetectResponse::error(e)));
        }
        Err(e) => {
            tracing::error!(error = %e, "detect: engine failure");
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(DetectResponse::error(e)));
        }
    };

    match result {
        ClassificationResult::Detected {
            category,
            asset,
            message,
            ..
        } => (
            StatusCode::OK,
            Json(DetectResponse {
                success: true,
                expression: Some(category.to_string()),
                cat_image: Some(asset),
                message: Some(message),
                error: None,
            }),
        ),
        ClassificationResult::NoFaceFound => (
            StatusCode::OK,
            Json(DetectResponse {
                success: false,
                expression: Some("none".into()),
                message: Some("no face detected".into()),
                ..DetectResponse::default()
            }),
        ),
        ClassificationResult::Failed(e) => (detect_status(&e), Json(DetectResponse::error(e))),
    }
}

async fn update_thresholds(
    State(state): State<AppState>,
    body: Result<Json<ThresholdUpdate>, JsonRejection>,
) -> (StatusCode, Json<ThresholdsResponse>) {
    let update = match body {
        Ok(Json(update)) => update,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "update_thresholds: bad request body");
            return (
                StatusCode::BAD_REQUEST,
                Json(ThresholdsResponse {
                    error: Some(rejection.body_text()),
                    ..ThresholdsResponse::default()
                }),
            );
        }
    };

    match state.engine.update_thresholds(&update) {
        Ok(thresholds) => (
            StatusCode::OK,
            Json(ThresholdsResponse {
                success: true,
                thresholds: Some(thresholds),
                message: Some("thresholds updated".into()),
                error: None,
            }),
        ),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(ThresholdsResponse {
                error: Some(e.to_string()),
                ..ThresholdsResponse::default()
            }),
        ),
    }
}

async fn camera_status(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "success": true,
        "message": "server ready",
        "requires_https": false,
        "assets_folder": state.assets_root,
        "https_available": false,
    }))
}

async fn server_info(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "success": true,
        "server": "meowcvd",
        "version": env!("CARGO_PKG_VERSION"),
        "bind": state.bind.to_string(),
        "assets": state.assets_root,
        "workers": state.engine.worker_count(),
        "thresholds": state.engine.thresholds(),
        "time": chrono::Local::now().to_rfc3339(),
    }))
}
