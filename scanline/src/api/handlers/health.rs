use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::state::AppState;
use crate::config::EngineConcurrency;

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct HealthData {
    pub status: String,
    pub version: String,
    pub ocr: OcrStatus,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct OcrStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    pub languages: String,
    pub concurrency: EngineConcurrency,
    pub correct_orientation: bool,
}

/// `GET /health`
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service health status", body = HealthData),
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthData> {
    let ocr_config = state.ocr.config();

    let ocr = OcrStatus {
        status: if state.ocr.is_available() {
            "available".to_string()
        } else {
            "unavailable".to_string()
        },
        engine: state.ocr.engine_name().map(str::to_string),
        languages: ocr_config.languages.clone(),
        concurrency: ocr_config.concurrency,
        correct_orientation: ocr_config.correct_orientation,
    };

    Json(HealthData {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        ocr,
    })
}
