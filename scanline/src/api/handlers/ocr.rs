use std::path::Path;
use std::time::{Duration, Instant};

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::extractors::{is_image_part, upload_hint, ImageUpload};
use crate::api::state::AppState;
use crate::error::{ErrorBody, Result, ScanlineError};
use crate::ocr::{flatten, DetectionRegion};

/// Recognized text, one entry per detected line in engine order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct OcrResponse {
    pub lines: Vec<String>,
}

/// `POST /ocr`
///
/// Stores the uploaded image in a scratch file, runs OCR on it and returns
/// the flattened lines. The scratch file is removed before responding,
/// whatever the outcome.
#[utoipa::path(
    post,
    path = "/ocr",
    tag = "ocr",
    operation_id = "ocr.recognize",
    request_body(content_type = "multipart/form-data", content = String, description = "Image upload in a `file` part (JPEG, PNG, ...)"),
    responses(
        (status = 200, description = "Recognized text lines", body = OcrResponse),
        (status = 400, description = "Missing, empty or malformed upload", body = ErrorBody),
        (status = 413, description = "Upload exceeds the size limit", body = ErrorBody),
        (status = 422, description = "Upload is not a readable image", body = ErrorBody),
        (status = 500, description = "Storage or engine failure", body = ErrorBody),
        (status = 503, description = "OCR engine unavailable", body = ErrorBody),
        (status = 504, description = "OCR timed out", body = ErrorBody),
    )
)]
pub async fn recognize(
    State(state): State<AppState>,
    ImageUpload(mut multipart): ImageUpload,
) -> Result<Json<OcrResponse>> {
    let started = Instant::now();

    let artifact = loop {
        let Some(field) = multipart.next_field().await? else {
            return Err(ScanlineError::Input(
                "Missing file part: send the image as multipart field 'file'".to_string(),
            ));
        };
        if !is_image_part(&field) {
            continue;
        }
        let hint = upload_hint(&field);
        break state.scratch.acquire(field, &hint).await?;
    };

    let outcome = detect(&state, artifact.path()).await;
    artifact.release().await;

    if let Err(e) = &outcome {
        warn!(error = %e, "OCR detection failed");
    }
    let lines = flatten(outcome?);

    info!(
        lines = lines.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "OCR request completed"
    );
    Ok(Json(OcrResponse { lines }))
}

async fn detect(state: &AppState, path: &Path) -> Result<Vec<DetectionRegion>> {
    let timeout_secs = state.config.ocr.timeout_secs;
    if timeout_secs == 0 {
        return state.ocr.detect(path).await;
    }

    tokio::time::timeout(Duration::from_secs(timeout_secs), state.ocr.detect(path))
        .await
        .unwrap_or_else(|_| Err(ScanlineError::Timeout(timeout_secs)))
}
