use axum::Json;
use utoipa::OpenApi;
use utoipa_redoc::{Redoc, Servable};

use super::handlers;
use crate::config::EngineConcurrency;
use crate::error::ErrorBody;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Scanline API",
        version = "1.0.0",
        description = "Upload an image, get back the text lines OCR finds in it.",
    ),
    paths(
        handlers::ocr::recognize,
        handlers::health::health_check,
    ),
    components(schemas(
        handlers::ocr::OcrResponse,
        ErrorBody,
        handlers::health::HealthData,
        handlers::health::OcrStatus,
        EngineConcurrency,
    )),
    tags(
        (name = "ocr", description = "Text recognition"),
        (name = "health", description = "Health check"),
    ),
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn redoc_router<S: Clone + Send + Sync + 'static>() -> axum::Router<S> {
    Redoc::with_url("/docs", ApiDoc::openapi()).into()
}
