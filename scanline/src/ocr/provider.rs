use std::path::Path;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::config::{EngineConcurrency, OcrConfig};
use crate::error::{Result, ScanlineError};

use super::engine::OcrEngine;
use super::tesseract::TesseractEngine;
use super::types::DetectionRegion;

#[derive(Clone)]
enum OcrBackend {
    Engine {
        engine: Arc<dyn OcrEngine>,
        /// Single permit when calls must be serialized, `None` otherwise.
        gate: Option<Arc<Semaphore>>,
    },
    Unavailable {
        reason: String,
    },
}

/// Process-wide handle to the OCR engine.
///
/// Built once at startup and shared through `AppState`; clones share the
/// same engine and the same serialization gate.
#[derive(Clone)]
pub struct OcrProvider {
    backend: OcrBackend,
    config: OcrConfig,
}

impl OcrProvider {
    pub fn new(config: &OcrConfig) -> Result<Self> {
        let model_lower = config.model.to_lowercase();

        let backend = match model_lower.as_str() {
            "none" | "disabled" | "off" => OcrBackend::Unavailable {
                reason: "OCR disabled by configuration".to_string(),
            },
            model => {
                if model != "local/tesseract" && model != "tesseract" {
                    warn!(model = %config.model, "Unknown OCR model, falling back to Tesseract");
                }
                match TesseractEngine::new(config) {
                    Ok(engine) => {
                        info!(
                            languages = %config.languages,
                            workers = engine.worker_count(),
                            concurrency = %config.concurrency,
                            "Tesseract OCR initialized"
                        );
                        return Ok(Self::with_engine(Arc::new(engine), config));
                    }
                    Err(e) => {
                        let reason = format!("Tesseract not available: {e}");
                        warn!("{}", reason);
                        OcrBackend::Unavailable { reason }
                    }
                }
            }
        };

        Ok(Self {
            backend,
            config: config.clone(),
        })
    }

    /// Wrap an already constructed engine.
    pub fn with_engine(engine: Arc<dyn OcrEngine>, config: &OcrConfig) -> Self {
        let gate = match config.concurrency {
            EngineConcurrency::Serialized => Some(Arc::new(Semaphore::new(1))),
            EngineConcurrency::Concurrent => None,
        };

        Self {
            backend: OcrBackend::Engine { engine, gate },
            config: config.clone(),
        }
    }

    pub fn unavailable(reason: impl Into<String>, config: &OcrConfig) -> Self {
        Self {
            backend: OcrBackend::Unavailable {
                reason: reason.into(),
            },
            config: config.clone(),
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self.backend, OcrBackend::Unavailable { .. })
    }

    pub fn engine_name(&self) -> Option<&'static str> {
        match &self.backend {
            OcrBackend::Engine { engine, .. } => Some(engine.name()),
            OcrBackend::Unavailable { .. } => None,
        }
    }

    pub fn config(&self) -> &OcrConfig {
        &self.config
    }

    /// Run the engine on the image at `path`.
    ///
    /// No timeout is applied here; the caller decides how long to wait.
    pub async fn detect(&self, path: &Path) -> Result<Vec<DetectionRegion>> {
        let (engine, gate) = match &self.backend {
            OcrBackend::Engine { engine, gate } => (Arc::clone(engine), gate.clone()),
            OcrBackend::Unavailable { reason } => {
                return Err(ScanlineError::EngineUnavailable(reason.clone()))
            }
        };

        let permit = match gate {
            Some(gate) => Some(
                gate.acquire_owned()
                    .await
                    .map_err(|e| ScanlineError::Internal(format!("OCR gate closed: {e}")))?,
            ),
            None => None,
        };

        let path = path.to_path_buf();
        let correct_orientation = self.config.correct_orientation;

        // The permit moves into the blocking task so the engine stays
        // exclusive even if the awaiting request is dropped.
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            engine.detect(&path, correct_orientation)
        })
        .await
        .map_err(|e| ScanlineError::Internal(format!("OCR task panicked: {e}")))?
    }
}
