// Shared helpers for the HTTP integration tests
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use axum::Router;

use scanline::api::{create_router, AppState};
use scanline::config::{Config, EngineConcurrency, OcrConfig, ScratchConfig, ServerConfig};
use scanline::ocr::{BoundingBox, DetectionLine, DetectionRegion, OcrEngine, OcrProvider};
use scanline::{Result, ScanlineError};

pub use tempfile;

static INIT: Once = Once::new();

/// Initialize tracing subscriber once for tests
pub fn init_test_logger() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

/// Deterministic engine that "reads" UTF-8 text files.
///
/// Blank-line separated blocks become regions, each text line a detection
/// line. Content starting with `FAIL` makes the engine error out and
/// non-UTF-8 content is reported as an unreadable image.
#[derive(Default)]
pub struct TextEngine {
    pub delay: Option<Duration>,
    pub entered: AtomicBool,
    pub seen: Mutex<Vec<PathBuf>>,
}

impl TextEngine {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn seen_paths(&self) -> Vec<PathBuf> {
        self.seen.lock().unwrap().clone()
    }
}

impl OcrEngine for TextEngine {
    fn name(&self) -> &'static str {
        "text"
    }

    fn detect(&self, path: &Path, _correct_orientation: bool) -> Result<Vec<DetectionRegion>> {
        self.seen.lock().unwrap().push(path.to_path_buf());
        let bytes = std::fs::read(path).map_err(|e| ScanlineError::Engine(e.to_string()))?;
        self.entered.store(true, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        let text = String::from_utf8(bytes)
            .map_err(|_| ScanlineError::UnreadableImage("not an image".to_string()))?;
        if text.starts_with("FAIL") {
            return Err(ScanlineError::Engine(
                "simulated engine failure".to_string(),
            ));
        }

        Ok(text
            .split("\n\n")
            .filter(|block| !block.trim().is_empty())
            .map(|block| {
                DetectionRegion::new(
                    BoundingBox::default(),
                    block.lines().map(|l| DetectionLine::new(l, 0.9)).collect(),
                )
            })
            .collect())
    }
}

pub fn test_config(scratch_dir: &Path) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            max_upload_bytes: 1024 * 1024,
        },
        ocr: OcrConfig {
            concurrency: EngineConcurrency::Serialized,
            timeout_secs: 10,
            ..OcrConfig::default()
        },
        scratch: ScratchConfig {
            dir: scratch_dir.to_path_buf(),
            prefix: "upload_".to_string(),
            sweep_on_start: false,
            stale_after_secs: 3600,
        },
    }
}

pub fn app_with_config(engine: Arc<dyn OcrEngine>, config: Config) -> Router {
    init_test_logger();
    let ocr = OcrProvider::with_engine(engine, &config.ocr);
    create_router(AppState::new(config, ocr))
}

pub fn test_app(engine: Arc<dyn OcrEngine>, scratch_dir: &Path) -> Router {
    app_with_config(engine, test_config(scratch_dir))
}

const BOUNDARY: &str = "scanline-test-boundary";

/// Minimal multipart/form-data body builder.
#[derive(Default)]
pub struct MultipartBody {
    body: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn into_request(mut self, uri: &str) -> Request<Body> {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(self.body))
            .unwrap()
    }
}

/// Single `file` part upload to `/ocr`.
pub fn upload(bytes: &[u8]) -> Request<Body> {
    MultipartBody::new()
        .file("file", "receipt.png", "image/png", bytes)
        .into_request("/ocr")
}

pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn scratch_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

pub fn lines_of(json: &serde_json::Value) -> Vec<String> {
    json["lines"]
        .as_array()
        .expect("lines should be an array")
        .iter()
        .map(|v| v.as_str().expect("line should be a string").to_string())
        .collect()
}
