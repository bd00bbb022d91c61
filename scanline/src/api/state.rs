use std::sync::Arc;

use crate::config::Config;
use crate::ocr::OcrProvider;
use crate::scratch::ScratchDir;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Shared engine handle; built once at startup.
    pub ocr: OcrProvider,
    pub scratch: ScratchDir,
}

impl AppState {
    pub fn new(config: Config, ocr: OcrProvider) -> Self {
        let scratch = ScratchDir::new(&config.scratch);

        Self {
            config: Arc::new(config),
            ocr,
            scratch,
        }
    }
}
