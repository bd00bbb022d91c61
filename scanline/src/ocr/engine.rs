use std::path::Path;

use crate::error::Result;

use super::types::DetectionRegion;

/// A text recognition backend.
///
/// `detect` is blocking and may be CPU heavy; callers run it off the async
/// runtime. Implementations must not retry internally.
pub trait OcrEngine: Send + Sync {
    /// Short identifier reported by the health endpoint (e.g. "tesseract").
    fn name(&self) -> &'static str;

    /// Recognize text in the image stored at `path`.
    ///
    /// With `correct_orientation` set the engine detects rotated pages and
    /// reads them upright. A blank image yields an empty vector, not an error.
    fn detect(&self, path: &Path, correct_orientation: bool) -> Result<Vec<DetectionRegion>>;
}
