//! OCR (Optical Character Recognition) Module
//!
//! Turns an image on disk into recognized text lines.
//!
//! # Architecture
//!
//! - [`OcrEngine`] is the seam to a concrete recognizer. It is blocking and
//!   returns [`DetectionRegion`]s, each holding [`DetectionLine`]s.
//! - [`TesseractEngine`] implements it locally via leptess, parsing
//!   Tesseract's TSV output into regions and lines.
//! - [`OcrProvider`] is the process-wide adapter handed to request handlers.
//!   It runs the engine on the blocking pool and, depending on
//!   [`EngineConcurrency`](crate::config::EngineConcurrency), serializes calls.
//! - [`flatten`] reduces the nested output to the plain list of lines the API
//!   returns.
//!
//! # Usage
//!
//! ```rust,ignore
//! let ocr = OcrProvider::new(&config.ocr)?;
//! let lines = flatten(ocr.detect(&path).await?);
//! ```

mod engine;
mod flatten;
mod preprocessing;
mod provider;
mod tesseract;
mod tsv;
mod types;

pub use engine::OcrEngine;
pub use flatten::flatten;
pub use preprocessing::preprocess_image;
pub use provider::OcrProvider;
pub use tesseract::TesseractEngine;
pub use tsv::parse_tsv;
pub use types::{BoundingBox, DetectionLine, DetectionRegion};
