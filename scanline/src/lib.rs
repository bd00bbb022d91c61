//! Scanline: a stateless HTTP service that returns the text lines an OCR
//! engine finds in an uploaded image.

pub mod api;
pub mod config;
pub mod error;
pub mod ocr;
pub mod scratch;

pub use error::{Result, ScanlineError};
