use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};

use leptess::{LepTess, Variable};
use tracing::debug;

use crate::config::OcrConfig;
use crate::error::{Result, ScanlineError};

use super::engine::OcrEngine;
use super::preprocessing::preprocess_image;
use super::tsv::parse_tsv;
use super::types::DetectionRegion;

/// Fully automatic page segmentation with orientation and script detection.
const PSM_AUTO_OSD: &str = "1";
/// Fully automatic page segmentation, no OSD.
const PSM_AUTO: &str = "3";

/// Local Tesseract engine backed by a fixed pool of `LepTess` handles.
///
/// A single handle is not reentrant, so each call checks one out for its
/// whole duration. With `workers > 1` independent handles can recognize in
/// parallel.
pub struct TesseractEngine {
    workers: Vec<Mutex<LepTess>>,
    next: AtomicUsize,
    config: OcrConfig,
}

impl TesseractEngine {
    pub fn new(config: &OcrConfig) -> Result<Self> {
        let workers = (0..config.workers.max(1))
            .map(|_| {
                LepTess::new(config.data_path.as_deref(), &config.languages)
                    .map(Mutex::new)
                    .map_err(|e| ScanlineError::EngineUnavailable(e.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            workers,
            next: AtomicUsize::new(0),
            config: config.clone(),
        })
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    fn checkout(&self) -> MutexGuard<'_, LepTess> {
        for worker in &self.workers {
            match worker.try_lock() {
                Ok(guard) => return guard,
                // A panic mid-recognition leaves nothing we rely on; the next
                // call resets the image and page mode anyway.
                Err(TryLockError::Poisoned(poisoned)) => return poisoned.into_inner(),
                Err(TryLockError::WouldBlock) => continue,
            }
        }

        let idx = self.next.fetch_add(1, Ordering::Relaxed) % self.workers.len();
        self.workers[idx]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl OcrEngine for TesseractEngine {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn detect(&self, path: &Path, correct_orientation: bool) -> Result<Vec<DetectionRegion>> {
        let raw = std::fs::read(path)
            .map_err(|e| ScanlineError::Engine(format!("Failed to read image: {e}")))?;

        let bytes = if self.config.preprocess {
            preprocess_image(&raw, &self.config)?
        } else {
            raw
        };

        let psm = if correct_orientation {
            PSM_AUTO_OSD
        } else {
            PSM_AUTO
        };

        let mut lt = self.checkout();
        lt.set_variable(Variable::TesseditPagesegMode, psm)
            .map_err(|e| ScanlineError::Engine(format!("Failed to set page mode: {e}")))?;
        lt.set_image_from_mem(&bytes)
            .map_err(|e| ScanlineError::UnreadableImage(format!("Failed to load image: {e}")))?;
        let tsv = lt
            .get_tsv_text(0)
            .map_err(|e| ScanlineError::Engine(format!("Failed to extract text: {e}")))?;
        drop(lt);

        let regions = parse_tsv(&tsv);
        debug!(
            regions = regions.len(),
            lines = regions.iter().map(|r| r.lines.len()).sum::<usize>(),
            "Tesseract recognition finished"
        );
        Ok(regions)
    }
}
