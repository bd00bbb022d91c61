use serde::Serialize;

/// Axis-aligned bounds of a detected region, in source image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// One transcribed line with the engine's confidence in `0.0..=1.0`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionLine {
    pub text: String,
    pub confidence: f32,
}

impl DetectionLine {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// An area of the image the engine believes contains text.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DetectionRegion {
    pub bounds: BoundingBox,
    pub lines: Vec<DetectionLine>,
}

impl DetectionRegion {
    pub fn new(bounds: BoundingBox, lines: Vec<DetectionLine>) -> Self {
        Self { bounds, lines }
    }
}
