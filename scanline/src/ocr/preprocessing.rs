use crate::config::OcrConfig;
use crate::error::{Result, ScanlineError};
use image::{DynamicImage, GenericImageView, GrayImage, ImageFormat, ImageReader};

/// Normalize an uploaded image before recognition.
///
/// 1. Decodes the bytes, guessing the format from content
/// 2. Rejects images below the configured minimum dimension
/// 3. Downscales images above the maximum dimension (aspect ratio kept)
/// 4. Converts to 8-bit grayscale, dropping any alpha channel
/// 5. Stretches contrast to the full 0-255 range
///
/// Returns PNG-encoded bytes.
pub fn preprocess_image(bytes: &[u8], config: &OcrConfig) -> Result<Vec<u8>> {
    let img = decode(bytes)?;

    let (width, height) = img.dimensions();
    if width < config.min_image_dimension || height < config.min_image_dimension {
        return Err(ScanlineError::UnreadableImage(format!(
            "Image too small: {}x{}, minimum {}x{}",
            width, height, config.min_image_dimension, config.min_image_dimension
        )));
    }

    let img = resize_if_needed(img, config.max_image_dimension);
    let gray = stretch_contrast(img.to_luma8());

    let mut output = Vec::new();
    DynamicImage::ImageLuma8(gray)
        .write_to(&mut std::io::Cursor::new(&mut output), ImageFormat::Png)
        .map_err(|e| ScanlineError::Engine(format!("Failed to encode image: {e}")))?;

    Ok(output)
}

fn decode(bytes: &[u8]) -> Result<DynamicImage> {
    if bytes.is_empty() {
        return Err(ScanlineError::UnreadableImage(
            "Image data is empty".to_string(),
        ));
    }

    ImageReader::new(std::io::Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ScanlineError::UnreadableImage(format!("Failed to read image: {e}")))?
        .decode()
        .map_err(|e| ScanlineError::UnreadableImage(format!("Failed to decode image: {e}")))
}

/// Uses Lanczos3 for high-quality downscaling
fn resize_if_needed(img: DynamicImage, max_dim: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    if max_dim == 0 || (width <= max_dim && height <= max_dim) {
        return img;
    }

    let ratio = max_dim as f32 / width.max(height) as f32;
    let new_width = ((width as f32 * ratio) as u32).max(1);
    let new_height = ((height as f32 * ratio) as u32).max(1);

    img.resize(new_width, new_height, image::imageops::FilterType::Lanczos3)
}

/// Linear histogram stretch: darkest pixel to 0, lightest to 255.
fn stretch_contrast(gray: GrayImage) -> GrayImage {
    let (min_val, max_val) = gray
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));

    // flat image
    if max_val <= min_val {
        return gray;
    }

    let range = (max_val - min_val) as f32;
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let value = gray.get_pixel(x, y)[0];
        let normalized = (value - min_val) as f32 / range;
        image::Luma([(normalized * 255.0).round() as u8])
    })
}
