use axum::extract::multipart::Field;
use axum::extract::{FromRequest, Multipart};

use crate::error::ScanlineError;
use crate::scratch::UploadHint;

/// Multipart extractor whose rejections use the service's error shape.
#[derive(FromRequest)]
#[from_request(rejection(ScanlineError))]
pub struct ImageUpload(pub Multipart);

/// The image is the part named `file`, or failing that any part sent as a file.
pub(crate) fn is_image_part(field: &Field<'_>) -> bool {
    field.name() == Some("file") || field.file_name().is_some()
}

pub(crate) fn upload_hint(field: &Field<'_>) -> UploadHint {
    UploadHint {
        file_name: field.file_name().map(str::to_string),
        content_type: field.content_type().map(str::to_string),
    }
}
