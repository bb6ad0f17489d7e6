//! Input validation: make sure a payload is worth a round trip.
//!
//! The service rejects oversized or non-image uploads anyway, but only after
//! we have base64-encoded and sent them. Checking size and magic bytes here
//! turns those into immediate, descriptive errors and keeps bad input from
//! ever creating a remote job.

use crate::error::OcrError;
use image::ImageFormat;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Image formats accepted for analysis.
pub const SUPPORTED_FORMATS: &[ImageFormat] = &[
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::Gif,
    ImageFormat::Bmp,
    ImageFormat::Tiff,
    ImageFormat::WebP,
];

/// Check a payload is non-empty, within `max_bytes`, and a supported image.
///
/// Returns the detected MIME type.
pub fn validate_payload(bytes: &[u8], max_bytes: usize) -> Result<&'static str, OcrError> {
    if bytes.is_empty() {
        return Err(OcrError::EmptyDocument);
    }
    if bytes.len() > max_bytes {
        return Err(OcrError::DocumentTooLarge {
            size: bytes.len(),
            limit: max_bytes,
        });
    }
    match image::guess_format(bytes) {
        Ok(format) if SUPPORTED_FORMATS.contains(&format) => Ok(format.to_mime_type()),
        _ => Err(OcrError::NotAnImage {
            magic: bytes.iter().take(8).copied().collect(),
        }),
    }
}

/// Read and validate a local image file.
pub async fn load_image(path: &Path, max_bytes: usize) -> Result<Vec<u8>, OcrError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(OcrError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(_) => {
            return Err(OcrError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
    };
    let mime = validate_payload(&bytes, max_bytes)?;
    debug!("Loaded {} ({}, {} bytes)", path.display(), mime, bytes.len());
    Ok(bytes)
}

/// Does the file extension name a supported image format?
pub fn is_image_path(path: &Path) -> bool {
    ImageFormat::from_path(path)
        .map(|f| SUPPORTED_FORMATS.contains(&f))
        .unwrap_or(false)
}

/// Default document title for a file: its stem, or `"document"`.
pub fn title_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "document".to_string())
}

/// List supported image files directly inside `dir`, sorted by name.
pub fn image_files_in(dir: &Path) -> Result<Vec<PathBuf>, OcrError> {
    let entries = std::fs::read_dir(dir).map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => OcrError::PermissionDenied {
            path: dir.to_path_buf(),
        },
        _ => OcrError::FileNotFound {
            path: dir.to_path_buf(),
        },
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && is_image_path(p))
        .collect();
    files.sort();
    Ok(files)
}
