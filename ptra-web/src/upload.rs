//! Project image uploads
//!
//! Checks run in order: size, extension, decodability. Nothing touches the
//! disk until all three pass. Images larger than the configured pixel box
//! are downsampled to fit it, keeping the aspect ratio.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat};
use ptra_common::config::UploadLimits;
use ptra_common::db::images;
use sqlx::SqlitePool;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const JPEG_QUALITY: u8 = 85;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("No file uploaded or upload error occurred.")]
    Missing,

    #[error("File size exceeds maximum allowed size of {0}MB.")]
    TooLarge(usize),

    #[error("Invalid file type. Allowed types: {0}")]
    InvalidType(String),

    #[error("Uploaded file is not a valid image.")]
    NotAnImage,

    #[error("Failed to save uploaded image.")]
    Storage(String),
}

impl UploadError {
    pub fn too_large(limits: &UploadLimits) -> Self {
        UploadError::TooLarge(limits.max_file_size / (1024 * 1024))
    }
}

/// Lowercased extension of a client-supplied filename
pub fn file_extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
}

/// Size and extension checks. Returns the normalized extension.
pub fn validate_upload(filename: &str, size: usize, limits: &UploadLimits) -> Result<String, UploadError> {
    if filename.is_empty() || size == 0 {
        return Err(UploadError::Missing);
    }
    if size > limits.max_file_size {
        return Err(UploadError::too_large(limits));
    }
    match file_extension(filename) {
        Some(ext) if limits.allowed_extensions.iter().any(|allowed| *allowed == ext) => Ok(ext),
        _ => Err(UploadError::InvalidType(limits.allowed_extensions.join(", "))),
    }
}

fn encode(img: &DynamicImage, ext: &str) -> Result<Vec<u8>, UploadError> {
    let mut buf = Vec::new();
    let result = match ext {
        "jpg" | "jpeg" => {
            JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY).encode_image(&img.to_rgb8())
        }
        other => {
            let format = ImageFormat::from_extension(other).unwrap_or(ImageFormat::Png);
            img.write_to(&mut Cursor::new(&mut buf), format)
        }
    };
    result.map_err(|e| UploadError::Storage(e.to_string()))?;
    Ok(buf)
}

/// Decode the bytes and downsample when over the pixel box.
///
/// Returns the bytes to store: the original upload when no resize was
/// needed, otherwise the re-encoded image. CPU-bound; run it on the
/// blocking pool.
pub fn process_image(bytes: &[u8], ext: &str, limits: &UploadLimits) -> Result<Vec<u8>, UploadError> {
    let img = image::load_from_memory(bytes).map_err(|_| UploadError::NotAnImage)?;
    let (width, height) = img.dimensions();

    if width <= limits.max_width && height <= limits.max_height {
        return Ok(bytes.to_vec());
    }

    let resized = img.resize(limits.max_width, limits.max_height, FilterType::Lanczos3);
    debug!(
        "Downsampled upload from {}x{} to {}x{}",
        width,
        height,
        resized.width(),
        resized.height()
    );
    encode(&resized, ext)
}

/// Stored filename for a project image
pub fn stored_filename(project_id: i64, ext: &str) -> String {
    format!("img_{}_{}.{}", project_id, uuid::Uuid::new_v4().simple(), ext)
}

/// A validated upload waiting to be stored
pub struct PendingUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub caption: Option<String>,
}

/// Validate, process and persist an upload, returning the stored filename.
///
/// The file is written before the metadata row; if the insert fails the
/// file is removed again.
pub async fn store_upload(
    pool: &SqlitePool,
    upload_dir: &Path,
    limits: &UploadLimits,
    project_id: i64,
    uploaded_by: i64,
    upload: PendingUpload,
) -> Result<String, UploadError> {
    let ext = validate_upload(&upload.filename, upload.bytes.len(), limits)?;

    let processing_limits = limits.clone();
    let processing_ext = ext.clone();
    let bytes = upload.bytes;
    let data = tokio::task::spawn_blocking(move || {
        process_image(&bytes, &processing_ext, &processing_limits)
    })
    .await
    .map_err(|e| UploadError::Storage(e.to_string()))??;

    tokio::fs::create_dir_all(upload_dir)
        .await
        .map_err(|e| UploadError::Storage(e.to_string()))?;

    let filename = stored_filename(project_id, &ext);
    let path: PathBuf = upload_dir.join(&filename);
    tokio::fs::write(&path, &data)
        .await
        .map_err(|e| UploadError::Storage(e.to_string()))?;

    let caption = upload.caption.as_deref().map(str::trim).filter(|c| !c.is_empty());
    if let Err(e) = images::insert_image(pool, project_id, &filename, caption, uploaded_by).await {
        warn!("Image record insert failed, removing {}: {}", path.display(), e);
        if let Err(remove_err) = tokio::fs::remove_file(&path).await {
            warn!("Failed to remove orphaned upload {}: {}", path.display(), remove_err);
        }
        return Err(UploadError::Storage(e.to_string()));
    }

    info!("Stored image {} for project {}", filename, project_id);
    Ok(filename)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 128]));
        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    fn small_limits() -> UploadLimits {
        UploadLimits {
            max_width: 40,
            max_height: 20,
            ..UploadLimits::default()
        }
    }

    #[test]
    fn test_extension_case_insensitive() {
        assert_eq!(file_extension("photo.JPG").as_deref(), Some("jpg"));
        assert_eq!(file_extension("archive.tar.GZ").as_deref(), Some("gz"));
        assert_eq!(file_extension("noext"), None);
    }

    #[test]
    fn test_validate_rejects_in_order() {
        let limits = UploadLimits::default();

        assert!(matches!(validate_upload("", 10, &limits), Err(UploadError::Missing)));
        assert!(matches!(
            validate_upload("huge.exe", limits.max_file_size + 1, &limits),
            Err(UploadError::TooLarge(5))
        ));
        let err = validate_upload("script.php", 10, &limits).unwrap_err();
        assert_eq!(err.to_string(), "Invalid file type. Allowed types: jpg, jpeg, png, gif");
        assert_eq!(validate_upload("Site.PNG", 10, &limits).unwrap(), "png");
        assert_eq!(
            validate_upload("big.jpg", limits.max_file_size + 1, &limits)
                .unwrap_err()
                .to_string(),
            "File size exceeds maximum allowed size of 5MB."
        );
    }

    #[test]
    fn test_undecodable_bytes_rejected() {
        let result = process_image(b"definitely not an image", "png", &UploadLimits::default());
        assert!(matches!(result, Err(UploadError::NotAnImage)));
    }

    #[test]
    fn test_small_image_kept_verbatim() {
        let bytes = png_bytes(10, 10);
        let stored = process_image(&bytes, "png", &small_limits()).unwrap();
        assert_eq!(stored, bytes);
    }

    #[test]
    fn test_large_image_downsampled_keeping_aspect_and_alpha() {
        let bytes = png_bytes(200, 50);
        let stored = process_image(&bytes, "png", &small_limits()).unwrap();
        let img = image::load_from_memory(&stored).unwrap();
        assert_eq!(img.dimensions(), (40, 10));
        assert!(img.color().has_alpha());
    }

    #[test]
    fn test_jpeg_reencoded() {
        let bytes = png_bytes(100, 100);
        let stored = process_image(&bytes, "jpg", &small_limits()).unwrap();
        assert_eq!(image::guess_format(&stored).unwrap(), ImageFormat::Jpeg);
        let img = image::load_from_memory(&stored).unwrap();
        assert_eq!(img.dimensions(), (20, 20));
    }

    #[test]
    fn test_stored_filename_shape() {
        let name = stored_filename(7, "png");
        assert!(name.starts_with("img_7_"));
        assert!(name.ends_with(".png"));
        assert_eq!(name.len(), "img_7_".len() + 32 + ".png".len());
    }
}
