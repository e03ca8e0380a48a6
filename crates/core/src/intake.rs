//! Image intake: validation of user-selected files.
//!
//! A candidate is checked against the size limit and the media type policy
//! of the source it came from before any of its bytes are read. Accepted
//! candidates carry a data URI preview and keep the file handle so the
//! request can be encoded later.
//!
//! # Media type policy
//!
//! Files chosen through the picker must be PNG, JPEG or WEBP. Files dropped
//! onto the window only need an `image/*` type. The two sources differ on
//! purpose; see [`IntakeSource`].

use crate::encoding::ImageEncoder;
use crate::error::{AppError, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::ImageFormat;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Largest accepted file, in bytes (4 MiB).
pub const MAX_IMAGE_BYTES: u64 = 4 * 1024 * 1024;

/// Media types accepted by the picker.
pub const ALLOWED_MEDIA_TYPES: &[&str] = &["image/png", "image/jpeg", "image/webp"];

/// Where a candidate file came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntakeSource {
    /// File dialog, filtered to [`ALLOWED_MEDIA_TYPES`].
    #[default]
    Picker,
    /// Drag and drop, any `image/*` type passes.
    DragDrop,
}

impl IntakeSource {
    /// Returns whether `media_type` passes this source's policy.
    pub fn permits(&self, media_type: &str) -> bool {
        match self {
            Self::Picker => ALLOWED_MEDIA_TYPES
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(media_type)),
            Self::DragDrop => media_type
                .get(..6)
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case("image/")),
        }
    }
}

/// Handle to a local image file with its declared media type and size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub path: PathBuf,
    pub media_type: String,
    pub size: u64,
}

impl ImageFile {
    pub fn new(path: impl Into<PathBuf>, media_type: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            media_type: media_type.into(),
            size,
        }
    }

    /// Stats `path` and derives the media type from its extension.
    ///
    /// Unknown extensions get `application/octet-stream`, which every
    /// [`IntakeSource`] rejects.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| AppError::read(path.display().to_string(), e.to_string()))?;

        Ok(Self::new(path, media_type_for(path), metadata.len()))
    }
}

/// Guesses a media type from the file extension.
pub fn media_type_for(path: &Path) -> String {
    ImageFormat::from_path(path)
        .map(|format| format.to_mime_type().to_string())
        .unwrap_or_else(|_| "application/octet-stream".to_string())
}

/// An accepted image: the original handle plus a displayable preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedImage {
    pub raw_file: ImageFile,
    /// `data:<media type>;base64,<content>` of the whole file.
    pub preview: String,
}

impl SelectedImage {
    pub fn media_type(&self) -> &str {
        &self.raw_file.media_type
    }
}

/// Validates `candidate` for `source` and reads it into a preview.
///
/// # Errors
///
/// - [`AppError::Oversize`] if the declared size exceeds [`MAX_IMAGE_BYTES`];
///   nothing is read in that case.
/// - [`AppError::UnsupportedMediaType`] if `source` does not permit the type.
/// - [`AppError::Read`] if reading the file fails.
pub async fn accept(candidate: ImageFile, source: IntakeSource) -> Result<SelectedImage> {
    validate(&candidate, source)?;

    let bytes = ImageEncoder::read_all(&candidate).await?;
    let preview = ImageEncoder::to_data_uri(&candidate.media_type, &BASE64.encode(&bytes));

    debug!(
        path = %candidate.path.display(),
        media_type = %candidate.media_type,
        size = candidate.size,
        ?source,
        "accepted image"
    );

    Ok(SelectedImage {
        raw_file: candidate,
        preview,
    })
}

/// Checks the declared size and media type without touching the file.
pub fn validate(candidate: &ImageFile, source: IntakeSource) -> Result<()> {
    if candidate.size > MAX_IMAGE_BYTES {
        return Err(AppError::Oversize {
            size: candidate.size,
            limit: MAX_IMAGE_BYTES,
        });
    }

    if !source.permits(&candidate.media_type) {
        return Err(AppError::UnsupportedMediaType(candidate.media_type.clone()));
    }

    Ok(())
}
