//! Binary encoding of local image files for transmission to the Gemini API.
//!
//! Files are read asynchronously, base64 encoded with the standard alphabet,
//! and tagged with the media type declared at intake. This module also
//! builds and parses the `data:<media type>;base64,<content>` URIs used for
//! previews and for the returned image.

use crate::error::{AppError, Result};
use crate::intake::ImageFile;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use tracing::debug;

/// Base64 content plus declared media type, ready to be sent inline.
///
/// Built right before a request and dropped with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPayload {
    pub content_base64: String,
    pub media_type: String,
}

impl EncodedPayload {
    /// Renders this payload as a data URI.
    pub fn to_data_uri(&self) -> String {
        ImageEncoder::to_data_uri(&self.media_type, &self.content_base64)
    }
}

/// Encoding utilities for the submission workflow.
pub struct ImageEncoder;

impl ImageEncoder {
    /// Reads `file` and encodes its bytes to base64.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Read`] if the file cannot be read or the number of
    /// bytes read differs from the size declared at intake.
    pub async fn encode(file: &ImageFile) -> Result<EncodedPayload> {
        let bytes = Self::read_all(file).await?;

        Ok(EncodedPayload {
            content_base64: BASE64.encode(&bytes),
            media_type: file.media_type.clone(),
        })
    }

    /// Reads the whole file, checking it against the declared size.
    pub(crate) async fn read_all(file: &ImageFile) -> Result<Vec<u8>> {
        let shown = file.path.display().to_string();

        let bytes = tokio::fs::read(&file.path)
            .await
            .map_err(|e| AppError::read(&shown, e.to_string()))?;

        if bytes.len() as u64 != file.size {
            return Err(AppError::read(
                &shown,
                format!("expected {} bytes, read {}", file.size, bytes.len()),
            ));
        }

        debug!(path = %shown, bytes = bytes.len(), "read image file");
        Ok(bytes)
    }

    /// Formats `data:<media_type>;base64,<content>`.
    pub fn to_data_uri(media_type: &str, content_base64: &str) -> String {
        format!("data:{};base64,{}", media_type, content_base64)
    }

    /// Splits a base64 data URI into its media type and decoded bytes.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::InvalidDataUri`] if the prefix or the `;base64,`
    /// marker is missing, or the payload is not valid base64.
    pub fn parse_data_uri(uri: &str) -> Result<(String, Vec<u8>)> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| AppError::InvalidDataUri("missing `data:` prefix".to_string()))?;

        let (media_type, content) = rest
            .split_once(";base64,")
            .ok_or_else(|| AppError::InvalidDataUri("missing `;base64,` marker".to_string()))?;

        let bytes = BASE64
            .decode(content)
            .map_err(|e| AppError::InvalidDataUri(e.to_string()))?;

        Ok((media_type.to_string(), bytes))
    }
}
