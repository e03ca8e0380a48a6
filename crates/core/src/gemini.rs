//! Edit request client for the Gemini image model.
//!
//! [`EditClient`] turns an [`EditRequest`] into a three part user turn
//! (base image, logo image, instruction), hands it to an [`ImageEditBackend`]
//! and picks the first inline image out of the reply. [`GeminiClient`] is the
//! backend that talks to the hosted API.

use crate::config::Config;
use crate::encoding::{EncodedPayload, ImageEncoder};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use gemini_rust::{Blob, Content, Gemini, GenerationConfig, Message, Part, Role};
use std::sync::Arc;
use tracing::{debug, info};

/// Both encoded images and the instruction for a single edit.
///
/// Only constructible with a non-empty instruction; immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditRequest {
    base: EncodedPayload,
    logo: EncodedPayload,
    instruction: String,
}

impl EditRequest {
    /// # Errors
    ///
    /// Returns [`AppError::MissingInput`] if `instruction` is blank.
    pub fn new(base: EncodedPayload, logo: EncodedPayload, instruction: impl Into<String>) -> Result<Self> {
        let instruction = instruction.into();
        if instruction.trim().is_empty() {
            return Err(AppError::MissingInput);
        }

        Ok(Self {
            base,
            logo,
            instruction,
        })
    }

    pub fn base(&self) -> &EncodedPayload {
        &self.base
    }

    pub fn logo(&self) -> &EncodedPayload {
        &self.logo
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    /// Builds the request parts: base image, logo image, then the text.
    pub fn to_parts(&self) -> Vec<Part> {
        vec![
            inline_part(&self.base),
            inline_part(&self.logo),
            Part::Text {
                text: self.instruction.clone(),
                thought: None,
                thought_signature: None,
            },
        ]
    }
}

fn inline_part(payload: &EncodedPayload) -> Part {
    Part::InlineData {
        inline_data: Blob {
            mime_type: payload.media_type.clone(),
            data: payload.content_base64.clone(),
        },
    }
}

/// Returns the data URI of the first part carrying inline image data.
///
/// # Errors
///
/// Returns [`AppError::NoImageReturned`] if no part has inline data.
pub fn first_inline_image(parts: &[Part]) -> Result<String> {
    parts
        .iter()
        .find_map(|part| match part {
            Part::InlineData { inline_data, .. } => Some(ImageEncoder::to_data_uri(
                &inline_data.mime_type,
                &inline_data.data,
            )),
            _ => None,
        })
        .ok_or(AppError::NoImageReturned)
}

/// A remote service that answers one user turn with content parts.
#[async_trait]
pub trait ImageEditBackend: Send + Sync {
    /// Sends `parts` as a single user message and returns the parts of the
    /// first candidate, empty if there is none.
    ///
    /// Failures of the call itself are reported as [`AppError::RemoteService`].
    async fn generate(&self, parts: Vec<Part>) -> Result<Vec<Part>>;
}

/// Stateless single-shot client: one backend call per [`submit`](Self::submit).
#[derive(Clone)]
pub struct EditClient {
    backend: Arc<dyn ImageEditBackend>,
}

impl EditClient {
    pub fn new(backend: Arc<dyn ImageEditBackend>) -> Self {
        Self { backend }
    }

    /// Sends `request` and returns the generated image as a data URI.
    ///
    /// No retry is attempted on failure.
    pub async fn submit(&self, request: &EditRequest) -> Result<String> {
        let parts = request.to_parts();
        debug!(
            base_type = %request.base().media_type,
            logo_type = %request.logo().media_type,
            "submitting edit request"
        );

        let response = self.backend.generate(parts).await?;
        debug!(parts = response.len(), "received response");

        first_inline_image(&response)
    }
}

/// Backend for the hosted Gemini API.
pub struct GeminiClient {
    client: Gemini,
    model_name: String,
}

impl GeminiClient {
    pub fn new(config: &Config) -> Result<Self> {
        // Explicit base URL avoids the BadScheme error in the client.
        let base_url = url::Url::parse("https://generativelanguage.googleapis.com/v1beta/")
            .map_err(|e| AppError::Config(format!("Invalid base URL: {}", e)))?;

        let model_name = if config.model_name.starts_with("models/") {
            config.model_name.clone()
        } else {
            format!("models/{}", config.model_name)
        };
        let model_url = format!("https://generativelanguage.googleapis.com/v1beta/{}", model_name);

        let client = Gemini::with_model_and_base_url(&config.gemini_api_key, model_url, base_url)
            .map_err(|e| AppError::Config(format!("Failed to create Gemini client: {}", e)))?;

        Ok(Self { client, model_name })
    }
}

#[async_trait]
impl ImageEditBackend for GeminiClient {
    async fn generate(&self, parts: Vec<Part>) -> Result<Vec<Part>> {
        let message = Message {
            role: Role::User,
            content: Content {
                role: Some(Role::User),
                parts: Some(parts),
            },
        };

        // Only image output is acceptable.
        let generation_config = GenerationConfig {
            response_modalities: Some(vec!["IMAGE".to_string()]),
            ..Default::default()
        };

        info!(model = %self.model_name, "calling Gemini");
        let response = self
            .client
            .generate_content()
            .with_messages(vec![message])
            .with_generation_config(generation_config)
            .execute()
            .await
            .map_err(|e| AppError::remote(format!("API request failed: {:?}", e)))?;

        Ok(response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content.parts)
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(media_type: &str, len: usize) -> EncodedPayload {
        EncodedPayload {
            content_base64: "A".repeat(len),
            media_type: media_type.to_string(),
        }
    }

    #[test]
    fn blank_instruction_is_rejected() {
        let err = EditRequest::new(payload("image/png", 4), payload("image/png", 4), "  ").unwrap_err();
        assert!(matches!(err, AppError::MissingInput));
    }

    #[test]
    fn parts_are_base_logo_then_text() {
        // 2 MB PNG and 1 MB JPEG, base64 inflated.
        let base = payload("image/png", 2_796_204);
        let logo = payload("image/jpeg", 1_398_104);
        let request = EditRequest::new(base.clone(), logo.clone(), "put the logo on the shirt").unwrap();

        let parts = request.to_parts();
        assert_eq!(parts.len(), 3);

        match &parts[0] {
            Part::InlineData { inline_data, .. } => {
                assert_eq!(inline_data.mime_type, "image/png");
                assert_eq!(inline_data.data, base.content_base64);
            }
            _ => panic!("first part should be the base image"),
        }
        match &parts[1] {
            Part::InlineData { inline_data, .. } => {
                assert_eq!(inline_data.mime_type, "image/jpeg");
                assert_eq!(inline_data.data, logo.content_base64);
            }
            _ => panic!("second part should be the logo image"),
        }
        match &parts[2] {
            Part::Text { text, .. } => assert_eq!(text, "put the logo on the shirt"),
            _ => panic!("last part should be the instruction"),
        }
    }

    #[test]
    fn first_inline_image_skips_text() {
        let parts = vec![
            Part::Text {
                text: "Here you go".to_string(),
                thought: None,
                thought_signature: None,
            },
            inline_part(&payload("image/png", 8)),
            inline_part(&payload("image/jpeg", 4)),
        ];

        assert_eq!(
            first_inline_image(&parts).unwrap(),
            "data:image/png;base64,AAAAAAAA"
        );
    }

    #[test]
    fn no_inline_image_is_an_error() {
        let parts = vec![Part::Text {
            text: "I can't do that".to_string(),
            thought: None,
            thought_signature: None,
        }];

        assert!(matches!(first_inline_image(&parts), Err(AppError::NoImageReturned)));
        assert!(matches!(first_inline_image(&[]), Err(AppError::NoImageReturned)));
    }

    #[test]
    fn client_accepts_bare_model_name() {
        let config = Config::builder()
            .with_api_key("test-key")
            .with_model("gemini-2.5-flash-image-preview")
            .build()
            .unwrap();

        let client = GeminiClient::new(&config).unwrap();
        assert_eq!(client.model_name, "models/gemini-2.5-flash-image-preview");
    }
}
