//! Logo-Compose Core Library
//!
//! This library provides the core workflow of the logo-compose tool: pick a
//! base image and a logo, describe the edit, and let Google's Gemini image
//! model produce the composited picture.
//!
//! # Overview
//!
//! - **Image Intake**: size and media type validation plus previews via [`intake`]
//! - **Encoding**: base64 payloads and data URIs via [`encoding`]
//! - **AI Integration**: the single Gemini edit call via [`gemini`]
//! - **Session**: the workflow state machine via [`session`]
//!
//! # Quick Start
//!
//! ```ignore
//! use logo_compose_core::{Config, ImageFile, ImageSlot, IntakeSource, Session};
//!
//! logo_compose_core::init();
//! let config = Config::load()?;
//! let mut session = Session::from_config(&config)?;
//!
//! let base = ImageFile::from_path("shirt.png").await?;
//! let logo = ImageFile::from_path("logo.jpg").await?;
//! session.select_image(ImageSlot::Base, base, IntakeSource::Picker).await?;
//! session.select_image(ImageSlot::Logo, logo, IntakeSource::Picker).await?;
//! session.set_instruction("put the logo on the shirt");
//!
//! session.submit_and_wait().await?;
//! if let Some(uri) = session.result_image() {
//!     println!("{}", uri);
//! }
//! ```

pub mod config;
pub mod encoding;
pub mod error;
pub mod gemini;
pub mod intake;
pub mod session;

// Re-export primary types for convenience
pub use config::Config;
pub use encoding::{EncodedPayload, ImageEncoder};
pub use error::{AppError, Result};
pub use gemini::{EditClient, EditRequest, GeminiClient, ImageEditBackend};
pub use intake::{ImageFile, IntakeSource, SelectedImage};
pub use session::{ImageSlot, Session, WorkflowState};

/// Loads `.env` files if present.
///
/// Call this once at application startup before [`Config::load`].
pub fn init() {
    let _ = dotenvy::dotenv();
}
