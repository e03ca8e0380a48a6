//! Session controller for the edit workflow.
//!
//! The session owns both image slots, the instruction and the single
//! [`WorkflowState`]. A submission moves the state to `Loading` and spawns a
//! background task that encodes both images, calls the edit client and sends
//! the outcome back over a channel. [`Session::process_events`] or
//! [`Session::wait`] apply that outcome.
//!
//! ```text
//! Idle | Succeeded | Failed --submit--> Loading --ok--> Succeeded
//!                                               \-err-> Failed
//! ```

use crate::config::Config;
use crate::encoding::ImageEncoder;
use crate::error::{AppError, Result};
use crate::gemini::{EditClient, EditRequest, GeminiClient, ImageEditBackend};
use crate::intake::{self, ImageFile, IntakeSource, SelectedImage};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

/// File name offered for downloading the result.
///
/// Always `.png`, whatever media type the model returned.
pub const DOWNLOAD_FILE_NAME: &str = "generated-image.png";

/// What the submission flow is currently doing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WorkflowState {
    #[default]
    Idle,
    /// Exactly one request is outstanding.
    Loading,
    /// Data URI of the generated image.
    Succeeded(String),
    /// User-facing failure message.
    Failed(String),
}

/// The two image inputs of an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSlot {
    Base,
    Logo,
}

/// Outcome sent from the background request task.
enum EditEvent {
    Finished(Result<String>),
}

pub struct Session {
    client: EditClient,
    base: Option<SelectedImage>,
    logo: Option<SelectedImage>,
    instruction: String,
    state: WorkflowState,
    tx: UnboundedSender<EditEvent>,
    rx: UnboundedReceiver<EditEvent>,
}

impl Session {
    pub fn new(client: EditClient) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            client,
            base: None,
            logo: None,
            instruction: String::new(),
            state: WorkflowState::Idle,
            tx,
            rx,
        }
    }

    pub fn with_backend(backend: Arc<dyn ImageEditBackend>) -> Self {
        Self::new(EditClient::new(backend))
    }

    /// Creates a session backed by the hosted Gemini API.
    pub fn from_config(config: &Config) -> Result<Self> {
        let backend = GeminiClient::new(config)?;
        Ok(Self::with_backend(Arc::new(backend)))
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, WorkflowState::Loading)
    }

    pub fn image(&self, slot: ImageSlot) -> Option<&SelectedImage> {
        match slot {
            ImageSlot::Base => self.base.as_ref(),
            ImageSlot::Logo => self.logo.as_ref(),
        }
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    /// Data URI of the last generated image, if the last request succeeded.
    pub fn result_image(&self) -> Option<&str> {
        match &self.state {
            WorkflowState::Succeeded(uri) => Some(uri),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.state {
            WorkflowState::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// Whether a submission would start a request right now.
    pub fn can_submit(&self) -> bool {
        !self.is_loading()
            && self.base.is_some()
            && self.logo.is_some()
            && !self.instruction.trim().is_empty()
    }

    pub fn set_instruction(&mut self, instruction: impl Into<String>) {
        self.instruction = instruction.into();
    }

    /// Validates and reads `candidate` into `slot`.
    ///
    /// A successful selection replaces the slot. A rejected one keeps the
    /// previous selection and returns the error. Neither touches the
    /// workflow state.
    pub async fn select_image(
        &mut self,
        slot: ImageSlot,
        candidate: ImageFile,
        source: IntakeSource,
    ) -> Result<()> {
        match intake::accept(candidate, source).await {
            Ok(selected) => {
                *self.slot_mut(slot) = Some(selected);
                Ok(())
            }
            Err(e) => {
                warn!(?slot, error = %e, "image rejected");
                Err(e)
            }
        }
    }

    /// Clears `slot` so the same file can be selected again.
    pub fn remove_image(&mut self, slot: ImageSlot) {
        *self.slot_mut(slot) = None;
    }

    fn slot_mut(&mut self, slot: ImageSlot) -> &mut Option<SelectedImage> {
        match slot {
            ImageSlot::Base => &mut self.base,
            ImageSlot::Logo => &mut self.logo,
        }
    }

    /// Starts an edit request in the background.
    ///
    /// Ignored while `Loading`. With a missing image or a blank instruction
    /// the state becomes `Failed` and no request is made.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&mut self) -> Result<()> {
        if self.is_loading() {
            debug!("submission ignored, request already in flight");
            return Ok(());
        }

        let files = match (&self.base, &self.logo) {
            (Some(base), Some(logo)) if !self.instruction.trim().is_empty() => {
                Some((base.raw_file.clone(), logo.raw_file.clone()))
            }
            _ => None,
        };
        let Some((base, logo)) = files else {
            return self.fail(AppError::MissingInput);
        };

        let instruction = self.instruction.clone();
        let client = self.client.clone();
        let tx = self.tx.clone();

        self.state = WorkflowState::Loading;
        info!("edit request started");

        tokio::spawn(async move {
            let outcome = run_edit(&client, &base, &logo, instruction).await;
            let _ = tx.send(EditEvent::Finished(outcome));
        });

        Ok(())
    }

    fn fail(&mut self, error: AppError) -> Result<()> {
        self.state = WorkflowState::Failed(error.to_string());
        Err(error)
    }

    /// Applies any finished request without blocking.
    ///
    /// Returns true if the state changed.
    pub fn process_events(&mut self) -> bool {
        let mut changed = false;
        while let Ok(event) = self.rx.try_recv() {
            self.apply(event);
            changed = true;
        }
        changed
    }

    /// Waits for the outstanding request, if any, and applies its outcome.
    pub async fn wait(&mut self) -> &WorkflowState {
        if self.is_loading() {
            if let Some(event) = self.rx.recv().await {
                self.apply(event);
            }
        }
        &self.state
    }

    /// Convenience for `submit` followed by `wait`.
    pub async fn submit_and_wait(&mut self) -> Result<&WorkflowState> {
        self.submit()?;
        Ok(self.wait().await)
    }

    fn apply(&mut self, event: EditEvent) {
        match event {
            EditEvent::Finished(Ok(uri)) => {
                info!(bytes = uri.len(), "edit request succeeded");
                self.state = WorkflowState::Succeeded(uri);
            }
            EditEvent::Finished(Err(e)) => {
                warn!(error = %e, "edit request failed");
                self.state = WorkflowState::Failed(e.to_string());
            }
        }
    }

    /// Name to save the result under. See [`DOWNLOAD_FILE_NAME`].
    pub fn download_file_name(&self) -> &'static str {
        DOWNLOAD_FILE_NAME
    }

    /// Writes the generated image to `path`, or into `path` if it is a
    /// directory using [`DOWNLOAD_FILE_NAME`].
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NoImageReturned`] if there is no successful result.
    pub async fn save_result(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let uri = self.result_image().ok_or(AppError::NoImageReturned)?;
        let (media_type, bytes) = ImageEncoder::parse_data_uri(uri)?;

        if media_type != "image/png" {
            // TODO: derive the extension from the returned media type.
            warn!(%media_type, "saving non-PNG image under a .png name");
        }

        let mut target = path.as_ref().to_path_buf();
        if tokio::fs::metadata(&target).await.is_ok_and(|m| m.is_dir()) {
            target.push(DOWNLOAD_FILE_NAME);
        }

        tokio::fs::write(&target, &bytes).await?;
        info!(path = %target.display(), bytes = bytes.len(), "saved result");
        Ok(target)
    }
}

async fn run_edit(
    client: &EditClient,
    base: &ImageFile,
    logo: &ImageFile,
    instruction: String,
) -> Result<String> {
    let (base, logo) = futures::try_join!(ImageEncoder::encode(base), ImageEncoder::encode(logo))?;
    let request = EditRequest::new(base, logo, instruction)?;
    client.submit(&request).await
}
