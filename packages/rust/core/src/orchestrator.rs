//! Sync Orchestrator: token → create → assemble → write.
//!
//! Strictly sequential. The first failing stage ends the run and maps to a
//! fixed, user-facing reason; platform details only reach the logs.

use std::any::Any;
use std::sync::Arc;

use tracing::{Instrument, error, info, instrument, warn};

use studiosync_feishu::{DocumentPublisher, TokenProvider};
use studiosync_shared::{FeishuSettings, Outcome, StudioSyncError, Transcript};

use crate::assembler::Assembler;

/// Why a sync run stopped. `Display` is the user-facing reason.
#[derive(Debug, thiserror::Error)]
pub enum SyncFailure {
    #[error("feishu is not configured")]
    NotConfigured,

    #[error("transcript is empty")]
    EmptyTranscript,

    #[error("token acquisition failed")]
    TokenAcquisition(#[source] StudioSyncError),

    #[error("document creation failed")]
    DocumentCreation(#[source] StudioSyncError),

    /// Conversion errored, or produced nothing for a non-empty transcript.
    #[error("block conversion failed")]
    BlockConversion(#[source] Option<StudioSyncError>),

    #[error("upload failed")]
    Upload(#[source] StudioSyncError),

    /// A panic or other unexpected error, carrying its message.
    #[error("{0}")]
    Unexpected(String),
}

impl SyncFailure {
    pub fn reason(&self) -> String {
        self.to_string()
    }

    fn detail(&self) -> Option<&StudioSyncError> {
        match self {
            Self::TokenAcquisition(e) | Self::DocumentCreation(e) | Self::Upload(e) => Some(e),
            Self::BlockConversion(e) => e.as_ref(),
            _ => None,
        }
    }
}

/// Runs one transcript through the platform pipeline.
#[derive(Clone)]
pub struct SyncOrchestrator {
    tokens: Arc<dyn TokenProvider>,
    publisher: Arc<dyn DocumentPublisher>,
    assembler: Assembler,
}

impl SyncOrchestrator {
    pub fn new(
        tokens: Arc<dyn TokenProvider>,
        publisher: Arc<dyn DocumentPublisher>,
        assembler: Assembler,
    ) -> Self {
        Self {
            tokens,
            publisher,
            assembler,
        }
    }

    /// Sync `transcript` using `settings` read at call time.
    ///
    /// Never panics and never returns an error: every failure becomes an
    /// [`Outcome`] with a reason.
    #[instrument(skip_all, fields(title = %transcript.title, turns = transcript.turns.len(), strategy = self.assembler.name()))]
    pub async fn run(&self, settings: Option<FeishuSettings>, transcript: Transcript) -> Outcome {
        match self.try_run(settings, transcript).await {
            Ok(()) => {
                info!("sync complete");
                Outcome::success()
            }
            Err(failure) => {
                match failure.detail() {
                    Some(detail) => warn!(reason = %failure, error = %detail, "sync failed"),
                    None => warn!(reason = %failure, "sync failed"),
                }
                Outcome::failure(failure.reason())
            }
        }
    }

    /// Like [`run`](Self::run), but keeps the typed failure.
    pub async fn try_run(
        &self,
        settings: Option<FeishuSettings>,
        transcript: Transcript,
    ) -> Result<(), SyncFailure> {
        let settings = settings.ok_or(SyncFailure::NotConfigured)?;
        if transcript.is_empty() {
            return Err(SyncFailure::EmptyTranscript);
        }

        // A spawned task turns a panic anywhere in the pipeline into a JoinError.
        let this = self.clone();
        let task = tokio::spawn(
            async move { this.pipeline(&settings, &transcript).await }.in_current_span(),
        );

        match task.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => {
                let message = panic_message(e.into_panic());
                error!(%message, "sync pipeline panicked");
                Err(SyncFailure::Unexpected(message))
            }
            Err(e) => Err(SyncFailure::Unexpected(e.to_string())),
        }
    }

    async fn pipeline(
        &self,
        settings: &FeishuSettings,
        transcript: &Transcript,
    ) -> Result<(), SyncFailure> {
        let token = self
            .tokens
            .acquire(&settings.credential)
            .await
            .map_err(SyncFailure::TokenAcquisition)?;

        let document = self
            .publisher
            .create(&token, &settings.target, &transcript.title)
            .await
            .map_err(SyncFailure::DocumentCreation)?;

        let assembled = self
            .assembler
            .assemble(&token, transcript)
            .await
            .map_err(|e| SyncFailure::BlockConversion(Some(e)))?;
        if assembled.is_empty() {
            return Err(SyncFailure::BlockConversion(None));
        }

        self.publisher
            .write(
                &token,
                &document,
                document.root_block_id(),
                &assembled.into_payload(),
            )
            .await
            .map_err(SyncFailure::Upload)?;

        info!(document = %document.object_token, "document published");
        Ok(())
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unexpected failure".to_string()
    }
}
