//! Conversation extraction state machine.
//!
//! Each reveal control is driven through four stages, strictly one control
//! at a time because a click mutates page state the next read depends on:
//!
//! 1. **Locate**: scroll the control into view.
//! 2. **Activate**: click it, then dwell.
//! 3. **Read**: read role + content from the exposed container.
//! 4. **Restore**: click it again, then dwell. Failure here is logged only.
//!
//! Containers without a control are read as rendered, and so is a container
//! whose Locate or Activate stage fails. Turns keep page order either way.
//!
//! Extraction never fails as a whole; an empty transcript is the signal.

use tracing::{debug, info, instrument, warn};

use studiosync_shared::{DEFAULT_TITLE, StudioSyncError, Transcript, Turn};

use crate::page::{HostPage, RawTurn, RevealControl, Skip};
use crate::wait::{Dwell, wait_until};

/// Stage at which a container's reveal went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealStage {
    Locate,
    Activate,
    Read,
    Restore,
}

impl std::fmt::Display for RevealStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Locate => "locate",
            Self::Activate => "activate",
            Self::Read => "read",
            Self::Restore => "restore",
        })
    }
}

/// A per-container failure; never escapes [`ConversationExtractor`].
#[derive(Debug)]
struct StageFailure {
    stage: RevealStage,
    error: StudioSyncError,
}

impl StageFailure {
    fn at(stage: RevealStage) -> impl FnOnce(StudioSyncError) -> Self {
        move |error| Self { stage, error }
    }
}

/// Produces a [`Transcript`] from the current state of a [`HostPage`].
#[derive(Debug, Clone)]
pub struct ConversationExtractor {
    dwell: Dwell,
}

impl ConversationExtractor {
    pub fn new(dwell: Dwell) -> Self {
        Self { dwell }
    }

    /// Read every turn container in page order, revealing the ones that
    /// carry a reveal control first.
    #[instrument(skip_all)]
    pub async fn extract(&self, page: &dyn HostPage) -> Transcript {
        self.wait_for_turns(page).await;

        let controls = match page.reveal_controls().await {
            Ok(controls) => controls,
            Err(e) => {
                warn!(error = %e, "could not locate reveal controls");
                Vec::new()
            }
        };
        let count = match page.turn_count().await {
            Ok(count) => count,
            Err(e) => {
                warn!(error = %e, "could not count turn containers");
                controls.iter().map(|c| c.container + 1).max().unwrap_or(0)
            }
        };
        info!(containers = count, controls = controls.len(), "found turn containers");

        let mut turns = Vec::new();
        for container in 0..count {
            let read = match controls.iter().find(|c| c.container == container) {
                Some(control) => self.reveal_and_read(page, control).await,
                None => page
                    .read_turn(container)
                    .await
                    .map_err(StageFailure::at(RevealStage::Read)),
            };

            match read {
                Ok(raw) => {
                    if let Some(turn) = classify(&raw, container) {
                        debug!(
                            container,
                            role = %turn.role,
                            chars = turn.content.chars().count(),
                            "extracted turn"
                        );
                        turns.push(turn);
                    }
                }
                Err(failure) => warn!(
                    container,
                    stage = %failure.stage,
                    error = %failure.error,
                    "skipping turn container"
                ),
            }
        }

        let title = read_title(page).await;
        info!(turns = turns.len(), "extraction complete");
        Transcript::new(title, turns)
    }

    /// Read the turns as currently rendered, without touching any control.
    #[instrument(skip_all)]
    pub async fn read_visible(&self, page: &dyn HostPage) -> Transcript {
        let count = match page.turn_count().await {
            Ok(count) => count,
            Err(e) => {
                warn!(error = %e, "could not count turn containers");
                0
            }
        };

        let mut turns = Vec::new();
        for container in 0..count {
            match page.read_turn(container).await {
                Ok(raw) => turns.extend(classify(&raw, container)),
                Err(e) => warn!(container, error = %e, "skipping turn container"),
            }
        }

        let title = read_title(page).await;
        info!(turns = turns.len(), "read visible turns");
        Transcript::new(title, turns)
    }

    async fn wait_for_turns(&self, page: &dyn HostPage) {
        let ready = wait_until(
            self.dwell.ready_timeout,
            self.dwell.poll_interval,
            move || async move { page.turn_count().await.map(|n| n > 0).unwrap_or(false) },
        )
        .await;
        if !ready {
            warn!(
                timeout_ms = self.dwell.ready_timeout.as_millis(),
                "no turn containers appeared before timeout"
            );
        }
    }

    /// Locate, activate, read, restore. A container that cannot be revealed
    /// is still read as rendered.
    async fn reveal_and_read(
        &self,
        page: &dyn HostPage,
        control: &RevealControl,
    ) -> Result<RawTurn, StageFailure> {
        if let Err(failure) = self.reveal(page, control).await {
            warn!(
                container = control.container,
                stage = %failure.stage,
                error = %failure.error,
                "could not reveal turn container, reading it as rendered"
            );
            return page
                .read_turn(control.container)
                .await
                .map_err(StageFailure::at(RevealStage::Read));
        }

        let read = page.read_turn(control.container).await;

        // Restoration is cosmetic; whatever was read stays valid.
        match page.activate(control).await {
            Ok(()) => self.dwell.settle().await,
            Err(e) => warn!(
                container = control.container,
                stage = %RevealStage::Restore,
                error = %e,
                "could not restore collapsed view"
            ),
        }

        read.map_err(StageFailure::at(RevealStage::Read))
    }

    async fn reveal(
        &self,
        page: &dyn HostPage,
        control: &RevealControl,
    ) -> Result<(), StageFailure> {
        page.scroll_into_view(control)
            .await
            .map_err(StageFailure::at(RevealStage::Locate))?;

        page.activate(control)
            .await
            .map_err(StageFailure::at(RevealStage::Activate))?;
        self.dwell.settle().await;
        Ok(())
    }
}

fn classify(raw: &RawTurn, container: usize) -> Option<Turn> {
    match raw.classify() {
        Ok(turn) => Some(turn),
        Err(Skip::UnrecognizedRole(role)) => {
            warn!(container, ?role, "invalid or missing role, skipping");
            None
        }
        Err(Skip::EmptyContent) => {
            debug!(container, "empty content, skipping");
            None
        }
    }
}

async fn read_title(page: &dyn HostPage) -> String {
    match page.heading().await {
        Ok(Some(title)) if !title.trim().is_empty() => title.trim().to_string(),
        Ok(_) => DEFAULT_TITLE.to_string(),
        Err(e) => {
            debug!(error = %e, "no page heading");
            DEFAULT_TITLE.to_string()
        }
    }
}
