//! Host page capability trait.
//!
//! The extractor never touches a DOM directly; it drives a [`HostPage`], which
//! may be a live browser session or a saved snapshot.

use async_trait::async_trait;
use url::Url;

use studiosync_shared::{Result, Role, Turn};

/// A reveal control found on the page, bound to the turn container it toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealControl {
    /// Position among all reveal controls, in document order.
    pub index: usize,
    /// Position of the owning turn container, in document order.
    pub container: usize,
}

/// Role label and raw content attribute read from one turn container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTurn {
    pub role: Option<String>,
    pub content: Option<String>,
}

/// Why a container produced no turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Skip {
    /// Role label missing or not one of the recognized labels.
    UnrecognizedRole(Option<String>),
    /// Content absent or whitespace only.
    EmptyContent,
}

impl RawTurn {
    /// Classify the raw read into a turn or the reason it is skipped.
    pub fn classify(&self) -> std::result::Result<Turn, Skip> {
        let role = self
            .role
            .as_deref()
            .and_then(Role::from_page_label)
            .ok_or_else(|| Skip::UnrecognizedRole(self.role.clone()))?;

        Turn::new(role, self.content.as_deref().unwrap_or_default()).ok_or(Skip::EmptyContent)
    }
}

/// Operations the extractor needs from the host page.
///
/// Implementations mutate shared page state on [`HostPage::activate`]; callers
/// must drive one control at a time.
#[async_trait]
pub trait HostPage: Send + Sync {
    /// Address of the page, when known.
    fn url(&self) -> Option<Url>;

    /// Number of turn containers currently rendered.
    async fn turn_count(&self) -> Result<usize>;

    /// Reveal controls in document order.
    async fn reveal_controls(&self) -> Result<Vec<RevealControl>>;

    /// Scroll the control to the leading edge of the viewport.
    async fn scroll_into_view(&self, control: &RevealControl) -> Result<()>;

    /// Click the control. A second click restores the collapsed view.
    async fn activate(&self, control: &RevealControl) -> Result<()>;

    /// Read role and content attributes from a turn container.
    async fn read_turn(&self, container: usize) -> Result<RawTurn>;

    /// Text of the page heading, if present.
    async fn heading(&self) -> Result<Option<String>>;
}
