//! [`HostPage`] over a saved HTML document.
//!
//! The document is parsed once with `scraper`; turn containers are flattened
//! into plain data so the page can be shared across tasks. Reveal clicks
//! toggle a tracked expanded flag but cannot change the saved markup.

use std::sync::Mutex;

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use studiosync_shared::{PageConfig, Result, StudioSyncError};

use crate::page::{HostPage, RawTurn, RevealControl};

/// One turn container as it appears in the snapshot.
#[derive(Debug, Clone)]
struct SnapshotTurn {
    role: Option<String>,
    content: Option<String>,
    has_control: bool,
}

/// Compiled selectors for one page layout.
struct PageSelectors {
    turn: Selector,
    role: Selector,
    content: Selector,
    reveal: Selector,
    title: Selector,
}

impl PageSelectors {
    fn compile(config: &PageConfig) -> Result<Self> {
        Ok(Self {
            turn: parse_selector(&config.turn_selector)?,
            role: parse_selector(&config.role_selector)?,
            content: parse_selector(&config.content_selector)?,
            reveal: parse_selector(&config.reveal_selector)?,
            title: parse_selector(&config.title_selector)?,
        })
    }
}

fn parse_selector(source: &str) -> Result<Selector> {
    Selector::parse(source)
        .map_err(|e| StudioSyncError::config(format!("invalid selector {source:?}: {e}")))
}

/// A saved host page.
pub struct SnapshotPage {
    url: Option<Url>,
    title: Option<String>,
    turns: Vec<SnapshotTurn>,
    expanded: Mutex<Vec<bool>>,
}

impl SnapshotPage {
    /// Parse `html` using the selectors in `config`.
    ///
    /// `url` overrides the page address; otherwise `link[rel=canonical]` is used.
    pub fn parse(html: &str, url: Option<Url>, config: &PageConfig) -> Result<Self> {
        let selectors = PageSelectors::compile(config)?;
        let doc = Html::parse_document(html);

        let turns: Vec<SnapshotTurn> = doc
            .select(&selectors.turn)
            .map(|container| read_container(container, &selectors, config))
            .collect();

        let title = doc
            .select(&selectors.title)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty());

        let url = url.or_else(|| canonical_url(&doc));

        debug!(
            turns = turns.len(),
            controls = turns.iter().filter(|t| t.has_control).count(),
            has_title = title.is_some(),
            "parsed page snapshot"
        );

        let expanded = Mutex::new(vec![false; turns.len()]);
        Ok(Self {
            url,
            title,
            turns,
            expanded,
        })
    }

    /// Number of containers left in the expanded (editable) state.
    pub fn expanded_count(&self) -> usize {
        self.expanded_flags().iter().filter(|e| **e).count()
    }

    fn expanded_flags(&self) -> std::sync::MutexGuard<'_, Vec<bool>> {
        self.expanded.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn container(&self, index: usize) -> Result<&SnapshotTurn> {
        self.turns
            .get(index)
            .ok_or_else(|| StudioSyncError::page(format!("turn container {index} not found")))
    }
}

fn read_container(
    container: ElementRef<'_>,
    selectors: &PageSelectors,
    config: &PageConfig,
) -> SnapshotTurn {
    let role = container
        .select(&selectors.role)
        .next()
        .and_then(|el| el.value().attr(&config.role_attr))
        .map(String::from);

    let content = container
        .select(&selectors.content)
        .next()
        .and_then(|el| el.value().attr(&config.content_attr))
        .map(String::from);

    let has_control = container.select(&selectors.reveal).next().is_some();

    SnapshotTurn {
        role,
        content,
        has_control,
    }
}

fn canonical_url(doc: &Html) -> Option<Url> {
    let sel = Selector::parse(r#"link[rel="canonical"]"#).ok()?;
    doc.select(&sel)
        .next()
        .and_then(|el| el.value().attr("href"))
        .and_then(|href| Url::parse(href).ok())
}

#[async_trait]
impl HostPage for SnapshotPage {
    fn url(&self) -> Option<Url> {
        self.url.clone()
    }

    async fn turn_count(&self) -> Result<usize> {
        Ok(self.turns.len())
    }

    async fn reveal_controls(&self) -> Result<Vec<RevealControl>> {
        Ok(self
            .turns
            .iter()
            .enumerate()
            .filter(|(_, t)| t.has_control)
            .enumerate()
            .map(|(index, (container, _))| RevealControl { index, container })
            .collect())
    }

    async fn scroll_into_view(&self, control: &RevealControl) -> Result<()> {
        self.container(control.container).map(|_| ())
    }

    async fn activate(&self, control: &RevealControl) -> Result<()> {
        self.container(control.container)?;
        let mut flags = self.expanded_flags();
        if let Some(flag) = flags.get_mut(control.container) {
            *flag = !*flag;
        }
        Ok(())
    }

    async fn read_turn(&self, container: usize) -> Result<RawTurn> {
        let turn = self.container(container)?;
        Ok(RawTurn {
            role: turn.role.clone(),
            content: turn.content.clone(),
        })
    }

    async fn heading(&self) -> Result<Option<String>> {
        Ok(self.title.clone())
    }
}
