//! Conversation extraction from a host chat page.
//!
//! This crate provides:
//! - [`HostPage`]: the capability trait the extractor drives
//! - [`SnapshotPage`]: a `HostPage` over saved HTML, parsed with `scraper`
//! - [`ConversationExtractor`]: the reveal/read/restore state machine
//! - [`Dwell`] and [`wait_until`]: bounded waits for an unobservable page

pub mod extractor;
pub mod page;
pub mod snapshot;
pub mod wait;

use url::Url;

pub use extractor::{ConversationExtractor, RevealStage};
pub use page::{HostPage, RawTurn, RevealControl, Skip};
pub use snapshot::SnapshotPage;
pub use wait::{Dwell, wait_until};

/// Whether `url` belongs to `allowed_host` (or one of its subdomains).
pub fn is_allowed_host(url: &Url, allowed_host: &str) -> bool {
    match url.host_str() {
        Some(host) => host == allowed_host || host.ends_with(&format!(".{allowed_host}")),
        None => false,
    }
}
