//! Application configuration for StudioSync.
//!
//! User config lives at `~/.studiosync/studiosync.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StudioSyncError};
use crate::types::{Credential, DocumentTarget};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "studiosync.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".studiosync";

/// Environment fallbacks for the credential triple.
pub const ENV_APP_ID: &str = "STUDIOSYNC_APP_ID";
pub const ENV_APP_SECRET: &str = "STUDIOSYNC_APP_SECRET";
pub const ENV_FOLDER_TOKEN: &str = "STUDIOSYNC_FOLDER_TOKEN";

// ---------------------------------------------------------------------------
// Config structs (matching studiosync.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Document platform credentials and endpoint.
    #[serde(default)]
    pub feishu: FeishuConfig,

    /// Block assembly strategy.
    #[serde(default)]
    pub assembly: AssemblyConfig,

    /// Extraction timing.
    #[serde(default)]
    pub extractor: ExtractorConfig,

    /// Host page selectors.
    #[serde(default)]
    pub page: PageConfig,
}

/// `[feishu]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeishuConfig {
    #[serde(default)]
    pub app_id: String,

    #[serde(default)]
    pub app_secret: String,

    /// Wiki space / folder token new documents are created under.
    #[serde(default)]
    pub folder_token: String,

    /// Open API base URL.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Per-request timeout.
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
}

impl Default for FeishuConfig {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            app_secret: String::new(),
            folder_token: String::new(),
            api_base: default_api_base(),
            http_timeout_secs: default_http_timeout(),
        }
    }
}

fn default_api_base() -> String {
    "https://open.feishu.cn/open-apis".into()
}
fn default_http_timeout() -> u64 {
    30
}

/// Which assembler strategy turns a transcript into blocks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssemblyStrategy {
    /// Callout marker plus verbatim text block per turn.
    Direct,
    /// One markdown document converted by the platform.
    #[default]
    Markdown,
}

/// `[assembly]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssemblyConfig {
    #[serde(default)]
    pub strategy: AssemblyStrategy,
}

/// `[extractor]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Fixed dwell after each reveal-control click.
    #[serde(default = "default_click_dwell")]
    pub click_dwell_ms: u64,

    /// Upper bound on waiting for the first turn container.
    #[serde(default = "default_ready_timeout")]
    pub ready_timeout_ms: u64,

    /// Poll interval while waiting for the first turn container.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Host the extractor is allowed to run against.
    #[serde(default = "default_allowed_host")]
    pub allowed_host: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            click_dwell_ms: default_click_dwell(),
            ready_timeout_ms: default_ready_timeout(),
            poll_interval_ms: default_poll_interval(),
            allowed_host: default_allowed_host(),
        }
    }
}

fn default_click_dwell() -> u64 {
    500
}
fn default_ready_timeout() -> u64 {
    10_000
}
fn default_poll_interval() -> u64 {
    200
}
fn default_allowed_host() -> String {
    "aistudio.google.com".into()
}

/// `[page]` section: CSS selectors and attribute names of the host page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageConfig {
    #[serde(default = "default_turn_selector")]
    pub turn_selector: String,
    #[serde(default = "default_role_selector")]
    pub role_selector: String,
    #[serde(default = "default_role_attr")]
    pub role_attr: String,
    #[serde(default = "default_content_selector")]
    pub content_selector: String,
    #[serde(default = "default_content_attr")]
    pub content_attr: String,
    #[serde(default = "default_reveal_selector")]
    pub reveal_selector: String,
    #[serde(default = "default_title_selector")]
    pub title_selector: String,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            turn_selector: default_turn_selector(),
            role_selector: default_role_selector(),
            role_attr: default_role_attr(),
            content_selector: default_content_selector(),
            content_attr: default_content_attr(),
            reveal_selector: default_reveal_selector(),
            title_selector: default_title_selector(),
        }
    }
}

fn default_turn_selector() -> String {
    "ms-chat-turn".into()
}
fn default_role_selector() -> String {
    "[data-turn-role]".into()
}
fn default_role_attr() -> String {
    "data-turn-role".into()
}
fn default_content_selector() -> String {
    "ms-autosize-textarea".into()
}
fn default_content_attr() -> String {
    "data-value".into()
}
fn default_reveal_selector() -> String {
    r#"button[aria-label="Edit"]"#.into()
}
fn default_title_selector() -> String {
    "h1".into()
}

// ---------------------------------------------------------------------------
// Resolved sync settings
// ---------------------------------------------------------------------------

/// Everything a sync run needs from configuration, resolved and non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeishuSettings {
    pub credential: Credential,
    pub target: DocumentTarget,
}

impl FeishuSettings {
    fn from_parts(app_id: &str, app_secret: &str, folder_token: &str) -> Option<Self> {
        if app_id.is_empty() || app_secret.is_empty() || folder_token.is_empty() {
            return None;
        }
        Some(Self {
            credential: Credential {
                app_id: app_id.to_string(),
                app_secret: app_secret.to_string(),
            },
            target: DocumentTarget {
                parent_folder_token: folder_token.to_string(),
            },
        })
    }
}

impl FeishuConfig {
    /// Resolve settings from the file, falling back to the process environment.
    pub fn settings(&self) -> Result<FeishuSettings> {
        self.settings_with(|key| std::env::var(key).ok())
    }

    /// Resolve settings: the file triple wins when complete, otherwise the
    /// environment triple when complete. Mixed sources are never combined.
    pub fn settings_with(&self, env: impl Fn(&str) -> Option<String>) -> Result<FeishuSettings> {
        if let Some(settings) =
            FeishuSettings::from_parts(&self.app_id, &self.app_secret, &self.folder_token)
        {
            return Ok(settings);
        }

        let app_id = env(ENV_APP_ID).unwrap_or_default();
        let app_secret = env(ENV_APP_SECRET).unwrap_or_default();
        let folder_token = env(ENV_FOLDER_TOKEN).unwrap_or_default();
        if let Some(settings) = FeishuSettings::from_parts(&app_id, &app_secret, &folder_token) {
            tracing::debug!("using credentials from environment");
            return Ok(settings);
        }

        let field = if self.app_id.is_empty() {
            "app_id"
        } else if self.app_secret.is_empty() {
            "app_secret"
        } else {
            "folder_token"
        };
        Err(StudioSyncError::missing(field))
    }
}

impl AppConfig {
    /// Copy of the config safe to print.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.feishu.app_secret.is_empty() {
            copy.feishu.app_secret = "<redacted>".into();
        }
        copy
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.studiosync/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| StudioSyncError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.studiosync/studiosync.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;
    load_config_or_default(&path)
}

/// Load from `path`, or defaults when it does not exist.
pub fn load_config_or_default(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| StudioSyncError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        StudioSyncError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let path = config_file_path()?;
    init_config_at(&path)?;
    Ok(path)
}

/// Write a default config file at `path`, creating parent directories.
pub fn init_config_at(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| StudioSyncError::io(dir, e))?;
    }

    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| StudioSyncError::config(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| StudioSyncError::io(path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(())
}
