//! HTTP plumbing shared by every platform endpoint.
//!
//! Every call is a JSON `POST`. Success is decided by the `code` field of the
//! body, never by the HTTP status: the platform answers errors with 4xx and a
//! JSON body, and can answer 200 with a non-zero code.

use std::time::Duration;

use reqwest::Client;
use reqwest::header::AUTHORIZATION;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use studiosync_shared::{AccessToken, FeishuConfig, Result, StudioSyncError};

/// User-Agent string for platform requests.
const USER_AGENT: &str = concat!("StudioSync/", env!("CARGO_PKG_VERSION"));

/// The platform's "ok" status code.
pub const CODE_OK: i64 = 0;

/// Async client for the document platform's open API.
#[derive(Debug, Clone)]
pub struct FeishuClient {
    http: Client,
    base_url: String,
}

impl FeishuClient {
    /// Create a client for `base_url` (e.g. `https://open.feishu.cn/open-apis`).
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| StudioSyncError::config(format!("invalid api base {base_url:?}: {e}")))?;
        if parsed.cannot_be_a_base() {
            return Err(StudioSyncError::config(format!(
                "invalid api base {base_url:?}: cannot hold a path"
            )));
        }

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| StudioSyncError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a client from the `[feishu]` config section.
    pub fn from_config(config: &FeishuConfig) -> Result<Self> {
        Self::new(
            &config.api_base,
            Duration::from_secs(config.http_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The base URL extended by `segments`, each percent-encoded on its own so
    /// a token can never add path segments or a query.
    pub(crate) fn endpoint_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| StudioSyncError::config(format!("invalid api base: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| StudioSyncError::config("api base cannot hold a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// POST `body` to `url` and return the response body once its code is ok.
    pub(crate) async fn post(
        &self,
        endpoint: &'static str,
        url: Url,
        token: Option<&AccessToken>,
        body: &impl Serialize,
    ) -> Result<Value> {
        debug!(endpoint, %url, "platform request");

        let mut request = self.http.post(url).json(body);
        if let Some(token) = token {
            request = request.header(AUTHORIZATION, token.bearer());
        }

        let response = request
            .send()
            .await
            .map_err(|e| StudioSyncError::Transport(format!("{endpoint}: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| StudioSyncError::Transport(format!("{endpoint}: body read failed: {e}")))?;

        let value: Value = serde_json::from_str(&text).map_err(|e| {
            warn!(endpoint, %status, body = %truncate_str(&text, 500), "unparseable platform response");
            StudioSyncError::Transport(format!("{endpoint}: HTTP {status}: invalid JSON body: {e}"))
        })?;

        let code = value.get("code").and_then(Value::as_i64).unwrap_or(-1);
        if code != CODE_OK {
            let message = value
                .get("msg")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            warn!(endpoint, %status, code, msg = %message, "platform rejected request");
            return Err(StudioSyncError::PlatformRejected {
                endpoint: endpoint.to_string(),
                code,
                message,
            });
        }

        Ok(value)
    }
}

/// Deserialize the value at `pointer` (e.g. `/data/node`) of an ok response.
pub(crate) fn extract<T: DeserializeOwned>(
    endpoint: &'static str,
    value: &Value,
    pointer: &str,
) -> Result<T> {
    let part = value.pointer(pointer).cloned().ok_or_else(|| {
        StudioSyncError::Transport(format!("{endpoint}: response is missing {pointer}"))
    })?;

    serde_json::from_value(part)
        .map_err(|e| StudioSyncError::Transport(format!("{endpoint}: malformed {pointer}: {e}")))
}

fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.len() <= max_chars {
        return s.to_string();
    }

    let mut boundary = max_chars;
    while boundary > 0 && !s.is_char_boundary(boundary) {
        boundary -= 1;
    }

    format!("{}...", &s[..boundary])
}
