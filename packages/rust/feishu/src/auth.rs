//! Access Token Provider: app identity pair → tenant bearer token.

use async_trait::async_trait;
use serde_json::json;
use tracing::{info, instrument};

use studiosync_shared::{AccessToken, Credential, Result, StudioSyncError};

use crate::client::{FeishuClient, extract};

const TOKEN_PATH: &[&str] = &["auth", "v3", "tenant_access_token", "internal", ""];

/// Exchanges a [`Credential`] for a fresh [`AccessToken`].
///
/// Stateless: every call hits the platform, nothing is cached or retried.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn acquire(&self, credential: &Credential) -> Result<AccessToken>;
}

#[async_trait]
impl TokenProvider for FeishuClient {
    #[instrument(skip_all, fields(app_id = %credential.app_id))]
    async fn acquire(&self, credential: &Credential) -> Result<AccessToken> {
        let body = json!({
            "app_id": credential.app_id,
            "app_secret": credential.app_secret,
        });

        let url = self.endpoint_url(TOKEN_PATH)?;
        let value = self
            .post("tenant access token", url, None, &body)
            .await
            .map_err(|e| StudioSyncError::Auth(e.to_string()))?;

        let token: String = extract("tenant access token", &value, "/tenant_access_token")
            .map_err(|e| StudioSyncError::Auth(e.to_string()))?;
        if token.is_empty() {
            return Err(StudioSyncError::Auth("empty tenant_access_token".into()));
        }

        info!("acquired tenant access token");
        Ok(AccessToken::new(token))
    }
}
