//! Document endpoints: markdown conversion and the Document Publisher.

use async_trait::async_trait;
use serde_json::json;
use tracing::{info, instrument};

use studiosync_shared::{AccessToken, DocumentHandle, DocumentTarget, Result, StudioSyncError};

use crate::blocks::{ConvertedBlocks, DescendantPayload};
use crate::client::{FeishuClient, extract};

const CONVERT_PATH: &[&str] = &["docx", "v1", "documents", "blocks", "convert"];

/// Always write against the latest document revision.
const LATEST_REVISION: i64 = -1;

/// Converts a markdown document into platform blocks.
#[async_trait]
pub trait BlockConverter: Send + Sync {
    async fn convert_markdown(&self, token: &AccessToken, markdown: &str)
    -> Result<ConvertedBlocks>;
}

/// Creates documents and writes block trees into them.
#[async_trait]
pub trait DocumentPublisher: Send + Sync {
    /// Create an empty document node under `target`.
    async fn create(
        &self,
        token: &AccessToken,
        target: &DocumentTarget,
        title: &str,
    ) -> Result<DocumentHandle>;

    /// Append `payload` under `root_block_id` of `document`.
    ///
    /// The platform accepting the request is all that is observable; there is
    /// no partial-write detection.
    async fn write(
        &self,
        token: &AccessToken,
        document: &DocumentHandle,
        root_block_id: &str,
        payload: &DescendantPayload,
    ) -> Result<()>;
}

#[async_trait]
impl BlockConverter for FeishuClient {
    #[instrument(skip_all, fields(chars = markdown.len()))]
    async fn convert_markdown(
        &self,
        token: &AccessToken,
        markdown: &str,
    ) -> Result<ConvertedBlocks> {
        let body = json!({
            "content_type": "markdown",
            "content": markdown,
        });

        let url = self.endpoint_url(CONVERT_PATH)?;
        let value = self
            .post("convert markdown", url, Some(token), &body)
            .await?;
        let converted: ConvertedBlocks = extract("convert markdown", &value, "/data")?;

        info!(
            blocks = converted.blocks.len(),
            first_level = converted.first_level_block_ids.len(),
            "converted markdown"
        );
        Ok(converted)
    }
}

#[async_trait]
impl DocumentPublisher for FeishuClient {
    #[instrument(skip_all, fields(folder = %target.parent_folder_token, title = %title))]
    async fn create(
        &self,
        token: &AccessToken,
        target: &DocumentTarget,
        title: &str,
    ) -> Result<DocumentHandle> {
        let url = self.endpoint_url(&[
            "wiki",
            "v2",
            "spaces",
            target.parent_folder_token.as_str(),
            "nodes",
        ])?;
        let body = json!({
            "obj_type": "docx",
            "node_type": "origin",
            "title": title,
        });

        let value = self.post("create node", url, Some(token), &body).await?;
        let object_token: String = extract("create node", &value, "/data/node/obj_token")?;
        if object_token.is_empty() {
            return Err(StudioSyncError::Transport(
                "create node: empty obj_token".into(),
            ));
        }

        info!(%object_token, "created document");
        Ok(DocumentHandle { object_token })
    }

    #[instrument(skip_all, fields(document = %document.object_token, blocks = payload.descendants.len()))]
    async fn write(
        &self,
        token: &AccessToken,
        document: &DocumentHandle,
        root_block_id: &str,
        payload: &DescendantPayload,
    ) -> Result<()> {
        let mut url = self.endpoint_url(&[
            "docx",
            "v1",
            "documents",
            document.object_token.as_str(),
            "blocks",
            root_block_id,
            "descendant",
        ])?;
        url.query_pairs_mut()
            .append_pair("document_revision_id", &LATEST_REVISION.to_string());

        self.post("write blocks", url, Some(token), payload).await?;

        info!(children = payload.children_id.len(), "wrote blocks");
        Ok(())
    }
}
