//! Document block model.
//!
//! Only the fields the pipeline reasons about are typed; everything else a
//! block carries is kept verbatim in `payload` so converted blocks round-trip
//! to the write endpoint unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// `block_type` tag of a plain text block.
pub const BLOCK_TYPE_TEXT: u32 = 2;
/// `block_type` tag of a callout block.
pub const BLOCK_TYPE_CALLOUT: u32 = 19;

/// A node of the platform's document tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_id: Option<String>,

    #[serde(default)]
    pub block_type: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    /// Ids of nested blocks.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,

    /// Type-specific body (`text`, `callout`, `heading1`, ...).
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

/// Visual preset of a callout block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalloutStyle {
    pub background_color: u8,
    pub border_color: u8,
    pub emoji_id: &'static str,
}

impl Block {
    /// A text block holding `content` as a single unstyled run.
    pub fn text(block_id: impl Into<String>, content: &str) -> Self {
        let mut payload = Map::new();
        payload.insert(
            "text".into(),
            json!({
                "elements": [{ "text_run": { "content": content } }],
                "style": {},
            }),
        );
        Self {
            block_id: Some(block_id.into()),
            block_type: BLOCK_TYPE_TEXT,
            parent_id: None,
            children: Vec::new(),
            payload,
        }
    }

    /// An empty callout block used as a colored marker.
    pub fn callout(block_id: impl Into<String>, style: CalloutStyle) -> Self {
        let mut payload = Map::new();
        payload.insert(
            "callout".into(),
            json!({
                "background_color": style.background_color,
                "border_color": style.border_color,
                "emoji_id": style.emoji_id,
            }),
        );
        Self {
            block_id: Some(block_id.into()),
            block_type: BLOCK_TYPE_CALLOUT,
            parent_id: None,
            children: Vec::new(),
            payload,
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.block_id.as_deref()
    }
}

/// Flat blocks plus the authoritative top-level order, as returned by conversion.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ConvertedBlocks {
    #[serde(default)]
    pub first_level_block_ids: Vec<String>,
    #[serde(default)]
    pub blocks: Vec<Block>,
}

/// Body of the descendant write call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DescendantPayload {
    /// Insert position under the parent block.
    pub index: i64,
    /// First-level block ids, in reading order.
    pub children_id: Vec<String>,
    /// Every block of the tree, first-level and nested.
    pub descendants: Vec<Block>,
}
