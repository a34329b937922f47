//! Document Assembler: Transcript → ordered blocks + first-level ids.
//!
//! Two interchangeable strategies sit behind [`Assembler::assemble`]:
//!
//! - **Direct** builds a callout marker and a verbatim text block per turn.
//! - **Markdown** joins the turns into one delimited markdown document and
//!   lets the platform convert it, then re-sorts the returned blocks into
//!   first-level order.
//!
//! Both produce an [`AssembledBlocks`] that becomes the descendant write payload.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, instrument};
use uuid::Uuid;

use studiosync_feishu::{Block, BlockConverter, CalloutStyle, DescendantPayload};
use studiosync_shared::{AccessToken, AssemblyStrategy, Result, Role, Transcript, Turn};

/// Turn delimiter used by the markdown strategy.
const TURN_DELIMITER: &str = "---";

const USER_CALLOUT: CalloutStyle = CalloutStyle {
    background_color: 5,
    border_color: 5,
    emoji_id: "bust_in_silhouette",
};

const MODEL_CALLOUT: CalloutStyle = CalloutStyle {
    background_color: 4,
    border_color: 4,
    emoji_id: "robot_face",
};

/// Callout preset for a role.
pub fn callout_style(role: Role) -> CalloutStyle {
    match role {
        Role::User => USER_CALLOUT,
        Role::Model => MODEL_CALLOUT,
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Blocks in document order plus the ids that sit directly under the root.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssembledBlocks {
    pub blocks: Vec<Block>,
    pub first_level_block_ids: Vec<String>,
}

impl AssembledBlocks {
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty() || self.first_level_block_ids.is_empty()
    }

    /// Append position 0 under the root, every block as a descendant.
    pub fn into_payload(self) -> DescendantPayload {
        DescendantPayload {
            index: 0,
            children_id: self.first_level_block_ids,
            descendants: self.blocks,
        }
    }
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// The configured assembly strategy.
#[derive(Clone)]
pub enum Assembler {
    Direct,
    Markdown(Arc<dyn BlockConverter>),
}

impl std::fmt::Debug for Assembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl Assembler {
    /// Pick the strategy named in config. `converter` backs the markdown one.
    pub fn from_strategy(strategy: AssemblyStrategy, converter: Arc<dyn BlockConverter>) -> Self {
        match strategy {
            AssemblyStrategy::Direct => Self::Direct,
            AssemblyStrategy::Markdown => Self::Markdown(converter),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Markdown(_) => "markdown",
        }
    }

    /// Build the block tree for `transcript`.
    ///
    /// An empty result is only a failure when the transcript had turns; the
    /// caller decides.
    #[instrument(skip_all, fields(strategy = self.name(), turns = transcript.turns.len()))]
    pub async fn assemble(
        &self,
        token: &AccessToken,
        transcript: &Transcript,
    ) -> Result<AssembledBlocks> {
        if transcript.is_empty() {
            return Ok(AssembledBlocks::default());
        }

        let assembled = match self {
            Self::Direct => direct_blocks(&transcript.turns),
            Self::Markdown(converter) => {
                let document = markdown_document(&transcript.turns);
                let converted = converter.convert_markdown(token, &document).await?;
                let blocks =
                    sort_by_first_level(converted.blocks, &converted.first_level_block_ids);
                AssembledBlocks {
                    blocks,
                    first_level_block_ids: converted.first_level_block_ids,
                }
            }
        };

        info!(
            blocks = assembled.blocks.len(),
            first_level = assembled.first_level_block_ids.len(),
            "assembled document"
        );
        Ok(assembled)
    }
}

/// Callout marker then verbatim text, per turn. Every block is first-level.
pub fn direct_blocks(turns: &[Turn]) -> AssembledBlocks {
    let mut blocks = Vec::with_capacity(turns.len() * 2);
    for turn in turns {
        blocks.push(Block::callout(temp_id(), callout_style(turn.role)));
        blocks.push(Block::text(temp_id(), &turn.content));
    }

    let first_level_block_ids = blocks
        .iter()
        .filter_map(|b| b.id().map(str::to_string))
        .collect();

    AssembledBlocks {
        blocks,
        first_level_block_ids,
    }
}

fn temp_id() -> String {
    Uuid::now_v7().to_string()
}

/// One markdown document: `---`, the content, `---`, per turn.
pub fn markdown_document(turns: &[Turn]) -> String {
    let mut document = String::new();
    for turn in turns {
        document.push_str(TURN_DELIMITER);
        document.push('\n');
        document.push_str(&turn.content);
        document.push('\n');
        document.push_str(TURN_DELIMITER);
        document.push('\n');
    }
    document
}

/// Stable-sort `blocks` so first-level ids come first, in list order.
///
/// Blocks whose id is not in `first_level_block_ids` (nested blocks, or no id
/// at all) keep their relative order after every matched block.
pub fn sort_by_first_level(mut blocks: Vec<Block>, first_level_block_ids: &[String]) -> Vec<Block> {
    let rank: HashMap<&str, usize> = first_level_block_ids
        .iter()
        .enumerate()
        .map(|(i, id)| (id.as_str(), i))
        .collect();

    blocks.sort_by_key(|block| {
        block
            .id()
            .and_then(|id| rank.get(id).copied())
            .unwrap_or(usize::MAX)
    });

    debug!(blocks = blocks.len(), "sorted blocks by first-level order");
    blocks
}
