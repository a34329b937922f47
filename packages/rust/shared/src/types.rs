//! Core domain types shared by the extractor, the platform client and the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StudioSyncError};

/// Title used when the host page exposes no heading.
pub const DEFAULT_TITLE: &str = "Untitled conversation";

// ---------------------------------------------------------------------------
// Turn
// ---------------------------------------------------------------------------

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    /// Map the role label rendered by the host page. Only the exact labels
    /// `User` and `Model` are recognized.
    pub fn from_page_label(label: &str) -> Option<Self> {
        match label {
            "User" => Some(Self::User),
            "Model" => Some(Self::Model),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Model => "model",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One utterance of the conversation. Content is always trimmed and non-empty,
/// including when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TurnFields")]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

#[derive(Deserialize)]
struct TurnFields {
    role: Role,
    content: String,
}

impl TryFrom<TurnFields> for Turn {
    type Error = String;

    fn try_from(fields: TurnFields) -> std::result::Result<Self, Self::Error> {
        Turn::new(fields.role, &fields.content)
            .ok_or_else(|| format!("{} turn has empty content", fields.role))
    }
}

impl Turn {
    /// Build a turn, returning `None` when the content is empty after trimming.
    pub fn new(role: Role, content: &str) -> Option<Self> {
        let content = content.trim();
        if content.is_empty() {
            return None;
        }
        Some(Self {
            role,
            content: content.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Transcript
// ---------------------------------------------------------------------------

/// The ordered turns and title read from one page state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transcript {
    pub title: String,
    pub turns: Vec<Turn>,
    /// Milliseconds since the epoch on the wire.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub extracted_at: DateTime<Utc>,
}

impl Transcript {
    /// A transcript stamped with the current time.
    pub fn new(title: impl Into<String>, turns: Vec<Turn>) -> Self {
        Self {
            title: title.into(),
            turns,
            extracted_at: Utc::now(),
        }
    }

    /// An empty transcript with the placeholder title.
    pub fn empty() -> Self {
        Self::new(DEFAULT_TITLE, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Parse a stored transcript. Blank turns are rejected by [`Turn`] itself.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| StudioSyncError::validation(format!("invalid transcript: {e}")))
    }
}

// ---------------------------------------------------------------------------
// Credentials and platform handles
// ---------------------------------------------------------------------------

/// Application identity pair exchanged for a bearer token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub app_id: String,
    pub app_secret: String,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("app_id", &self.app_id)
            .field("app_secret", &"<redacted>")
            .finish()
    }
}

/// Short-lived bearer token. Never cached across sync runs.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value for the `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// Where new documents are created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentTarget {
    pub parent_folder_token: String,
}

/// Identity of a freshly created document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentHandle {
    pub object_token: String,
}

impl DocumentHandle {
    /// The document's root block shares the document's token.
    pub fn root_block_id(&self) -> &str {
        &self.object_token
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Result of a sync run as seen by the control surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub ok: bool,
    #[serde(rename = "error", default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Outcome {
    pub fn success() -> Self {
        Self {
            ok: true,
            reason: None,
        }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            reason: Some(reason.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_labels() {
        assert_eq!(Role::from_page_label("User"), Some(Role::User));
        assert_eq!(Role::from_page_label("Model"), Some(Role::Model));
        assert_eq!(Role::from_page_label("user"), None);
        assert_eq!(Role::from_page_label("System"), None);
    }

    #[test]
    fn turn_rejects_blank_content() {
        assert!(Turn::new(Role::User, "   \n\t").is_none());
        let turn = Turn::new(Role::Model, "  hello \n").unwrap();
        assert_eq!(turn.content, "hello");
    }

    #[test]
    fn transcript_wire_shape() {
        let transcript = Transcript::new("Chat", vec![Turn::new(Role::User, "hi").unwrap()]);
        let value = serde_json::to_value(&transcript).unwrap();
        assert_eq!(value["title"], "Chat");
        assert_eq!(value["turns"][0]["role"], "user");
        assert!(value["extractedAt"].is_i64());
    }

    #[test]
    fn transcript_from_json_rejects_blank_turn() {
        let json = r#"{"title":"t","turns":[{"role":"model","content":"  "}],"extractedAt":0}"#;
        let err = Transcript::from_json(json).unwrap_err();
        assert!(err.to_string().contains("model turn has empty content"));
    }

    #[test]
    fn deserialized_turns_are_trimmed_and_never_blank() {
        let turn: Turn = serde_json::from_str(r#"{"role":"user","content":"  hi \n"}"#).unwrap();
        assert_eq!(turn.content, "hi");

        let blank = serde_json::from_str::<Turn>(r#"{"role":"user","content":"\t "}"#);
        assert!(blank.is_err());
    }

    #[test]
    fn outcome_serializes_reason_as_error() {
        let json = serde_json::to_string(&Outcome::failure("upload failed")).unwrap();
        assert_eq!(json, r#"{"ok":false,"error":"upload failed"}"#);
        let json = serde_json::to_string(&Outcome::success()).unwrap();
        assert_eq!(json, r#"{"ok":true}"#);
    }

    #[test]
    fn secrets_are_redacted() {
        let credential = Credential {
            app_id: "cli_a".into(),
            app_secret: "s3cret".into(),
        };
        assert!(!format!("{credential:?}").contains("s3cret"));
        assert!(!format!("{:?}", AccessToken::new("t-123")).contains("t-123"));
    }
}
