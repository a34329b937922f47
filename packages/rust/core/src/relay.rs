//! Relay: routes control-surface messages to the extractor and the orchestrator.
//!
//! Each recognized message kind gets exactly one response, delivered through a
//! single-shot channel; [`Dispatch::Pending`] tells the transport to keep the
//! reply path open until it resolves. Unrecognized kinds are declined. The
//! relay forwards results verbatim and holds no business logic.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{oneshot, watch};
use tracing::{debug, info, warn};

use studiosync_extractor::{ConversationExtractor, HostPage};
use studiosync_shared::{FeishuSettings, Outcome, Transcript};

use crate::orchestrator::SyncOrchestrator;

/// Messages understood by the relay, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    /// Reveal every turn and read it.
    #[serde(rename = "EXTRACT_DATA")]
    ExtractData,
    /// Read the turns as rendered, without clicking anything.
    #[serde(rename = "GET_CONVERSATION_DATA")]
    GetConversationData,
    /// Sync the given transcript.
    #[serde(rename = "UPLOAD_TO_FEISHU")]
    UploadToFeishu { data: Transcript },
}

impl Request {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ExtractData => "EXTRACT_DATA",
            Self::GetConversationData => "GET_CONVERSATION_DATA",
            Self::UploadToFeishu { .. } => "UPLOAD_TO_FEISHU",
        }
    }
}

/// What a handler produced, serialized as-is.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Response {
    Transcript(Transcript),
    Outcome(Outcome),
}

/// How the transport should treat a message.
#[derive(Debug)]
pub enum Dispatch {
    /// Keep the reply path open; the response arrives on this receiver.
    Pending(oneshot::Receiver<Response>),
    /// Not a recognized message; nothing will be sent.
    Declined,
}

struct Inner {
    page: Arc<dyn HostPage>,
    extractor: ConversationExtractor,
    orchestrator: SyncOrchestrator,
    settings: watch::Receiver<Option<FeishuSettings>>,
}

/// The message router. Cheap to clone.
#[derive(Clone)]
pub struct Relay {
    inner: Arc<Inner>,
}

impl Relay {
    /// `settings` is read at the moment a sync request is handled, so the
    /// owner of the sender can refresh configuration between requests.
    pub fn new(
        page: Arc<dyn HostPage>,
        extractor: ConversationExtractor,
        orchestrator: SyncOrchestrator,
        settings: watch::Receiver<Option<FeishuSettings>>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                page,
                extractor,
                orchestrator,
                settings,
            }),
        }
    }

    /// Route a raw message. Must be called inside a tokio runtime.
    pub fn dispatch(&self, message: Value) -> Dispatch {
        match serde_json::from_value::<Request>(message) {
            Ok(request) => self.dispatch_request(request),
            Err(e) => {
                debug!(error = %e, "declining unrecognized message");
                Dispatch::Declined
            }
        }
    }

    /// Route a typed request. Always pending.
    pub fn dispatch_request(&self, request: Request) -> Dispatch {
        let (tx, rx) = oneshot::channel();
        let inner = Arc::clone(&self.inner);
        let kind = request.kind();
        info!(kind, "relay request");

        tokio::spawn(async move {
            let response = inner.handle(request).await;
            if tx.send(response).is_err() {
                warn!(kind, "relay caller went away before the response");
            }
        });

        Dispatch::Pending(rx)
    }

    /// Dispatch and wait. `None` when the message was declined or its handler
    /// died without answering.
    pub async fn request(&self, message: Value) -> Option<Response> {
        match self.dispatch(message) {
            Dispatch::Pending(rx) => rx.await.ok(),
            Dispatch::Declined => None,
        }
    }

    /// Typed form of [`request`](Self::request).
    pub async fn send(&self, request: Request) -> Option<Response> {
        match self.dispatch_request(request) {
            Dispatch::Pending(rx) => rx.await.ok(),
            Dispatch::Declined => None,
        }
    }
}

impl Inner {
    async fn handle(&self, request: Request) -> Response {
        match request {
            Request::ExtractData => {
                Response::Transcript(self.extractor.extract(self.page.as_ref()).await)
            }
            Request::GetConversationData => {
                Response::Transcript(self.extractor.read_visible(self.page.as_ref()).await)
            }
            Request::UploadToFeishu { data } => {
                let settings = self.settings.borrow().clone();
                Response::Outcome(self.orchestrator.run(settings, data).await)
            }
        }
    }
}
