//! API request and response types

use crate::conversation::{Snapshot, Speaker, Turn};
use crate::render::{segments, Segment};
use crate::runtime::ChatEvent;
use serde::{Deserialize, Serialize};

/// Request to send a chat message
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub text: String,
}

/// Request to replace the system message
#[derive(Debug, Deserialize)]
pub struct SystemMessageRequest {
    pub text: String,
}

/// Request to change the history cap
#[derive(Debug, Deserialize)]
pub struct HistoryLimitRequest {
    pub limit: usize,
}

/// Query parameters accepted by gated routes
#[derive(Debug, Default, Deserialize)]
pub struct AccessQuery {
    pub key: Option<String>,
}

/// A turn as the UI renders it
#[derive(Debug, Clone, Serialize)]
pub struct TurnView {
    pub index: usize,
    pub speaker: Speaker,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub error: bool,
    pub segments: Vec<Segment>,
}

impl TurnView {
    pub fn new(index: usize, turn: &Turn) -> Self {
        Self {
            index,
            speaker: turn.speaker,
            text: turn.text.clone(),
            error: turn.is_error(),
            segments: turn.text.as_deref().map(segments).unwrap_or_default(),
        }
    }
}

/// Full conversation state
#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    pub turns: Vec<TurnView>,
    pub pending: bool,
    pub system_message: String,
    pub history_len: usize,
    pub history_limit: usize,
}

impl From<Snapshot> for ConversationResponse {
    fn from(snapshot: Snapshot) -> Self {
        Self {
            turns: snapshot
                .turns
                .iter()
                .enumerate()
                .map(|(i, turn)| TurnView::new(i, turn))
                .collect(),
            pending: snapshot.pending,
            system_message: snapshot.system_message,
            history_len: snapshot.history_len,
            history_limit: snapshot.history_limit,
        }
    }
}

/// Response for chat action
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Generic success response
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub ok: bool,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// SSE payload: `ChatEvent` with turns expanded for rendering
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Init { conversation: ConversationResponse },
    UserTurn { turn: TurnView },
    TurnResolved { turn: TurnView },
    PendingChanged { pending: bool },
    SystemMessageChanged { system_message: String },
    Reset,
    /// Events were dropped; refetch the conversation
    Lagged { skipped: u64 },
}

impl StreamEvent {
    pub fn name(&self) -> &'static str {
        match self {
            StreamEvent::Init { .. } => "init",
            StreamEvent::UserTurn { .. } => "user_turn",
            StreamEvent::TurnResolved { .. } => "turn_resolved",
            StreamEvent::PendingChanged { .. } => "pending_changed",
            StreamEvent::SystemMessageChanged { .. } => "system_message_changed",
            StreamEvent::Reset => "reset",
            StreamEvent::Lagged { .. } => "lagged",
        }
    }
}

impl From<ChatEvent> for StreamEvent {
    fn from(event: ChatEvent) -> Self {
        match event {
            ChatEvent::UserTurn { index, turn } => StreamEvent::UserTurn {
                turn: TurnView::new(index, &turn),
            },
            ChatEvent::TurnResolved { index, turn } => StreamEvent::TurnResolved {
                turn: TurnView::new(index, &turn),
            },
            ChatEvent::PendingChanged { pending } => StreamEvent::PendingChanged { pending },
            ChatEvent::SystemMessageChanged { system_message } => {
                StreamEvent::SystemMessageChanged { system_message }
            }
            ChatEvent::Reset => StreamEvent::Reset,
        }
    }
}
