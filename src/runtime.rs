//! Runtime for the conversation
//!
//! A single task owns the `Conversation` and applies commands one at a
//! time. The completion request is the only suspension point; it runs in
//! a spawned task and reports back over a channel, so the state is never
//! touched concurrently. Observers subscribe to `ChatEvent`s.

mod executor;

#[cfg(test)]
pub mod testing;

pub use executor::ConversationRuntime;

use crate::conversation::{Snapshot, SubmissionId, SubmitRejected, Turn};
use serde::Serialize;
use std::num::NonZeroUsize;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};

/// Commands accepted by the runtime loop
#[derive(Debug)]
pub enum Command {
    Submit {
        text: String,
        ack: oneshot::Sender<Result<SubmissionId, SubmitRejected>>,
    },
    Reset,
    SetSystemMessage(String),
    SetHistoryLimit(NonZeroUsize),
    Snapshot(oneshot::Sender<Snapshot>),
}

/// State-change notifications for the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// A user turn was accepted and its request issued
    UserTurn { index: usize, turn: Turn },
    /// The pending request finished; `turn.text` is `None` on failure
    TurnResolved { index: usize, turn: Turn },
    PendingChanged { pending: bool },
    SystemMessageChanged { system_message: String },
    Reset,
}

impl ChatEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ChatEvent::UserTurn { .. } => "user_turn",
            ChatEvent::TurnResolved { .. } => "turn_resolved",
            ChatEvent::PendingChanged { .. } => "pending_changed",
            ChatEvent::SystemMessageChanged { .. } => "system_message_changed",
            ChatEvent::Reset => "reset",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("conversation runtime has stopped")]
    Stopped,
    #[error(transparent)]
    Rejected(#[from] SubmitRejected),
}

/// Cloneable handle to the running conversation
#[derive(Clone)]
pub struct ConversationHandle {
    command_tx: mpsc::Sender<Command>,
    broadcast_tx: broadcast::Sender<ChatEvent>,
}

impl ConversationHandle {
    pub(crate) fn new(
        command_tx: mpsc::Sender<Command>,
        broadcast_tx: broadcast::Sender<ChatEvent>,
    ) -> Self {
        Self {
            command_tx,
            broadcast_tx,
        }
    }

    /// Submit a user message. Blank text and submissions while a reply is
    /// pending are rejected without any effect.
    pub async fn submit(&self, text: impl Into<String>) -> Result<SubmissionId, RuntimeError> {
        let (ack, ack_rx) = oneshot::channel();
        self.send(Command::Submit {
            text: text.into(),
            ack,
        })
        .await?;
        let id = ack_rx.await.map_err(|_| RuntimeError::Stopped)??;
        Ok(id)
    }

    pub async fn reset(&self) -> Result<(), RuntimeError> {
        self.send(Command::Reset).await
    }

    pub async fn set_system_message(&self, text: impl Into<String>) -> Result<(), RuntimeError> {
        self.send(Command::SetSystemMessage(text.into())).await
    }

    pub async fn set_history_limit(&self, limit: NonZeroUsize) -> Result<(), RuntimeError> {
        self.send(Command::SetHistoryLimit(limit)).await
    }

    pub async fn snapshot(&self) -> Result<Snapshot, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Snapshot(tx)).await?;
        rx.await.map_err(|_| RuntimeError::Stopped)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.broadcast_tx.subscribe()
    }

    async fn send(&self, command: Command) -> Result<(), RuntimeError> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| RuntimeError::Stopped)
    }
}
