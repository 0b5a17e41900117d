//! Conversation state
//!
//! Holds the transcript the UI renders, the history the model sees, and
//! the pending flag that keeps completion requests strictly serialized.
//! Every operation here is synchronous and free of I/O; the runtime owns
//! the single instance and drives the network call.

mod history;
mod turn;


pub use history::{History, HistoryEntry, Role};
pub use turn::{Speaker, Turn};

use serde::Serialize;
use std::num::NonZeroUsize;
use thiserror::Error;

pub const DEFAULT_SYSTEM_MESSAGE: &str = "You are an AI programming assistant. Follow the user requirements carefully & to the letter. Then output the code in a single code block. Minimize any other prose.";

/// Prefix prepended to the system message on every request
const SYSTEM_PREFIX: &str = "The user is user.";

/// Identifier of an accepted submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SubmissionId(u64);

/// An accepted submission and the history snapshot to send for it
#[derive(Debug, Clone)]
pub struct Submission {
    pub id: SubmissionId,
    pub messages: Vec<HistoryEntry>,
}

/// Why a submission was not accepted. Neither case is user-facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubmitRejected {
    #[error("message is empty")]
    Empty,
    #[error("a reply is still pending")]
    Busy,
}

/// Why a completion result was discarded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ResolveRejected {
    #[error("no submission is pending")]
    NotPending,
    #[error("submission {0:?} is no longer current")]
    Stale(SubmissionId),
}

/// Read-only view for the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub turns: Vec<Turn>,
    pub pending: bool,
    pub system_message: String,
    pub history_len: usize,
    pub history_limit: usize,
}

#[derive(Debug)]
pub struct Conversation {
    turns: Vec<Turn>,
    history: History,
    system_message: String,
    outstanding: Option<SubmissionId>,
    next_submission: u64,
}

impl Conversation {
    pub fn new(history_limit: NonZeroUsize, system_message: impl Into<String>) -> Self {
        Self {
            turns: Vec::new(),
            history: History::new(history_limit),
            system_message: system_message.into(),
            outstanding: None,
            next_submission: 0,
        }
    }

    /// Accept a user message and stage the history for its request.
    ///
    /// Appends the user turn, then a freshly derived system entry and the
    /// user entry to the history (truncating as it goes), and marks the
    /// conversation pending.
    pub fn submit(&mut self, text: &str) -> Result<Submission, SubmitRejected> {
        if self.outstanding.is_some() {
            return Err(SubmitRejected::Busy);
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(SubmitRejected::Empty);
        }

        self.turns.push(Turn::user(text));
        self.history.push(HistoryEntry::system(format!(
            "{SYSTEM_PREFIX} {}",
            self.system_message
        )));
        self.history.push(HistoryEntry::user(text));

        let id = SubmissionId(self.next_submission);
        self.next_submission += 1;
        self.outstanding = Some(id);

        Ok(Submission {
            id,
            messages: self.history.to_vec(),
        })
    }

    /// Record the outcome of the outstanding submission.
    ///
    /// A `None` reply still appends an assistant turn (rendered as an error)
    /// but leaves the history untouched.
    pub fn resolve(
        &mut self,
        id: SubmissionId,
        reply: Option<String>,
    ) -> Result<&Turn, ResolveRejected> {
        match self.outstanding {
            None => return Err(ResolveRejected::NotPending),
            Some(current) if current != id => return Err(ResolveRejected::Stale(id)),
            Some(_) => {}
        }
        self.outstanding = None;

        if let Some(text) = &reply {
            self.history.push(HistoryEntry::assistant(text.clone()));
        }
        self.turns.push(Turn::assistant(reply));
        Ok(&self.turns[self.turns.len() - 1])
    }

    /// Clear turns and history together. Configuration is kept.
    pub fn reset(&mut self) {
        self.turns.clear();
        self.history.clear();
        self.outstanding = None;
    }

    /// Takes effect on the next append; stored history is not shrunk now.
    pub fn set_history_limit(&mut self, limit: NonZeroUsize) {
        self.history.set_limit(limit);
    }

    /// Only future requests see the new message.
    pub fn set_system_message(&mut self, text: impl Into<String>) {
        self.system_message = text.into();
    }

    pub fn is_pending(&self) -> bool {
        self.outstanding.is_some()
    }

    /// Whether the transcript ends in a user turn with no reply yet
    pub fn is_awaiting_reply(&self) -> bool {
        self.turns
            .last()
            .is_some_and(|turn| turn.speaker == Speaker::User)
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn system_message(&self) -> &str {
        &self.system_message
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            turns: self.turns.clone(),
            pending: self.is_pending(),
            system_message: self.system_message.clone(),
            history_len: self.history.len(),
            history_limit: self.history.limit().get(),
        }
    }
}
