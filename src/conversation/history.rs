//! Model-facing history with a length cap

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::num::NonZeroUsize;

/// Role of a history entry as the completion endpoint sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One record in the outbound history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

impl HistoryEntry {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Ordered history that keeps only the newest `limit` entries.
///
/// The limit is checked after every push. Lowering it does not shrink the
/// stored entries until the next push.
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<HistoryEntry>,
    limit: NonZeroUsize,
}

impl History {
    pub fn new(limit: NonZeroUsize) -> Self {
        Self {
            entries: VecDeque::new(),
            limit,
        }
    }

    pub fn limit(&self) -> NonZeroUsize {
        self.limit
    }

    pub fn set_limit(&mut self, limit: NonZeroUsize) {
        self.limit = limit;
    }

    /// Append an entry, then drop from the front until within the limit.
    ///
    /// This may drop a system or user entry whose reply has not arrived yet.
    pub fn push(&mut self, entry: HistoryEntry) {
        self.entries.push_back(entry);
        while self.entries.len() > self.limit.get() {
            self.entries.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[allow(dead_code)] // Used by tests
    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<HistoryEntry> {
        self.entries.iter().cloned().collect()
    }

    #[allow(dead_code)] // Used by tests
    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }
}
