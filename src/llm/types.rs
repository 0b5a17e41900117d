//! Common types for completion requests

use crate::conversation::HistoryEntry;

/// Completion request: the history window, oldest first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmRequest {
    pub messages: Vec<HistoryEntry>,
}

impl LlmRequest {
    pub fn from_history(entries: &[HistoryEntry]) -> Self {
        Self {
            messages: entries.to_vec(),
        }
    }
}

/// Completion response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmResponse {
    pub text: String,
    pub usage: Usage,
}

impl LlmResponse {
    #[allow(dead_code)] // Used by mocks
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: Usage::default(),
        }
    }
}

/// Usage statistics, zero when the endpoint omits them
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}
