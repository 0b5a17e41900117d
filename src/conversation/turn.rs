//! UI-facing transcript entries

use serde::{Deserialize, Serialize};

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    User,
    Assistant,
}

/// One exchange unit in the transcript.
///
/// `text` is `None` only for an assistant turn whose completion failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: Option<String>,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: Some(text.into()),
        }
    }

    pub fn assistant(text: Option<String>) -> Self {
        Self {
            speaker: Speaker::Assistant,
            text,
        }
    }

    /// Whether this turn should render as an error placeholder
    pub fn is_error(&self) -> bool {
        self.speaker == Speaker::Assistant && self.text.is_none()
    }
}
