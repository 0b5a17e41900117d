//! HTTP API for the browser UI
//!
//! Exposes the conversation snapshot, the submit/reset/system-message
//! entry points, and an SSE stream of state changes.

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;

use crate::gate::AccessGate;
use crate::runtime::ConversationHandle;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub conversation: ConversationHandle,
    pub gate: Arc<AccessGate>,
}

impl AppState {
    pub fn new(conversation: ConversationHandle, gate: AccessGate) -> Self {
        Self {
            conversation,
            gate: Arc::new(gate),
        }
    }
}
