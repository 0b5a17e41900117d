//! Failure-absorbing completion boundary

use super::{LlmRequest, LlmService, LoggingService};
use crate::conversation::HistoryEntry;
use std::sync::Arc;

/// Sends one request per user turn and reports the reply or its absence.
///
/// Every failure (transport, status, body shape) is logged by the wrapped
/// `LoggingService` and collapses to `None`. One attempt, no retry.
#[derive(Clone)]
pub struct CompletionClient {
    service: Arc<dyn LlmService>,
}

impl CompletionClient {
    pub fn new(service: Arc<dyn LlmService>) -> Self {
        Self {
            service: Arc::new(LoggingService::new(service)),
        }
    }

    pub fn model_id(&self) -> &str {
        self.service.model_id()
    }

    pub async fn complete(&self, messages: &[HistoryEntry]) -> Option<String> {
        let request = LlmRequest::from_history(messages);
        self.service
            .complete(&request)
            .await
            .ok()
            .map(|response| response.text)
    }
}
