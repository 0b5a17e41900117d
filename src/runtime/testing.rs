//! Mock completion services and runtime integration tests

use crate::llm::{LlmError, LlmRequest, LlmResponse, LlmService};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

// ============================================================================
// Mock LLM Service
// ============================================================================

/// Mock service that returns queued responses
pub struct MockLlmService {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    /// Record of all requests made
    pub requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlmService {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful reply
    pub fn queue_text(&self, text: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(LlmResponse::text(text)));
    }

    /// Queue an error response
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next_response(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }
}

#[async_trait]
impl LlmService for MockLlmService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.next_response(request)
    }

    fn model_id(&self) -> &str {
        "mock-model"
    }
}

// ============================================================================
// Gated Mock LLM Service (for in-flight testing)
// ============================================================================

/// Mock service that holds each request until released
pub struct GatedMockLlmService {
    inner: MockLlmService,
    /// Notified when a request arrives
    pub request_started: Arc<Notify>,
    /// Notify once per request to let it finish
    pub release: Arc<Notify>,
}

impl GatedMockLlmService {
    pub fn new() -> Self {
        Self {
            inner: MockLlmService::new(),
            request_started: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
        }
    }

    pub fn queue_text(&self, text: &str) {
        self.inner.queue_text(text);
    }

    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.inner.recorded_requests()
    }
}

#[async_trait]
impl LlmService for GatedMockLlmService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.request_started.notify_one();
        self.release.notified().await;
        self.inner.next_response(request)
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{
        Conversation, HistoryEntry, Role, Speaker, SubmitRejected, Turn, DEFAULT_SYSTEM_MESSAGE,
    };
    use crate::llm::CompletionClient;
    use crate::runtime::{ChatEvent, ConversationHandle, ConversationRuntime, RuntimeError};
    use std::num::NonZeroUsize;
    use std::time::Duration;
    use tokio::sync::broadcast;

    const WAIT: Duration = Duration::from_secs(2);

    fn start(service: Arc<dyn LlmService>, limit: usize) -> ConversationHandle {
        let conversation = Conversation::new(
            NonZeroUsize::new(limit).unwrap(),
            DEFAULT_SYSTEM_MESSAGE,
        );
        ConversationRuntime::start(conversation, CompletionClient::new(service))
    }

    /// Wait for the next `TurnResolved` event, skipping others
    async fn next_resolved(rx: &mut broadcast::Receiver<ChatEvent>) -> Turn {
        tokio::time::timeout(WAIT, async {
            loop {
                if let ChatEvent::TurnResolved { turn, .. } = rx.recv().await.unwrap() {
                    return turn;
                }
            }
        })
        .await
        .expect("timed out waiting for resolution")
    }

    #[tokio::test]
    async fn test_mock_llm_service() {
        let mock = MockLlmService::new();
        mock.queue_text("Hello");

        let request = LlmRequest { messages: vec![] };
        let response = mock.complete(&request).await.unwrap();
        assert_eq!(response.text, "Hello");

        // Second call should fail (no more responses)
        assert!(mock.complete(&request).await.is_err());
        assert_eq!(mock.recorded_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_round_trip() {
        let llm = Arc::new(MockLlmService::new());
        llm.queue_text("Y");
        let handle = start(llm.clone(), 10);
        let mut rx = handle.subscribe();

        handle.submit("X").await.unwrap();
        let turn = next_resolved(&mut rx).await;
        assert_eq!(turn, Turn::assistant(Some("Y".to_string())));

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(
            snapshot.turns,
            vec![Turn::user("X"), Turn::assistant(Some("Y".to_string()))]
        );
        assert!(!snapshot.pending);
        assert_eq!(snapshot.history_len, 3);

        let requests = llm.recorded_requests();
        assert_eq!(requests.len(), 1);
        let roles: Vec<Role> = requests[0].messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User]);
        assert_eq!(requests[0].messages[1].content, "X");
    }

    #[tokio::test]
    async fn test_events_are_published_in_order() {
        let llm = Arc::new(MockLlmService::new());
        llm.queue_text("pong");
        let handle = start(llm, 10);
        let mut rx = handle.subscribe();

        handle.submit("ping").await.unwrap();
        let mut events = Vec::new();
        for _ in 0..4 {
            events.push(tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap());
        }

        assert_eq!(
            events,
            vec![
                ChatEvent::UserTurn {
                    index: 0,
                    turn: Turn::user("ping")
                },
                ChatEvent::PendingChanged { pending: true },
                ChatEvent::TurnResolved {
                    index: 1,
                    turn: Turn::assistant(Some("pong".to_string()))
                },
                ChatEvent::PendingChanged { pending: false },
            ]
        );
    }

    #[tokio::test]
    async fn test_failure_marks_turn_and_clears_pending() {
        let llm = Arc::new(MockLlmService::new());
        llm.queue_error(LlmError::network("connection reset"));
        let handle = start(llm.clone(), 10);
        let mut rx = handle.subscribe();

        handle.submit("X").await.unwrap();
        let turn = next_resolved(&mut rx).await;
        assert!(turn.is_error());

        let snapshot = handle.snapshot().await.unwrap();
        assert!(!snapshot.pending);
        assert!(snapshot.turns.last().unwrap().is_error());
        // System + user only; no assistant entry
        assert_eq!(snapshot.history_len, 2);

        // Still usable afterwards
        llm.queue_text("recovered");
        handle.submit("again").await.unwrap();
        let turn = next_resolved(&mut rx).await;
        assert_eq!(turn.text.as_deref(), Some("recovered"));
    }

    #[tokio::test]
    async fn test_rapid_submissions_only_first_is_sent() {
        let llm = Arc::new(GatedMockLlmService::new());
        llm.queue_text("reply to a");
        let handle = start(llm.clone(), 10);
        let mut rx = handle.subscribe();

        handle.submit("a").await.unwrap();
        assert_eq!(
            handle.submit("b").await,
            Err(RuntimeError::Rejected(SubmitRejected::Busy))
        );

        tokio::time::timeout(WAIT, llm.request_started.notified())
            .await
            .unwrap();
        let snapshot = handle.snapshot().await.unwrap();
        assert!(snapshot.pending);
        assert_eq!(snapshot.turns, vec![Turn::user("a")]);

        llm.release.notify_one();
        next_resolved(&mut rx).await;

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.turns.len(), 2);
        assert_eq!(snapshot.turns[1].speaker, Speaker::Assistant);
        assert_eq!(llm.recorded_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_blank_submission_is_ignored() {
        let llm = Arc::new(MockLlmService::new());
        let handle = start(llm.clone(), 10);

        assert_eq!(
            handle.submit("   ").await,
            Err(RuntimeError::Rejected(SubmitRejected::Empty))
        );
        let snapshot = handle.snapshot().await.unwrap();
        assert!(snapshot.turns.is_empty());
        assert!(!snapshot.pending);
        assert!(llm.recorded_requests().is_empty());
    }

    #[tokio::test]
    async fn test_reset_discards_in_flight_reply() {
        let llm = Arc::new(GatedMockLlmService::new());
        llm.queue_text("late");
        let handle = start(llm.clone(), 10);

        handle.submit("first").await.unwrap();
        tokio::time::timeout(WAIT, llm.request_started.notified())
            .await
            .unwrap();

        handle.reset().await.unwrap();
        let snapshot = handle.snapshot().await.unwrap();
        assert!(snapshot.turns.is_empty());
        assert_eq!(snapshot.history_len, 0);
        assert!(!snapshot.pending);

        llm.release.notify_one();
        // Let the stale reply arrive and be discarded
        tokio::time::sleep(Duration::from_millis(50)).await;

        let snapshot = handle.snapshot().await.unwrap();
        assert!(snapshot.turns.is_empty());
        assert_eq!(snapshot.history_len, 0);
    }

    #[tokio::test]
    async fn test_history_cap_across_turns() {
        let llm = Arc::new(MockLlmService::new());
        llm.queue_text("hello");
        llm.queue_text("see you");
        let handle = start(llm.clone(), 4);
        let mut rx = handle.subscribe();

        handle.submit("hi").await.unwrap();
        next_resolved(&mut rx).await;
        assert_eq!(handle.snapshot().await.unwrap().history_len, 3);

        handle.submit("bye").await.unwrap();
        next_resolved(&mut rx).await;
        assert_eq!(handle.snapshot().await.unwrap().history_len, 4);

        let second = &llm.recorded_requests()[1];
        let sent = &second.messages;
        assert_eq!(sent.len(), 4);
        assert_eq!(sent[0], HistoryEntry::user("hi"));
        assert_eq!(sent[1], HistoryEntry::assistant("hello"));
        assert_eq!(sent[3], HistoryEntry::user("bye"));
    }

    #[tokio::test]
    async fn test_configuration_changes_apply_to_next_request() {
        let llm = Arc::new(MockLlmService::new());
        llm.queue_text("one");
        llm.queue_text("two");
        let handle = start(llm.clone(), 10);
        let mut rx = handle.subscribe();

        handle.submit("first").await.unwrap();
        next_resolved(&mut rx).await;

        handle.set_system_message("Answer in French.").await.unwrap();
        handle
            .set_history_limit(NonZeroUsize::new(2).unwrap())
            .await
            .unwrap();
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.system_message, "Answer in French.");
        assert_eq!(snapshot.history_limit, 2);
        assert_eq!(snapshot.history_len, 3);

        handle.submit("second").await.unwrap();
        next_resolved(&mut rx).await;

        let second = &llm.recorded_requests()[1];
        assert_eq!(second.messages.len(), 2);
        assert_eq!(second.messages[0].role, Role::System);
        assert_eq!(
            second.messages[0].content,
            "The user is user. Answer in French."
        );
    }

    #[tokio::test]
    async fn test_reset_and_system_message_are_broadcast() {
        let llm = Arc::new(MockLlmService::new());
        let handle = start(llm, 10);
        let mut rx = handle.subscribe();

        handle.set_system_message("Answer in French.").await.unwrap();
        handle.reset().await.unwrap();
        // Limit changes are not broadcast; the snapshot carries them
        handle
            .set_history_limit(NonZeroUsize::new(3).unwrap())
            .await
            .unwrap();
        handle.snapshot().await.unwrap();

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert_eq!(
            events,
            vec![
                ChatEvent::SystemMessageChanged {
                    system_message: "Answer in French.".to_string()
                },
                ChatEvent::Reset,
            ]
        );
    }

    #[tokio::test]
    async fn test_handle_reports_stopped_runtime() {
        let (command_tx, command_rx) = tokio::sync::mpsc::channel(1);
        let (broadcast_tx, _) = broadcast::channel(1);
        drop(command_rx);
        let handle = ConversationHandle::new(command_tx, broadcast_tx);

        assert_eq!(handle.reset().await, Err(RuntimeError::Stopped));
        assert_eq!(handle.submit("x").await, Err(RuntimeError::Stopped));
    }
}
