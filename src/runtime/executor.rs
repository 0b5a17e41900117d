//! Conversation runtime executor

use super::{ChatEvent, Command, ConversationHandle};
use crate::conversation::{Conversation, Submission, SubmissionId};
use crate::llm::CompletionClient;
use tokio::sync::{broadcast, mpsc};

const COMMAND_BUFFER: usize = 32;
const BROADCAST_BUFFER: usize = 128;

type Resolution = (SubmissionId, Option<String>);

/// Event loop owning the conversation state
pub struct ConversationRuntime {
    conversation: Conversation,
    completion: CompletionClient,
    command_rx: mpsc::Receiver<Command>,
    resolution_tx: mpsc::UnboundedSender<Resolution>,
    resolution_rx: mpsc::UnboundedReceiver<Resolution>,
    broadcast_tx: broadcast::Sender<ChatEvent>,
}

impl ConversationRuntime {
    /// Spawn the runtime loop and return a handle to it.
    ///
    /// The loop stops once every handle has been dropped.
    pub fn start(conversation: Conversation, completion: CompletionClient) -> ConversationHandle {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (resolution_tx, resolution_rx) = mpsc::unbounded_channel();
        let (broadcast_tx, _) = broadcast::channel(BROADCAST_BUFFER);

        let runtime = Self {
            conversation,
            completion,
            command_rx,
            resolution_tx,
            resolution_rx,
            broadcast_tx: broadcast_tx.clone(),
        };
        tokio::spawn(runtime.run());

        ConversationHandle::new(command_tx, broadcast_tx)
    }

    async fn run(mut self) {
        tracing::info!(model = %self.completion.model_id(), "Starting conversation runtime");

        loop {
            tokio::select! {
                command = self.command_rx.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some((id, reply)) = self.resolution_rx.recv() => {
                    self.handle_resolution(id, reply);
                }
            }
        }

        tracing::info!("Conversation runtime stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Submit { text, ack } => {
                let result = self.conversation.submit(&text);
                match &result {
                    Ok(submission) => {
                        let index = self.conversation.turns().len() - 1;
                        self.notify(ChatEvent::UserTurn {
                            index,
                            turn: self.conversation.turns()[index].clone(),
                        });
                        self.notify(ChatEvent::PendingChanged { pending: true });
                        debug_assert!(self.conversation.is_awaiting_reply());
                        self.request_completion(submission.clone());
                    }
                    Err(reason) => {
                        tracing::debug!(%reason, "Submission ignored");
                    }
                }
                let _ = ack.send(result.map(|s| s.id));
            }
            Command::Reset => {
                let was_pending = self.conversation.is_pending();
                self.conversation.reset();
                tracing::info!(was_pending, "Conversation reset");
                self.notify(ChatEvent::Reset);
            }
            Command::SetSystemMessage(text) => {
                self.conversation.set_system_message(text);
                self.notify(ChatEvent::SystemMessageChanged {
                    system_message: self.conversation.system_message().to_string(),
                });
            }
            Command::SetHistoryLimit(limit) => {
                tracing::info!(limit = limit.get(), "History limit changed");
                self.conversation.set_history_limit(limit);
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(self.conversation.snapshot());
            }
        }
    }

    /// Spawn the single outstanding request for `submission`
    fn request_completion(&self, submission: Submission) {
        let completion = self.completion.clone();
        let resolution_tx = self.resolution_tx.clone();

        tokio::spawn(async move {
            tracing::debug!(
                submission = ?submission.id,
                messages = submission.messages.len(),
                "Requesting completion"
            );
            let reply = completion.complete(&submission.messages).await;
            let _ = resolution_tx.send((submission.id, reply));
        });
    }

    fn handle_resolution(&mut self, id: SubmissionId, reply: Option<String>) {
        match self.conversation.resolve(id, reply) {
            Ok(turn) => {
                let turn = turn.clone();
                let index = self.conversation.turns().len() - 1;
                if turn.is_error() {
                    tracing::warn!(submission = ?id, "Completion failed, marking turn");
                } else {
                    tracing::debug!(
                        submission = ?id,
                        history_len = self.conversation.history().len(),
                        "Reply recorded"
                    );
                }
                self.notify(ChatEvent::TurnResolved { index, turn });
                self.notify(ChatEvent::PendingChanged { pending: false });
                debug_assert_eq!(
                    self.conversation.is_pending(),
                    self.conversation.is_awaiting_reply()
                );
            }
            Err(reason) => {
                tracing::warn!(submission = ?id, %reason, "Discarding completion result");
            }
        }
    }

    fn notify(&self, event: ChatEvent) {
        tracing::trace!(event = event.name(), "Broadcasting");
        // No subscribers is fine
        let _ = self.broadcast_tx.send(event);
    }
}
