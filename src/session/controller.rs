//! Session controller: turns user input into conversation state transitions

use super::traits::{ImageFetcher, ModelGateway};
use super::SessionError;
use crate::conversation::ConversationState;
use crate::llm::{Content, GatewayError, Role};
use crate::message::{ImageRef, Message, MessageId};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;

/// Generic session controller that can work with any gateway and fetcher
///
/// Owns the conversation state and publishes every mutation through a
/// watch channel. Each send runs on its own task; overlapping sends are
/// allowed, but their pending/resolved interleaving is not ordered.
pub struct SessionController<G, F>
where
    G: ModelGateway + 'static,
    F: ImageFetcher + 'static,
{
    gateway: Arc<G>,
    fetcher: Arc<F>,
    state_tx: watch::Sender<ConversationState>,
    /// Cancelled at teardown; in-flight turns race against it
    cancel: CancellationToken,
}

impl<G, F> SessionController<G, F>
where
    G: ModelGateway + 'static,
    F: ImageFetcher + 'static,
{
    /// Create a session seeded from the gateway's existing history
    pub fn new(gateway: G, fetcher: F) -> Self {
        let seeded = ConversationState::from_messages(
            gateway.history().iter().map(message_from_content),
        );
        Self::with_state(gateway, fetcher, seeded)
    }

    /// Create a session from restored state
    ///
    /// Messages saved while pending are settled; their turns did not survive.
    pub fn with_state(gateway: G, fetcher: F, mut state: ConversationState) -> Self {
        let settled = state.settle_restored();
        if settled > 0 {
            tracing::debug!(settled, "Cleared stale pending messages from restored state");
        }
        let (state_tx, _) = watch::channel(state);
        Self {
            gateway: Arc::new(gateway),
            fetcher: Arc::new(fetcher),
            state_tx,
            cancel: CancellationToken::new(),
        }
    }

    /// Send a user turn
    ///
    /// Appends a pending USER message and returns its id; the model call
    /// continues on a spawned task. Blank text is ignored regardless of
    /// attachments and yields `Ok(None)`.
    pub fn send_message(
        &self,
        text: &str,
        image_refs: Vec<ImageRef>,
    ) -> Result<Option<MessageId>, SessionError> {
        if self.cancel.is_cancelled() {
            return Err(SessionError::Closed);
        }
        if text.trim().is_empty() {
            tracing::debug!(attachments = image_refs.len(), "Ignoring blank message");
            return Ok(None);
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| SessionError::NoRuntime)?;

        let message = Message::pending_user(text, image_refs.clone());
        let message_id = message.id().clone();
        if !self.state_tx.send_if_modified(|state| state.append(message)) {
            return Err(SessionError::Closed);
        }

        tracing::info!(
            message_id = %message_id,
            attachments = image_refs.len(),
            "User message queued"
        );

        let turn = Turn {
            gateway: Arc::clone(&self.gateway),
            fetcher: Arc::clone(&self.fetcher),
            state_tx: self.state_tx.clone(),
            cancel: self.cancel.clone(),
            text: text.to_string(),
            image_refs,
            message_id: message_id.clone(),
        };
        runtime.spawn(turn.run());

        Ok(Some(message_id))
    }

    /// Current history
    pub fn snapshot(&self) -> Vec<Message> {
        self.state_tx.borrow().snapshot()
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<ConversationState> {
        self.state_tx.subscribe()
    }

    /// Stream of states, starting with the current one
    pub fn stream(&self) -> WatchStream<ConversationState> {
        WatchStream::new(self.subscribe())
    }

    /// The gateway's multi-turn history
    pub fn history(&self) -> Vec<Content> {
        self.gateway.history()
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancel in-flight turns and close the state to further writes
    pub fn shutdown(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.cancel.cancel();
        self.state_tx.send_modify(ConversationState::close);
        tracing::info!("Session shut down");
    }
}

impl<G, F> Drop for SessionController<G, F>
where
    G: ModelGateway + 'static,
    F: ImageFetcher + 'static,
{
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn message_from_content(content: &Content) -> Message {
    match content.role {
        Role::User => Message::user(content.text()),
        Role::Model => Message::model(content.text()),
    }
}

/// Work for one send, moved onto its own task
struct Turn<G, F> {
    gateway: Arc<G>,
    fetcher: Arc<F>,
    state_tx: watch::Sender<ConversationState>,
    cancel: CancellationToken,
    text: String,
    image_refs: Vec<ImageRef>,
    message_id: MessageId,
}

impl<G, F> Turn<G, F>
where
    G: ModelGateway + 'static,
    F: ImageFetcher + 'static,
{
    async fn run(self) {
        let outcome = tokio::select! {
            biased;
            () = self.cancel.cancelled() => {
                tracing::debug!(message_id = %self.message_id, "Turn cancelled");
                return;
            }
            outcome = self.dispatch() => outcome,
        };

        let reply = match outcome {
            Ok(text) => Message::model(text),
            Err(e) => {
                tracing::warn!(
                    message_id = %self.message_id,
                    kind = ?e.kind,
                    error = %e.message,
                    "Turn failed"
                );
                Message::error(e.display_text())
            }
        };

        // Resolve and append in one publish so no reader sees half a completion
        let applied = self.state_tx.send_if_modified(|state| {
            if state.is_closed() {
                return false;
            }
            state.resolve_pending();
            state.append(reply)
        });

        if applied {
            tracing::debug!(message_id = %self.message_id, "Turn resolved");
        } else {
            tracing::debug!(message_id = %self.message_id, "Session closed before turn resolved");
        }
    }

    async fn dispatch(&self) -> Result<String, GatewayError> {
        let images = self.resolve_images().await;

        if images.is_empty() {
            return self.gateway.send_text(&self.text).await;
        }

        let reply = self.gateway.send_multimodal(&self.text, &images).await?;
        // The multimodal path leaves history bookkeeping to us
        self.gateway.append_history(vec![
            Content::user_text(self.text.clone()),
            Content::model_text(reply.clone()),
        ]);
        Ok(reply)
    }

    /// Resolve attachments, dropping any that fail
    async fn resolve_images(&self) -> Vec<crate::llm::DecodedImage> {
        let results = futures::future::join_all(
            self.image_refs.iter().map(|r| self.fetcher.resolve(r)),
        )
        .await;

        self.image_refs
            .iter()
            .zip(results)
            .filter_map(|(reference, result)| match result {
                Ok(image) => Some(image),
                Err(e) => {
                    tracing::warn!(reference = %reference, error = %e, "Skipping attachment");
                    None
                }
            })
            .collect()
    }
}
