//! Ordered log of chat messages

#[cfg(test)]
mod proptests;

use crate::message::{Message, Sender};
use serde::{Deserialize, Serialize};

/// Message history for one session
///
/// Append-only apart from clearing the pending flag on the last entry.
/// Once closed, every mutation is refused.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    history: Vec<Message>,
    #[serde(skip)]
    closed: bool,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from prior history (restored state or the gateway's turns)
    pub fn from_messages(messages: impl IntoIterator<Item = Message>) -> Self {
        Self {
            history: messages.into_iter().collect(),
            closed: false,
        }
    }

    /// Clear pending flags left over from a state saved mid-turn
    ///
    /// No turn survives a restore to resolve them. Returns how many were cleared.
    pub fn settle_restored(&mut self) -> usize {
        let mut cleared = 0;
        for message in self.history.iter_mut().filter(|m| m.is_pending) {
            message.is_pending = false;
            cleared += 1;
        }
        cleared
    }

    /// Add a message to the end of history
    ///
    /// Returns false if the state is closed.
    pub fn append(&mut self, message: Message) -> bool {
        if self.closed {
            return false;
        }
        self.history.push(message);
        true
    }

    /// Clear the pending flag on the last message, if it is pending
    ///
    /// Returns true if a flag was cleared.
    pub fn resolve_pending(&mut self) -> bool {
        if self.closed {
            return false;
        }
        match self.history.last_mut() {
            Some(last) if last.is_pending => {
                last.is_pending = false;
                true
            }
            _ => false,
        }
    }

    /// Ordered copy of the history as of now
    pub fn snapshot(&self) -> Vec<Message> {
        self.history.clone()
    }

    pub fn messages(&self) -> &[Message] {
        &self.history
    }

    pub fn last(&self) -> Option<&Message> {
        self.history.last()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.history.iter().filter(|m| m.is_pending).count()
    }

    pub fn count_by(&self, sender: Sender) -> usize {
        self.history.iter().filter(|m| m.sender() == sender).count()
    }

    /// Refuse all further mutation (session teardown)
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
