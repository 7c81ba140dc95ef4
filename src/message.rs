//! Chat message entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Model,
    /// A failed turn, kept in history so failures stay visible
    Error,
}

impl Sender {
    pub fn as_str(self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Model => "model",
            Sender::Error => "error",
        }
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque message identifier, unique per created message
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque reference to an image the user attached (path, URI, ...)
///
/// The core never interprets it; an `ImageFetcher` does.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ImageRef {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ImageRef {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// One chat turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    pub text: String,
    sender: Sender,
    pub is_pending: bool,
    #[serde(default)]
    image_attachments: Vec<ImageRef>,
    created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(
        text: impl Into<String>,
        sender: Sender,
        is_pending: bool,
        image_attachments: Vec<ImageRef>,
    ) -> Self {
        Self {
            id: MessageId::generate(),
            text: text.into(),
            sender,
            is_pending,
            image_attachments,
            created_at: Utc::now(),
        }
    }

    /// A user turn awaiting its reply
    pub fn pending_user(text: impl Into<String>, image_attachments: Vec<ImageRef>) -> Self {
        Self::new(text, Sender::User, true, image_attachments)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(text, Sender::User, false, Vec::new())
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self::new(text, Sender::Model, false, Vec::new())
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(text, Sender::Error, false, Vec::new())
    }

    pub fn id(&self) -> &MessageId {
        &self.id
    }

    pub fn sender(&self) -> Sender {
        self.sender
    }

    pub fn image_attachments(&self) -> &[ImageRef] {
        &self.image_attachments
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
