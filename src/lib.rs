//! Gemini Chat - multi-turn, multi-modal conversation core
//!
//! A session controller keeps an observable message log and forwards user
//! turns (text plus optional images) to a hosted generative model.

pub mod config;
pub mod conversation;
pub mod images;
pub mod llm;
pub mod message;
pub mod session;

pub use config::{ChatConfig, ConfigError};
pub use conversation::ConversationState;
pub use images::{AttachmentError, AttachmentRoot, FileImageFetcher};
pub use llm::{ChatGateway, GatewayError, GatewayErrorKind};
pub use message::{ImageRef, Message, MessageId, Sender};
pub use session::{
    ImageFetcher, ModelGateway, SessionController, SessionError, SessionManager,
};
