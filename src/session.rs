//! Conversation sessions
//!
//! `SessionController` drives one conversation; `SessionManager` is the
//! injected owner a host holds on to, creating the controller on
//! `init_chat` and rejecting sends before that.

mod controller;
pub mod traits;


pub use controller::SessionController;
pub use traits::*;

use crate::config::{ChatConfig, ConfigError};
use crate::conversation::ConversationState;
use crate::message::{ImageRef, Message, MessageId};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// Misuse of the session API, reported to the immediate caller
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Chat is not initialized. Call init_chat first.")]
    NotInitialized,
    #[error("Session has been shut down")]
    Closed,
    #[error("send_message must be called from within a tokio runtime")]
    NoRuntime,
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Controller over trait objects, as held by `SessionManager`
pub type DynSessionController = SessionController<Arc<dyn ModelGateway>, Arc<dyn ImageFetcher>>;

/// Owner of the current chat session
pub struct SessionManager {
    fetcher: Arc<dyn ImageFetcher>,
    controller: RwLock<Option<Arc<DynSessionController>>>,
}

impl SessionManager {
    pub fn new(fetcher: Arc<dyn ImageFetcher>) -> Self {
        Self {
            fetcher,
            controller: RwLock::new(None),
        }
    }

    /// Start a chat over `gateway`, replacing any previous session
    pub fn init_chat(&self, gateway: Arc<dyn ModelGateway>) -> watch::Receiver<ConversationState> {
        let controller = Arc::new(SessionController::new(gateway, Arc::clone(&self.fetcher)));
        let rx = controller.subscribe();

        let previous = self
            .controller
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(controller);
        if let Some(previous) = previous {
            previous.shutdown();
        }

        tracing::info!("Chat initialized");
        rx
    }

    /// Start a chat against the configured Gemini models
    pub fn init_from_config(
        &self,
        config: &ChatConfig,
    ) -> Result<watch::Receiver<ConversationState>, SessionError> {
        let gateway = config.build_gateway()?;
        tracing::info!(
            text_model = %config.text_model,
            vision_model = %config.vision_model,
            gateway = config.base_url.is_some(),
            "Gemini gateway configured"
        );
        Ok(self.init_chat(Arc::new(gateway)))
    }

    fn current(&self) -> Result<Arc<DynSessionController>, SessionError> {
        self.controller
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(SessionError::NotInitialized)
    }

    pub fn send_message(
        &self,
        text: &str,
        image_refs: Vec<ImageRef>,
    ) -> Result<Option<MessageId>, SessionError> {
        self.current()?.send_message(text, image_refs)
    }

    pub fn snapshot(&self) -> Result<Vec<Message>, SessionError> {
        Ok(self.current()?.snapshot())
    }

    pub fn subscribe(&self) -> Result<watch::Receiver<ConversationState>, SessionError> {
        Ok(self.current()?.subscribe())
    }

    /// States of the current session, starting with the latest
    pub fn stream(&self) -> Result<WatchStream<ConversationState>, SessionError> {
        Ok(self.current()?.stream())
    }

    pub fn is_initialized(&self) -> bool {
        self.controller
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Tear down the current session, if any
    pub fn shutdown(&self) {
        let current = self
            .controller
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(controller) = current {
            controller.shutdown();
        }
    }
}
