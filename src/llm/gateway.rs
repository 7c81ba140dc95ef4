//! Multi-turn chat over a text model and a vision model

use super::types::{Content, DecodedImage, GenerateRequest, SafetySetting};
use super::{GatewayError, LlmService};
use crate::session::ModelGateway;
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Production `ModelGateway`
///
/// Text turns are sent with the full history and recorded on success.
/// Multimodal turns go to the vision model on their own and are not
/// recorded; whoever sends them records the exchange via `append_history`.
pub struct ChatGateway {
    text_model: Arc<dyn LlmService>,
    vision_model: Arc<dyn LlmService>,
    safety_settings: Vec<SafetySetting>,
    max_output_tokens: Option<u32>,
    history: Mutex<Vec<Content>>,
}

impl ChatGateway {
    pub fn new(text_model: Arc<dyn LlmService>, vision_model: Arc<dyn LlmService>) -> Self {
        Self {
            text_model,
            vision_model,
            safety_settings: Vec::new(),
            max_output_tokens: None,
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn with_safety_settings(mut self, settings: Vec<SafetySetting>) -> Self {
        self.safety_settings = settings;
        self
    }

    pub fn with_max_output_tokens(mut self, max: Option<u32>) -> Self {
        self.max_output_tokens = max;
        self
    }

    /// Start from earlier turns
    pub fn with_history(self, history: Vec<Content>) -> Self {
        *self.lock_history() = history;
        self
    }

    fn lock_history(&self) -> MutexGuard<'_, Vec<Content>> {
        // History entries are pushed whole, so a poisoned lock still holds a valid list
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn request(&self, contents: Vec<Content>) -> GenerateRequest {
        GenerateRequest {
            contents,
            safety_settings: self.safety_settings.clone(),
            max_output_tokens: self.max_output_tokens,
        }
    }

    async fn generate_text(
        model: &dyn LlmService,
        request: &GenerateRequest,
    ) -> Result<String, GatewayError> {
        let response = model.generate(request).await?;
        let text = response.text();
        if text.trim().is_empty() {
            return Err(GatewayError::empty_response());
        }
        Ok(text)
    }
}

#[async_trait]
impl ModelGateway for ChatGateway {
    async fn send_text(&self, text: &str) -> Result<String, GatewayError> {
        let user = Content::user_text(text);
        let mut contents = self.lock_history().clone();
        contents.push(user.clone());

        let request = self.request(contents);
        let reply = Self::generate_text(self.text_model.as_ref(), &request).await?;

        let mut history = self.lock_history();
        history.push(user);
        history.push(Content::model_text(reply.clone()));
        Ok(reply)
    }

    async fn send_multimodal(
        &self,
        text: &str,
        images: &[DecodedImage],
    ) -> Result<String, GatewayError> {
        let request = self.request(vec![Content::user_multimodal(text, images)]);
        Self::generate_text(self.vision_model.as_ref(), &request).await
    }

    fn append_history(&self, entries: Vec<Content>) {
        self.lock_history().extend(entries);
    }

    fn history(&self) -> Vec<Content> {
        self.lock_history().clone()
    }
}
