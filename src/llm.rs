//! Model provider abstraction
//!
//! `LlmService` is a single generation call against one model;
//! `ChatGateway` layers multi-turn history on top of a text and a vision
//! service.

mod error;
mod gateway;
mod gemini;
mod types;

pub use error::{GatewayError, GatewayErrorKind, FALLBACK_ERROR_TEXT};
pub use gateway::ChatGateway;
pub use gemini::{GeminiService, IMPLICIT_API_KEY};
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;

/// Common interface for model providers
#[async_trait]
pub trait LlmService: Send + Sync {
    /// Make a generation request
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, GatewayError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

#[async_trait]
impl<T: LlmService + ?Sized> LlmService for Arc<T> {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, GatewayError> {
        (**self).generate(request).await
    }

    fn model_id(&self) -> &str {
        (**self).model_id()
    }
}

/// Logging wrapper for model services
pub struct LoggingService {
    inner: Arc<dyn LlmService>,
    model_id: String,
}

impl LoggingService {
    pub fn new(inner: Arc<dyn LlmService>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }
}

#[async_trait]
impl LlmService for LoggingService {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, GatewayError> {
        let start = std::time::Instant::now();
        let result = self.inner.generate(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(response) => {
                tracing::info!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    turns = request.contents.len(),
                    input_tokens = response.usage.input_tokens,
                    output_tokens = response.usage.output_tokens,
                    "Model request completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    kind = ?e.kind,
                    transient = e.kind.is_transient(),
                    "Model request failed"
                );
            }
        }

        result
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
