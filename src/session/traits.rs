//! Collaborator contracts for the session controller
//!
//! These traits enable testing the controller with mock implementations.

use crate::images::AttachmentError;
use crate::llm::{Content, DecodedImage, GatewayError};
use crate::message::ImageRef;
use async_trait::async_trait;
use std::sync::Arc;

/// Generative model reached by the controller
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Send a text turn; the gateway keeps the multi-turn history
    async fn send_text(&self, text: &str) -> Result<String, GatewayError>;

    /// Send a text + images turn; not recorded in history by the gateway
    async fn send_multimodal(
        &self,
        text: &str,
        images: &[DecodedImage],
    ) -> Result<String, GatewayError>;

    /// Record externally built turns
    fn append_history(&self, entries: Vec<Content>);

    /// Current turn history
    fn history(&self) -> Vec<Content>;
}

/// Resolves opaque image references into bounded, decoded images
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn resolve(&self, reference: &ImageRef) -> Result<DecodedImage, AttachmentError>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: ModelGateway + ?Sized> ModelGateway for Arc<T> {
    async fn send_text(&self, text: &str) -> Result<String, GatewayError> {
        (**self).send_text(text).await
    }

    async fn send_multimodal(
        &self,
        text: &str,
        images: &[DecodedImage],
    ) -> Result<String, GatewayError> {
        (**self).send_multimodal(text, images).await
    }

    fn append_history(&self, entries: Vec<Content>) {
        (**self).append_history(entries);
    }

    fn history(&self) -> Vec<Content> {
        (**self).history()
    }
}

#[async_trait]
impl<T: ImageFetcher + ?Sized> ImageFetcher for Arc<T> {
    async fn resolve(&self, reference: &ImageRef) -> Result<DecodedImage, AttachmentError> {
        (**self).resolve(reference).await
    }
}
