//! Common types for model interactions

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};

/// Author of a history entry, as the model sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

/// Decoded, size-bounded image ready to be sent inline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub media_type: String,
    /// Encoded bytes in `media_type` format
    pub data: Vec<u8>,
}

impl DecodedImage {
    pub fn to_part(&self) -> Part {
        Part::InlineImage {
            media_type: self.media_type.clone(),
            data: BASE64.encode(&self.data),
        }
    }
}

/// One piece of a turn's content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text(String),
    InlineImage {
        media_type: String,
        /// Base64 payload
        data: String,
    },
}

impl Part {
    pub fn text(s: impl Into<String>) -> Self {
        Part::Text(s.into())
    }
}

/// One turn of conversation history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::text(text)],
        }
    }

    pub fn model_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            parts: vec![Part::text(text)],
        }
    }

    /// Images first, then the text, as multimodal prompts expect
    pub fn user_multimodal(text: impl Into<String>, images: &[DecodedImage]) -> Self {
        let mut parts: Vec<Part> = images.iter().map(DecodedImage::to_part).collect();
        parts.push(Part::text(text));
        Self {
            role: Role::User,
            parts,
        }
    }

    /// Concatenated text parts
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                Part::InlineImage { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }
}

/// Harm categories a safety setting applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HarmCategory {
    #[serde(rename = "HARM_CATEGORY_HARASSMENT")]
    Harassment,
    #[serde(rename = "HARM_CATEGORY_HATE_SPEECH")]
    HateSpeech,
    #[serde(rename = "HARM_CATEGORY_DANGEROUS_CONTENT")]
    DangerousContent,
    #[serde(rename = "HARM_CATEGORY_SEXUALLY_EXPLICIT")]
    SexuallyExplicit,
}

/// Probability threshold at which content gets blocked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockThreshold {
    #[serde(rename = "BLOCK_LOW_AND_ABOVE")]
    LowAndAbove,
    #[serde(rename = "BLOCK_MEDIUM_AND_ABOVE")]
    MediumAndAbove,
    #[serde(rename = "BLOCK_ONLY_HIGH")]
    OnlyHigh,
    #[serde(rename = "BLOCK_NONE")]
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetySetting {
    pub category: HarmCategory,
    pub threshold: BlockThreshold,
}

impl SafetySetting {
    pub fn new(category: HarmCategory, threshold: BlockThreshold) -> Self {
        Self {
            category,
            threshold,
        }
    }
}

/// Generation request
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
    pub safety_settings: Vec<SafetySetting>,
    pub max_output_tokens: Option<u32>,
}

/// Generation response
#[derive(Debug, Clone)]
pub struct GenerateResponse {
    /// First candidate's content
    pub content: Content,
    pub finish_reason: Option<String>,
    pub usage: Usage,
}

impl GenerateResponse {
    pub fn text(&self) -> String {
        self.content.text()
    }
}

/// Usage statistics
#[derive(Debug, Clone, Copy, Default)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}
