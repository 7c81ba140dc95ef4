//! Google Gemini provider implementation

use super::types::{
    Content, GenerateRequest, GenerateResponse, Part, Role, SafetySetting, Usage,
};
use super::{GatewayError, LlmService};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// API key placeholder for gateway mode, where the gateway authenticates
pub const IMPLICIT_API_KEY: &str = "implicit";

/// Gemini service implementation
pub struct GeminiService {
    client: Client,
    api_key: String,
    url: String,
    model_id: String,
}

impl GeminiService {
    pub fn new(
        api_key: impl Into<String>,
        model: &str,
        base_url: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            base_url.unwrap_or(DEFAULT_BASE_URL).trim_end_matches('/'),
            model
        );

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            url,
            model_id: model.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn translate_request(request: &GenerateRequest) -> GeminiRequest {
        let contents = request
            .contents
            .iter()
            .filter(|c| !c.parts.is_empty())
            .map(|c| GeminiContent {
                role: Some(c.role.as_str().to_string()),
                parts: c
                    .parts
                    .iter()
                    .map(|part| match part {
                        Part::Text(text) => GeminiPart::Text { text: text.clone() },
                        Part::InlineImage { media_type, data } => GeminiPart::InlineData {
                            inline_data: GeminiBlob {
                                mime_type: media_type.clone(),
                                data: data.clone(),
                            },
                        },
                    })
                    .collect(),
            })
            .collect();

        GeminiRequest {
            contents,
            safety_settings: request.safety_settings.clone(),
            generation_config: request.max_output_tokens.map(|t| GeminiGenerationConfig {
                max_output_tokens: Some(t),
            }),
        }
    }

    fn normalize_response(resp: GeminiResponse) -> Result<GenerateResponse, GatewayError> {
        if let Some(reason) = resp.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(GatewayError::policy(format!("Prompt was blocked: {reason}")));
        }

        let Some(candidate) = resp.candidates.into_iter().next() else {
            return Err(GatewayError::empty_response());
        };

        if let Some(reason) = candidate.finish_reason.as_deref() {
            if matches!(reason, "SAFETY" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "RECITATION") {
                return Err(GatewayError::policy(format!("Response was blocked: {reason}")));
            }
        }

        let parts = candidate
            .content
            .map(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|part| match part {
                GeminiPart::Text { text } if !text.is_empty() => Some(Part::Text(text)),
                _ => None, // Ignore other types
            })
            .collect();

        let usage = resp.usage_metadata.unwrap_or_default();

        Ok(GenerateResponse {
            content: Content {
                role: Role::Model,
                parts,
            },
            finish_reason: candidate.finish_reason,
            usage: Usage {
                input_tokens: u64::from(usage.prompt_token_count),
                output_tokens: u64::from(usage.candidates_token_count),
            },
        })
    }
}

fn classify_status(status: u16, message: &str) -> GatewayError {
    match status {
        400 => GatewayError::invalid_request(format!("Invalid request: {message}")),
        401 | 403 => GatewayError::auth(format!("Authentication failed: {message}")),
        429 => GatewayError::rate_limit(format!("Rate limit exceeded: {message}")),
        500..=599 => GatewayError::server_error(format!("Server error: {message}")),
        _ => GatewayError::unknown(format!("HTTP {status}: {message}")),
    }
}

#[async_trait]
impl LlmService for GeminiService {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, GatewayError> {
        let gemini_request = Self::translate_request(request);

        let mut builder = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json");
        if self.api_key != IMPLICIT_API_KEY {
            builder = builder.query(&[("key", self.api_key.as_str())]);
        }

        let response = builder.json(&gemini_request).send().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::network(format!("Request timeout: {e}"))
            } else if e.is_connect() {
                GatewayError::network(format!("Connection failed: {e}"))
            } else {
                GatewayError::unknown(format!("Request failed: {e}"))
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            let message = serde_json::from_str::<GeminiErrorResponse>(&body)
                .map_or(body, |r| r.error.message);
            return Err(classify_status(status.as_u16(), &message));
        }

        let gemini_response: GeminiResponse = serde_json::from_str(&body).map_err(|e| {
            GatewayError::unknown(format!("Failed to parse response: {e} - body: {body}"))
        })?;

        Self::normalize_response(gemini_response)
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// Gemini API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    safety_settings: Vec<SafetySetting>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiBlob,
    },
    /// Function calls and anything else we never request
    Other(serde_json::Value),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiBlob {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    prompt_feedback: Option<GeminiPromptFeedback>,
    usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
}
