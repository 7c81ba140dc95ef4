//! Environment-driven configuration

use crate::images::DEFAULT_MAX_DIMENSION;
use crate::llm::{
    BlockThreshold, ChatGateway, GatewayError, GeminiService, HarmCategory, LlmService,
    LoggingService, SafetySetting,
};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_TEXT_MODEL: &str = "gemini-pro";
pub const DEFAULT_VISION_MODEL: &str = "gemini-pro-vision";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No API key configured. Set GEMINI_API_KEY or GEMINI_BASE_URL.")]
    MissingApiKey,
    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
    #[error("Failed to build model client: {0}")]
    Client(#[from] GatewayError),
}

/// Configuration for the chat session and its model gateway
#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub api_key: Option<String>,
    pub text_model: String,
    pub vision_model: String,
    /// Gateway URL replacing the public endpoint (e.g., `http://127.0.0.1:8080/llm`)
    pub base_url: Option<String>,
    pub max_image_dimension: u32,
    pub request_timeout: Duration,
    pub max_output_tokens: Option<u32>,
    pub safety_settings: Vec<SafetySetting>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            vision_model: DEFAULT_VISION_MODEL.to_string(),
            base_url: None,
            max_image_dimension: DEFAULT_MAX_DIMENSION,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            max_output_tokens: None,
            safety_settings: default_safety_settings(),
        }
    }
}

impl ChatConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source; `from_env` uses the process environment
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let non_empty = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        Ok(Self {
            api_key: non_empty("GEMINI_API_KEY"),
            text_model: non_empty("GEMINI_TEXT_MODEL").unwrap_or(defaults.text_model),
            vision_model: non_empty("GEMINI_VISION_MODEL").unwrap_or(defaults.vision_model),
            base_url: non_empty("GEMINI_BASE_URL"),
            max_image_dimension: parse_var(
                "CHAT_MAX_IMAGE_DIMENSION",
                non_empty("CHAT_MAX_IMAGE_DIMENSION"),
            )?
            .unwrap_or(defaults.max_image_dimension),
            request_timeout: parse_var::<u64>(
                "CHAT_REQUEST_TIMEOUT_SECS",
                non_empty("CHAT_REQUEST_TIMEOUT_SECS"),
            )?
            .map_or(defaults.request_timeout, Duration::from_secs),
            max_output_tokens: parse_var(
                "GEMINI_MAX_OUTPUT_TOKENS",
                non_empty("GEMINI_MAX_OUTPUT_TOKENS"),
            )?,
            safety_settings: defaults.safety_settings,
        })
    }

    /// Key sent with requests; gateway mode authenticates on its own
    fn effective_api_key(&self) -> Result<String, ConfigError> {
        match (&self.api_key, &self.base_url) {
            (Some(key), _) => Ok(key.clone()),
            (None, Some(_)) => Ok(crate::llm::IMPLICIT_API_KEY.to_string()),
            (None, None) => Err(ConfigError::MissingApiKey),
        }
    }

    fn service(&self, model: &str, api_key: &str) -> Result<Arc<dyn LlmService>, ConfigError> {
        let service =
            GeminiService::new(api_key, model, self.base_url.as_deref(), self.request_timeout)?;
        Ok(Arc::new(LoggingService::new(Arc::new(service))))
    }

    /// Gateway over the configured text and vision models
    pub fn build_gateway(&self) -> Result<ChatGateway, ConfigError> {
        let api_key = self.effective_api_key()?;
        let text = self.service(&self.text_model, &api_key)?;
        let vision = self.service(&self.vision_model, &api_key)?;
        Ok(ChatGateway::new(text, vision)
            .with_safety_settings(self.safety_settings.clone())
            .with_max_output_tokens(self.max_output_tokens))
    }
}

fn parse_var<T: FromStr>(var: &'static str, value: Option<String>) -> Result<Option<T>, ConfigError> {
    value
        .map(|v| {
            v.trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue { var, value: v })
        })
        .transpose()
}

/// Harassment and hate speech blocked from medium probability, dangerous
/// and sexually explicit content from low probability
pub fn default_safety_settings() -> Vec<SafetySetting> {
    vec![
        SafetySetting::new(HarmCategory::Harassment, BlockThreshold::MediumAndAbove),
        SafetySetting::new(HarmCategory::HateSpeech, BlockThreshold::MediumAndAbove),
        SafetySetting::new(HarmCategory::DangerousContent, BlockThreshold::LowAndAbove),
        SafetySetting::new(HarmCategory::SexuallyExplicit, BlockThreshold::LowAndAbove),
    ]
}
