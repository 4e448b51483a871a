//! Generative-model provider abstraction.
//!
//! A provider makes exactly one attempt per call and classifies why it failed.
//! Its output is [`RawText`]: unverified free text that must go through
//! [`crate::sanitize`] and [`crate::validate`] before becoming a domain value.

mod fake;
mod gemini;

pub use fake::FakeProvider;
pub use gemini::GeminiProvider;

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::config::{ModelConfig, ProviderKind};
use crate::error::UpstreamError;

/// Unverified text returned by the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawText(String);

impl RawText {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First `max_chars` characters, for logs.
    pub fn snippet(&self, max_chars: usize) -> String {
        truncate_chars(&self.0, max_chars)
    }
}

/// Truncate on a char boundary, marking the cut with an ellipsis.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

/// Trait for generative-model providers.
///
/// Implementations must be thread-safe and must not retry internally.
#[async_trait]
pub trait LlmProvider: Send + Sync + fmt::Debug {
    /// Send a prompt and return the model's text payload.
    async fn complete(&self, prompt: &str) -> Result<RawText, UpstreamError>;

    /// Provider name (e.g., "gemini", "fake").
    fn provider_name(&self) -> &'static str;

    /// Model name (e.g., "gemini-2.0-flash").
    fn model_name(&self) -> &str;
}

/// Build the configured provider.
pub fn create_provider(config: &ModelConfig) -> Result<Arc<dyn LlmProvider>, UpstreamError> {
    match config.provider {
        ProviderKind::Fake => Ok(Arc::new(FakeProvider::default())),
        ProviderKind::Gemini => {
            let api_key = config.api_key.clone().ok_or_else(|| {
                UpstreamError::NotConfigured("GEMINI_API_KEY not set".to_string())
            })?;
            let provider = GeminiProvider::new(
                api_key,
                config.model.clone(),
                config.base_url.clone(),
                config.timeout,
            )?;
            Ok(Arc::new(provider))
        }
    }
}
