//! Fake LLM provider for testing.
//!
//! Returns deterministic responses based on prompt matching, so tests run
//! without network access. Every call is recorded.

use super::{LlmProvider, RawText};
use crate::error::UpstreamError;
use async_trait::async_trait;
use std::sync::{PoisonError, RwLock};

/// A fake LLM provider for testing.
///
/// Responses are matched by checking if the prompt contains a registered
/// substring (case-insensitive), first registration wins.
#[derive(Debug)]
pub struct FakeProvider {
    /// Ordered (prompt substring, response) pairs
    responses: RwLock<Vec<(String, String)>>,
    /// Default response if no match found
    default_response: Option<String>,
    /// Prompts received, in call order
    prompts: RwLock<Vec<String>>,
}

impl Default for FakeProvider {
    fn default() -> Self {
        Self {
            responses: RwLock::new(Vec::new()),
            default_response: Some(r#"{"type": "unknown"}"#.to_string()),
            prompts: RwLock::new(Vec::new()),
        }
    }
}

impl FakeProvider {
    /// Create a new FakeProvider with no registered responses.
    pub fn new() -> Self {
        Self {
            default_response: None,
            ..Self::default()
        }
    }

    /// Create a FakeProvider that returns a specific response for prompts containing a substring.
    pub fn with_response(prompt_contains: &str, response: &str) -> Self {
        let provider = Self::new();
        provider.add_response(prompt_contains, response);
        provider
    }

    /// Add a response for prompts containing a specific substring.
    pub fn add_response(&self, prompt_contains: &str, response: &str) {
        self.responses
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((prompt_contains.to_lowercase(), response.to_string()));
    }

    /// Set the default response when no pattern matches.
    pub fn with_default_response(mut self, response: &str) -> Self {
        self.default_response = Some(response.to_string());
        self
    }

    /// Number of completed calls.
    pub fn call_count(&self) -> usize {
        self.prompts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Prompts received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl LlmProvider for FakeProvider {
    async fn complete(&self, prompt: &str) -> Result<RawText, UpstreamError> {
        self.prompts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(prompt.to_string());

        let prompt_lower = prompt.to_lowercase();
        let matched = self
            .responses
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|(pattern, _)| prompt_lower.contains(pattern.as_str()))
            .map(|(_, response)| response.clone());

        match matched.or_else(|| self.default_response.clone()) {
            Some(response) => Ok(RawText::new(response)),
            None => Err(UpstreamError::Unavailable(format!(
                "FakeProvider: no response configured for prompt: {}",
                super::truncate_chars(prompt, 100)
            ))),
        }
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }

    fn model_name(&self) -> &str {
        "fake-model"
    }
}
