//! LLM Provider Abstraction
//!
//! Defines the LlmProvider trait for the generative text service.
//! All providers return `LlmResponse` with token usage for cost accounting.

mod ollama;
mod openai;

pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

pub use crate::types::{ErrorCategory, ErrorClassifier, LlmError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::ai::prompt::PromptTemplates;
use crate::config::LlmConfig;
use crate::types::{ReportError, Result};

// =============================================================================
// Request / Response
// =============================================================================

/// One call to the generative text service
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// System persona
    pub persona: String,
    /// Section title, used to frame the instruction
    pub title: String,
    /// Section instruction
    pub prompt: String,
    /// Fixed-format rendering of the period data
    pub context: String,
    /// Output cap
    pub max_tokens: u32,
}

impl GenerationRequest {
    /// The user turn sent alongside the persona
    pub fn user_message(&self) -> String {
        PromptTemplates::report_section(&self.title, &self.prompt, &self.context).build()
    }
}

/// Generated text plus usage metrics
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub text: String,
    pub usage: TokenUsage,
    pub metadata: ResponseMetadata,
}

impl LlmResponse {
    pub fn new(text: impl Into<String>, usage: TokenUsage, metadata: ResponseMetadata) -> Self {
        Self {
            text: text.into(),
            usage,
            metadata,
        }
    }

    pub fn tokens_used(&self) -> u32 {
        self.usage.total()
    }
}

/// Token usage metrics for cost tracking
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Input tokens (prompt)
    pub input_tokens: u32,
    /// Output tokens (response)
    pub output_tokens: u32,
}

impl TokenUsage {
    /// Total tokens used (input + output)
    pub fn total(&self) -> u32 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

/// Response metadata
#[derive(Debug, Clone, Default)]
pub struct ResponseMetadata {
    pub model: String,
    pub provider: String,
    pub elapsed_ms: u64,
}

/// Shared LLM provider type for concurrent section resolution.
pub type SharedProvider = Arc<dyn LlmProvider + Send + Sync>;

// =============================================================================
// LLM Provider Trait
// =============================================================================

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate section markup for one request
    async fn generate(&self, request: &GenerationRequest) -> Result<LlmResponse>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Model name currently in use
    fn model(&self) -> &str;
}

/// Create a shared provider from configuration.
///
/// Returns `None` for provider `"none"`.
pub fn create_provider(config: &LlmConfig) -> Result<Option<SharedProvider>> {
    match config.provider.as_str() {
        "none" | "" => Ok(None),
        "openai" => Ok(Some(Arc::new(OpenAiProvider::new(config)?))),
        "ollama" => Ok(Some(Arc::new(OllamaProvider::new(config)?))),
        other => Err(ReportError::Config(format!(
            "Unknown provider: {}. Supported: openai, ollama, none",
            other
        ))),
    }
}

// =============================================================================
// Test Support
// =============================================================================
