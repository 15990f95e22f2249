//! AI Integration Layer
//!
//! Generative text service integration for generation-assisted report sections.

pub mod prompt;
pub mod provider;
pub mod timeout;
pub mod usage;

pub use prompt::{PromptBuilder, PromptSection, PromptTemplates};
pub use provider::{
    GenerationRequest, LlmProvider, LlmResponse, OllamaProvider, OpenAiProvider,
    ResponseMetadata, SharedProvider, TokenUsage, create_provider,
};
pub use timeout::{TimeoutConfig, with_timeout};
pub use usage::{GenerationUsage, UsageTracker};
