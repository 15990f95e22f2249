//! Ollama Local LLM Provider
//!
//! LLM provider for locally-running Ollama models.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::{GenerationRequest, LlmProvider, LlmResponse, ResponseMetadata, TokenUsage};
use crate::config::LlmConfig;
use crate::types::{ErrorClassifier, ReportError, Result};

const PROVIDER: &str = "ollama";
const DEFAULT_API_BASE: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "llama3:latest";

/// Ollama Local LLM Provider
pub struct OllamaProvider {
    api_base: String,
    model: String,
    temperature: f32,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_base = config
            .api_base
            .clone()
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let api_base = Self::validate_endpoint(&api_base)?;

        let model = if config.model.is_empty() {
            DEFAULT_MODEL.to_string()
        } else {
            config.model.clone()
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ReportError::LlmApi(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_base,
            model,
            temperature: config.temperature,
            client,
        })
    }

    /// Only http/https endpoints are accepted; non-local hosts are logged.
    fn validate_endpoint(endpoint: &str) -> Result<String> {
        let url = url::Url::parse(endpoint).map_err(|e| {
            ReportError::Config(format!("Invalid Ollama endpoint URL '{}': {}", endpoint, e))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ReportError::Config(format!(
                "Ollama endpoint must use http or https scheme, got: {}",
                url.scheme()
            )));
        }

        if let Some(host) = url.host_str()
            && !matches!(host, "localhost" | "127.0.0.1" | "::1" | "[::1]")
        {
            warn!(
                "Ollama endpoint is not localhost: {}. Ensure this is intentional.",
                host
            );
        }

        let mut result = url.to_string();
        if result.ends_with('/') {
            result.pop();
        }
        Ok(result)
    }

    fn build_request(&self, request: &GenerationRequest) -> OllamaRequest {
        OllamaRequest {
            model: self.model.clone(),
            system: request.persona.clone(),
            prompt: request.user_message(),
            stream: false,
            options: OllamaOptions {
                temperature: self.temperature,
                num_predict: request.max_tokens,
            },
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<LlmResponse> {
        info!(
            "Generating with Ollama (model: {}, max_tokens: {})",
            self.model, request.max_tokens
        );

        let start_time = Instant::now();
        let body = self.build_request(request);
        let url = format!("{}/api/generate", self.api_base);

        debug!("Sending request to Ollama API");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                ReportError::Llm(ErrorClassifier::classify(
                    &format!("Ollama request failed: {}", e),
                    PROVIDER,
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ReportError::Llm(ErrorClassifier::classify_http_status(
                status.as_u16(),
                &format!("Ollama API error ({}): {}", status, text),
                PROVIDER,
            )));
        }

        let parsed: OllamaResponse = response
            .json()
            .await
            .map_err(|e| ReportError::LlmApi(format!("Failed to parse Ollama response: {}", e)))?;

        let usage = TokenUsage {
            input_tokens: parsed.prompt_eval_count.unwrap_or(0),
            output_tokens: parsed.eval_count.unwrap_or(0),
        };

        Ok(LlmResponse::new(
            parsed.response,
            usage,
            ResponseMetadata {
                model: self.model.clone(),
                provider: PROVIDER.to_string(),
                elapsed_ms: start_time.elapsed().as_millis() as u64,
            },
        ))
    }

    fn name(&self) -> &str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    system: String,
    prompt: String,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_endpoint_strips_trailing_slash() {
        let endpoint = OllamaProvider::validate_endpoint("http://localhost:11434/").unwrap();
        assert_eq!(endpoint, "http://localhost:11434");
    }

    #[test]
    fn test_validate_endpoint_rejects_scheme() {
        assert!(OllamaProvider::validate_endpoint("file:///etc/passwd").is_err());
        assert!(OllamaProvider::validate_endpoint("not a url").is_err());
    }

    #[test]
    fn test_request_uses_token_budget() {
        let provider = OllamaProvider::new(&LlmConfig {
            provider: "ollama".into(),
            ..LlmConfig::default()
        })
        .unwrap();
        let body = provider.build_request(&GenerationRequest {
            persona: "persona".into(),
            title: "T".into(),
            prompt: "P".into(),
            context: String::new(),
            max_tokens: 64,
        });
        assert_eq!(body.options.num_predict, 64);
        assert_eq!(body.system, "persona");
        assert!(!body.stream);
    }

    #[test]
    fn test_parse_response_counts() {
        let parsed: OllamaResponse =
            serde_json::from_str(r#"{"response":"<p>ok</p>","prompt_eval_count":12,"eval_count":5}"#)
                .unwrap();
        assert_eq!(parsed.response, "<p>ok</p>");
        assert_eq!(parsed.eval_count, Some(5));
    }
}
