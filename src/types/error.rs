//! Unified Error Type System
//!
//! Centralized error types for the report pipeline.
//! Provides error classification for generative-service retry and fallback decisions.
//!
//! ## Error Families
//!
//! - **Configuration**: no usable template or sections (fatal, before collection)
//! - **Validation**: bad date range, unknown project (fatal)
//! - **Data collection**: any collaborator read failure (fatal, fail-fast)
//! - **Generation**: timeout, quota, content policy (recovered per section)
//! - **Composition overflow**: a block that cannot fit on an empty page (fatal)

use std::time::Duration;

use chrono::NaiveDate;
use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// Generative-service error categories for retry and fallback decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Rate limited or quota exhausted
    RateLimit,
    /// Prompt/context too large for the model
    TokenLimit,
    /// Authentication failed
    Auth,
    /// Network/connectivity issues
    Network,
    /// Provider unavailable
    Unavailable,
    /// Invalid request
    BadRequest,
    /// Rejected by the provider's content policy - never retried
    ContentPolicy,
    /// Temporary server issues
    Transient,
    /// Unknown error
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimit => write!(f, "RATE_LIMIT"),
            Self::TokenLimit => write!(f, "TOKEN_LIMIT"),
            Self::Auth => write!(f, "AUTH"),
            Self::Network => write!(f, "NETWORK"),
            Self::Unavailable => write!(f, "UNAVAILABLE"),
            Self::BadRequest => write!(f, "BAD_REQUEST"),
            Self::ContentPolicy => write!(f, "CONTENT_POLICY"),
            Self::Transient => write!(f, "TRANSIENT"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl ErrorCategory {
    /// Transient failures worth one more attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimit | Self::Network | Self::Transient)
    }
}

// =============================================================================
// LLM Error
// =============================================================================

/// Generative-service error with category and provider context
#[derive(Debug, Clone)]
pub struct LlmError {
    pub category: ErrorCategory,
    pub message: String,
    pub provider: Option<String>,
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(provider) = &self.provider {
            write!(f, "[{}:{}] {}", provider, self.category, self.message)
        } else {
            write!(f, "[{}] {}", self.category, self.message)
        }
    }
}

impl std::error::Error for LlmError {}

impl LlmError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            provider: None,
        }
    }

    pub fn with_provider(
        category: ErrorCategory,
        message: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            category,
            message: message.into(),
            provider: Some(provider.into()),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.category.is_retryable()
    }
}

// =============================================================================
// Error Classifier
// =============================================================================

/// Maps raw provider failures onto an [`ErrorCategory`]
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify an error message from any provider
    pub fn classify(message: &str, provider: &str) -> LlmError {
        let lower = message.to_lowercase();

        if lower.contains("content_policy")
            || lower.contains("content policy")
            || lower.contains("content_filter")
            || lower.contains("safety system")
        {
            return LlmError::with_provider(ErrorCategory::ContentPolicy, message, provider);
        }

        if lower.contains("rate limit")
            || lower.contains("429")
            || lower.contains("too many requests")
            || lower.contains("quota exceeded")
        {
            return LlmError::with_provider(ErrorCategory::RateLimit, message, provider);
        }

        if lower.contains("token")
            && (lower.contains("limit") || lower.contains("exceed") || lower.contains("maximum"))
            || lower.contains("context length")
        {
            return LlmError::with_provider(ErrorCategory::TokenLimit, message, provider);
        }

        if lower.contains("401")
            || lower.contains("403")
            || lower.contains("api key")
            || lower.contains("unauthorized")
        {
            return LlmError::with_provider(ErrorCategory::Auth, message, provider);
        }

        if lower.contains("network")
            || lower.contains("connection")
            || lower.contains("dns")
            || lower.contains("timed out")
            || lower.contains("timeout")
        {
            return LlmError::with_provider(ErrorCategory::Network, message, provider);
        }

        if lower.contains("503")
            || lower.contains("502")
            || lower.contains("service unavailable")
            || lower.contains("overloaded")
            || lower.contains("temporar")
        {
            return LlmError::with_provider(ErrorCategory::Transient, message, provider);
        }

        if lower.contains("404") || lower.contains("not found") {
            return LlmError::with_provider(ErrorCategory::Unavailable, message, provider);
        }

        if lower.contains("400") || lower.contains("bad request") || lower.contains("invalid") {
            return LlmError::with_provider(ErrorCategory::BadRequest, message, provider);
        }

        LlmError::with_provider(ErrorCategory::Unknown, message, provider)
    }

    /// Classify an HTTP status plus body; the body wins when it names a content-policy rejection
    pub fn classify_http_status(status: u16, message: &str, provider: &str) -> LlmError {
        let by_body = Self::classify(message, provider);
        if by_body.category == ErrorCategory::ContentPolicy {
            return by_body;
        }

        match status {
            429 => LlmError::with_provider(ErrorCategory::RateLimit, message, provider),
            401 | 403 => LlmError::with_provider(ErrorCategory::Auth, message, provider),
            400 | 422 => LlmError::with_provider(ErrorCategory::BadRequest, message, provider),
            404 => LlmError::with_provider(ErrorCategory::Unavailable, message, provider),
            500 | 502 | 503 | 504 => {
                LlmError::with_provider(ErrorCategory::Transient, message, provider)
            }
            _ => LlmError::with_provider(ErrorCategory::Unknown, message, provider),
        }
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum ReportError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("No report template configured for project '{project_id}': create a template first")]
    MissingTemplate { project_id: String },

    #[error("Report template '{template}' has no sections: add at least one section first")]
    MissingSections { template: String },

    #[error("Config error: {0}")]
    Config(String),

    #[error("Not initialized: run 'sitereport init' first")]
    NotInitialized,

    // -------------------------------------------------------------------------
    // Validation Errors
    // -------------------------------------------------------------------------
    #[error("Invalid period: start {start} is after end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("Project not found: {project_id}")]
    ProjectNotFound { project_id: String },

    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    // -------------------------------------------------------------------------
    // Pipeline Errors
    // -------------------------------------------------------------------------
    #[error("Data collection failed ({source_name}): {message}")]
    DataCollection {
        source_name: String,
        message: String,
    },

    #[error("LLM error: {0}")]
    Llm(LlmError),

    #[error("LLM API error: {0}")]
    LlmApi(String),

    #[error("Timeout after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    #[error(
        "Composition overflow in '{section_key}': block needs {required_height:.1}pt but a page offers {available_height:.1}pt"
    )]
    CompositionOverflow {
        section_key: String,
        required_height: f32,
        available_height: f32,
    },

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<LlmError> for ReportError {
    fn from(err: LlmError) -> Self {
        ReportError::Llm(err)
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;

impl ReportError {
    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a data collection error
    pub fn collection(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DataCollection {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Stable error code surfaced to callers
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "IO",
            Self::Database(_) => "DATABASE",
            Self::Json(_) => "JSON",
            Self::Yaml(_) => "YAML",
            Self::Pdf(_) => "PDF",
            Self::MissingTemplate { .. } => "MISSING_TEMPLATE",
            Self::MissingSections { .. } => "MISSING_SECTIONS",
            Self::Config(_) => "CONFIG",
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::InvalidRange { .. } => "INVALID_RANGE",
            Self::ProjectNotFound { .. } => "PROJECT_NOT_FOUND",
            Self::InvalidTemplate(_) => "INVALID_TEMPLATE",
            Self::DataCollection { .. } => "DATA_COLLECTION",
            Self::Llm(_) | Self::LlmApi(_) => "GENERATION",
            Self::Timeout { .. } => "TIMEOUT",
            Self::Cancelled(_) => "CANCELLED",
            Self::CompositionOverflow { .. } => "COMPOSITION_OVERFLOW",
            Self::Storage(_) => "STORAGE",
        }
    }

    /// Errors raised by the generative service or while waiting for it.
    ///
    /// These are recovered per section; everything else is fatal.
    pub fn is_generation_failure(&self) -> bool {
        matches!(
            self,
            Self::Llm(_) | Self::LlmApi(_) | Self::Timeout { .. } | Self::Cancelled(_)
        )
    }

    /// Check if a failed generation attempt deserves one retry
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Llm(e) => e.is_retryable(),
            Self::LlmApi(msg) => ErrorClassifier::classify(msg, "unknown").is_retryable(),
            _ => false,
        }
    }
}

/// Context extension trait for adding context to errors
pub trait ResultExt<T> {
    fn with_context<C: Into<String>>(self, context: C) -> Result<T>;

    fn with_context_fn<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T, E: std::error::Error + Send + Sync + 'static> ResultExt<T> for std::result::Result<T, E> {
    fn with_context<C: Into<String>>(self, context: C) -> Result<T> {
        self.map_err(|e| ReportError::Storage(format!("{}: {}", context.into(), e)))
    }

    fn with_context_fn<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.map_err(|e| ReportError::Storage(format!("{}: {}", f().into(), e)))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_display() {
        assert_eq!(ErrorCategory::RateLimit.to_string(), "RATE_LIMIT");
        assert_eq!(ErrorCategory::ContentPolicy.to_string(), "CONTENT_POLICY");
    }

    #[test]
    fn test_error_category_retryable() {
        assert!(ErrorCategory::RateLimit.is_retryable());
        assert!(ErrorCategory::Network.is_retryable());
        assert!(ErrorCategory::Transient.is_retryable());
        assert!(!ErrorCategory::ContentPolicy.is_retryable());
        assert!(!ErrorCategory::Auth.is_retryable());
        assert!(!ErrorCategory::BadRequest.is_retryable());
    }

    #[test]
    fn test_classify_content_policy() {
        let err = ErrorClassifier::classify(
            "Your request was rejected by our safety system (content_policy_violation)",
            "openai",
        );
        assert_eq!(err.category, ErrorCategory::ContentPolicy);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_content_policy_wins_over_status() {
        let err = ErrorClassifier::classify_http_status(
            400,
            r#"{"error":{"code":"content_policy_violation"}}"#,
            "openai",
        );
        assert_eq!(err.category, ErrorCategory::ContentPolicy);
    }

    #[test]
    fn test_classify_rate_limit() {
        let err = ErrorClassifier::classify("Rate limit exceeded, please retry", "openai");
        assert_eq!(err.category, ErrorCategory::RateLimit);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_classify_http_status() {
        let rate_limit = ErrorClassifier::classify_http_status(429, "slow down", "test");
        assert_eq!(rate_limit.category, ErrorCategory::RateLimit);

        let auth = ErrorClassifier::classify_http_status(401, "nope", "test");
        assert_eq!(auth.category, ErrorCategory::Auth);

        let server_error = ErrorClassifier::classify_http_status(503, "busy", "test");
        assert_eq!(server_error.category, ErrorCategory::Transient);
    }

    #[test]
    fn test_stable_codes() {
        let err = ReportError::MissingTemplate {
            project_id: "P1".into(),
        };
        assert_eq!(err.code(), "MISSING_TEMPLATE");
        assert!(err.to_string().contains("create a template first"));

        let err = ReportError::CompositionOverflow {
            section_key: "photos".into(),
            required_height: 900.0,
            available_height: 700.0,
        };
        assert_eq!(err.code(), "COMPOSITION_OVERFLOW");
        assert!(err.to_string().contains("photos"));
    }

    #[test]
    fn test_generation_failures_are_recoverable_family() {
        assert!(ReportError::timeout("section", Duration::from_secs(1)).is_generation_failure());
        assert!(ReportError::LlmApi("boom".into()).is_generation_failure());
        assert!(!ReportError::Config("bad".into()).is_generation_failure());
    }

    #[test]
    fn test_llm_error_display() {
        let err = LlmError::with_provider(ErrorCategory::RateLimit, "Too many requests", "openai");
        assert_eq!(err.to_string(), "[openai:RATE_LIMIT] Too many requests");
    }
}
