//! Section Content Generator
//!
//! Produces markup for generation-assisted sections through the configured
//! [`LlmProvider`], degrading to the section's literal content on any
//! generative failure.
//!
//! ## Recovery policy
//!
//! Every call ends in exactly one [`GenerationOutcome`]:
//! - `Generated`: the service answered with usable text
//! - `Fallback`: timeout, quota, content rejection, cancellation, empty answer,
//!   or no provider at all; the section renders its resolved `base_content`
//! - `Fatal`: anything that is not a generation failure (e.g. misconfiguration)
//!
//! Transient failures are retried once; content-policy rejections never are.
//! The per-section timeout bounds the first attempt and the retry together.

use std::sync::Arc;

use backon::{ExponentialBuilder, Retryable};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use super::collector::PeriodDataSet;
use super::context::render_context;
use super::resolver::PlaceholderResolver;
use crate::ai::provider::{GenerationRequest, LlmProvider, SharedProvider};
use crate::ai::timeout::with_timeout;
use crate::ai::usage::UsageTracker;
use crate::config::GenerationSettings;
use crate::constants::generation::{FALLBACK_NOTICE, MAX_RETRIES};
use crate::types::{
    ErrorCategory, ReportError, ResolutionKind, ResolvedSection, Result, SectionTemplate,
    SectionTrace, SectionUsage,
};

// =============================================================================
// Outcomes
// =============================================================================

/// Why a generation-assisted section used its literal content
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackReason {
    /// Generation disabled or no provider configured
    Unavailable,
    Cancelled,
    TimedOut,
    /// The service refused or failed with a classified error
    Rejected(ErrorCategory),
    /// Unclassified service failure
    Failed(String),
    /// The service answered with blank text
    EmptyResponse { tokens: u32 },
}

impl FallbackReason {
    fn from_error(error: &ReportError) -> Self {
        match error {
            ReportError::Timeout { .. } => Self::TimedOut,
            ReportError::Cancelled(_) => Self::Cancelled,
            ReportError::Llm(e) => Self::Rejected(e.category),
            other => Self::Failed(other.to_string()),
        }
    }

    /// Tokens spent before falling back
    fn tokens(&self) -> u32 {
        match self {
            Self::EmptyResponse { tokens } => *tokens,
            _ => 0,
        }
    }
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable => write!(f, "generation unavailable"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::TimedOut => write!(f, "timed out"),
            Self::Rejected(category) => write!(f, "rejected ({})", category),
            Self::Failed(message) => write!(f, "failed: {}", message),
            Self::EmptyResponse { .. } => write!(f, "empty response"),
        }
    }
}

/// Result of one generation attempt, before it becomes a section
#[derive(Debug)]
pub enum GenerationOutcome {
    Generated { content: String, tokens: u32 },
    Fallback(FallbackReason),
    Fatal(ReportError),
}

/// A resolved section plus the reason it fell back, if it did
#[derive(Debug, Clone, PartialEq)]
pub struct SectionResolution {
    pub section: ResolvedSection,
    pub fallback_reason: Option<FallbackReason>,
}

impl SectionResolution {
    pub fn substituted(section: ResolvedSection) -> Self {
        Self {
            section,
            fallback_reason: None,
        }
    }

    pub fn trace(&self) -> SectionTrace {
        SectionTrace {
            section_key: self.section.section_key.clone(),
            resolution_kind: self.section.resolution_kind,
            tokens: self.section.usage.map(|u| u.tokens),
            fallback_reason: self.fallback_reason.as_ref().map(|r| r.to_string()),
        }
    }
}

// =============================================================================
// Generator
// =============================================================================

pub struct SectionGenerator {
    provider: Option<SharedProvider>,
    settings: GenerationSettings,
    resolver: PlaceholderResolver,
}

impl SectionGenerator {
    pub fn new(
        provider: Option<SharedProvider>,
        settings: GenerationSettings,
        resolver: PlaceholderResolver,
    ) -> Self {
        Self {
            provider,
            settings,
            resolver,
        }
    }

    /// Provider label for logs, `"none"` when generation is unavailable
    pub fn provider_name(&self) -> &str {
        self.provider.as_ref().map(|p| p.name()).unwrap_or("none")
    }

    /// The exact request sent for `section`
    pub fn build_request(&self, section: &SectionTemplate, data: &PeriodDataSet) -> GenerationRequest {
        let prompt = section
            .generation_prompt
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(String::from)
            .unwrap_or_else(|| format!("Write the \"{}\" section of the report.", section.title));

        GenerationRequest {
            persona: self.settings.persona.clone(),
            title: section.title.clone(),
            prompt,
            context: render_context(&section.data_sources, data, self.settings.max_context_chars),
            max_tokens: self.settings.max_tokens,
        }
    }

    /// Resolve one generation-assisted section.
    ///
    /// Only non-generation errors are returned as `Err`; every generation
    /// failure becomes a `generated_fallback` section.
    #[instrument(skip_all, fields(section = %section.section_key, provider = self.provider_name()))]
    pub async fn generate(
        &self,
        section: &SectionTemplate,
        data: &PeriodDataSet,
        usage: &UsageTracker,
        cancel: &CancellationToken,
    ) -> Result<SectionResolution> {
        match self.attempt(section, data, cancel).await {
            GenerationOutcome::Generated { content, tokens } => {
                usage.record_generated(tokens);
                debug!(tokens, "Section generated");
                Ok(SectionResolution {
                    section: ResolvedSection {
                        section_key: section.section_key.clone(),
                        title: section.title.clone(),
                        content,
                        resolution_kind: ResolutionKind::Generated,
                        usage: Some(SectionUsage { tokens }),
                    },
                    fallback_reason: None,
                })
            }
            GenerationOutcome::Fallback(reason) => {
                usage.record_fallback(reason.tokens());
                if reason != FallbackReason::Unavailable {
                    warn!("Section '{}' falls back to literal content: {}", section.section_key, reason);
                }
                Ok(SectionResolution {
                    section: self.fallback(section, data),
                    fallback_reason: Some(reason),
                })
            }
            GenerationOutcome::Fatal(error) => Err(error),
        }
    }

    /// Run the service call under retry, timeout, and cancellation
    pub async fn attempt(
        &self,
        section: &SectionTemplate,
        data: &PeriodDataSet,
        cancel: &CancellationToken,
    ) -> GenerationOutcome {
        let Some(provider) = self.provider.as_ref().filter(|_| self.settings.enabled) else {
            return GenerationOutcome::Fallback(FallbackReason::Unavailable);
        };
        if cancel.is_cancelled() {
            return GenerationOutcome::Fallback(FallbackReason::Cancelled);
        }

        let request = self.build_request(section, data);
        let provider: &dyn LlmProvider = provider.as_ref();
        let request_ref = &request;

        let backoff = ExponentialBuilder::default()
            .with_min_delay(self.settings.retry_delay())
            .with_max_times(MAX_RETRIES);
        let call = (|| async move { provider.generate(request_ref).await })
            .retry(backoff)
            .when(|e: &ReportError| e.is_retryable())
            .notify(|e: &ReportError, delay| {
                warn!("Retrying generation in {:?} after: {}", delay, e);
            });

        let timed = with_timeout(self.settings.section_timeout(), call, "section generation");

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ReportError::Cancelled(section.section_key.clone())),
            result = timed => result,
        };

        match result {
            Ok(response) if response.text.trim().is_empty() => {
                GenerationOutcome::Fallback(FallbackReason::EmptyResponse {
                    tokens: response.tokens_used(),
                })
            }
            Ok(response) => {
                let tokens = response.tokens_used();
                GenerationOutcome::Generated {
                    content: response.text.trim().to_string(),
                    tokens,
                }
            }
            Err(e) if e.is_generation_failure() => {
                GenerationOutcome::Fallback(FallbackReason::from_error(&e))
            }
            Err(e) => GenerationOutcome::Fatal(e),
        }
    }

    /// Literal content through the resolver; never blank
    fn fallback(&self, section: &SectionTemplate, data: &PeriodDataSet) -> ResolvedSection {
        let mut resolved = self.resolver.resolve(section, data);
        if resolved.content.trim().is_empty() {
            resolved.content = FALLBACK_NOTICE.to_string();
        }
        resolved.resolution_kind = ResolutionKind::GeneratedFallback;
        resolved
    }
}

/// Shared generator for concurrent section resolution
pub type SharedGenerator = Arc<SectionGenerator>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::testing::{ScriptedProvider, Step};
    use crate::ai::provider::LlmResponse;
    use crate::types::{
        ActivityEntry, DataSourceName, PhotoSet, ProjectSnapshot, ReportPeriod,
    };
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::time::Duration;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn data_set() -> PeriodDataSet {
        let project = ProjectSnapshot {
            id: "P1".into(),
            name: "Riverside Bridge".into(),
            code: "RB-01".into(),
            address: String::new(),
            client_name: String::new(),
            budget: 0.0,
        };
        let logs = (1..=3)
            .map(|d| ActivityEntry {
                date: date(d),
                weather: "Sunny".into(),
                personnel_count: 5,
                activities_text: "Excavation".into(),
                observations: None,
            })
            .collect();
        PeriodDataSet::assemble(
            project,
            ReportPeriod::new(date(1), date(15)).unwrap(),
            logs,
            vec![],
            PhotoSet::default(),
        )
    }

    fn section(sources: Vec<DataSourceName>) -> SectionTemplate {
        SectionTemplate::new("progress", "Progress")
            .with_content("Entries: {{daily_logs.count}}")
            .with_generation("Summarize progress", sources)
    }

    fn generator(provider: Option<Arc<ScriptedProvider>>) -> SectionGenerator {
        SectionGenerator::new(
            provider.map(|p| p as SharedProvider),
            GenerationSettings::default(),
            PlaceholderResolver::default(),
        )
    }

    async fn run(
        provider: &Arc<ScriptedProvider>,
        section: &SectionTemplate,
    ) -> (SectionResolution, UsageTracker) {
        let usage = UsageTracker::new();
        let resolution = generator(Some(provider.clone()))
            .generate(section, &data_set(), &usage, &CancellationToken::new())
            .await
            .unwrap();
        (resolution, usage)
    }

    #[tokio::test]
    async fn test_generated_section_records_usage() {
        let provider = Arc::new(ScriptedProvider::replying("<p>Work progressed.</p>", 42));
        let (resolution, usage) = run(&provider, &section(vec![DataSourceName::DailyLogs])).await;

        assert_eq!(resolution.section.resolution_kind, ResolutionKind::Generated);
        assert_eq!(resolution.section.content, "<p>Work progressed.</p>");
        assert_eq!(resolution.section.usage, Some(SectionUsage { tokens: 42 }));
        assert_eq!(usage.summary().sections_generated, 1);
        assert_eq!(usage.summary().total_tokens, 42);
        assert!(provider.requests()[0].context.contains("== Daily Activity (3 entries) =="));
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_literal_content() {
        let provider = Arc::new(ScriptedProvider::scripted(
            vec![],
            Step::Fail(ErrorCategory::Auth),
        ));
        let (resolution, usage) = run(&provider, &section(vec![])).await;

        assert_eq!(
            resolution.section.resolution_kind,
            ResolutionKind::GeneratedFallback
        );
        assert_eq!(resolution.section.content, "Entries: 3");
        assert_eq!(
            resolution.fallback_reason,
            Some(FallbackReason::Rejected(ErrorCategory::Auth))
        );
        assert_eq!(provider.calls(), 1);
        assert_eq!(usage.summary().sections_fallback, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_is_retried_once() {
        let provider = Arc::new(ScriptedProvider::scripted(
            vec![Step::Fail(ErrorCategory::Network)],
            Step::Reply {
                text: "<p>ok</p>".into(),
                tokens: 7,
            },
        ));
        let (resolution, _) = run(&provider, &section(vec![])).await;

        assert_eq!(resolution.section.resolution_kind, ResolutionKind::Generated);
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_transient_failure_stops_after_one_retry() {
        let provider = Arc::new(ScriptedProvider::scripted(
            vec![],
            Step::Fail(ErrorCategory::RateLimit),
        ));
        let (resolution, _) = run(&provider, &section(vec![])).await;

        assert_eq!(
            resolution.section.resolution_kind,
            ResolutionKind::GeneratedFallback
        );
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_content_policy_is_never_retried() {
        let provider = Arc::new(ScriptedProvider::scripted(
            vec![Step::Fail(ErrorCategory::ContentPolicy)],
            Step::Reply {
                text: "<p>ok</p>".into(),
                tokens: 7,
            },
        ));
        let (resolution, _) = run(&provider, &section(vec![])).await;

        assert_eq!(provider.calls(), 1);
        assert_eq!(
            resolution.fallback_reason,
            Some(FallbackReason::Rejected(ErrorCategory::ContentPolicy))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_falls_back() {
        let provider = Arc::new(ScriptedProvider::scripted(vec![], Step::Hang));
        let (resolution, _) = run(&provider, &section(vec![])).await;

        assert_eq!(resolution.fallback_reason, Some(FallbackReason::TimedOut));
        assert_eq!(resolution.section.content, "Entries: 3");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_aborts_in_flight_call() {
        let provider = Arc::new(ScriptedProvider::scripted(vec![], Step::Hang));
        let generator = generator(Some(provider.clone()));
        let cancel = CancellationToken::new();
        let usage = UsageTracker::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let resolution = generator
            .generate(&section(vec![]), &data_set(), &usage, &cancel)
            .await
            .unwrap();
        assert_eq!(resolution.fallback_reason, Some(FallbackReason::Cancelled));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_context_omits_data_block() {
        let provider = Arc::new(ScriptedProvider::replying("<p>No samples.</p>", 3));
        run(&provider, &section(vec![DataSourceName::QualitySamples])).await;

        let request = &provider.requests()[0];
        assert_eq!(request.context, "");
        let message = request.user_message();
        assert!(!message.contains("<PERIOD_DATA>"));
        assert!(!message.contains("Quality Samples"));
    }

    #[tokio::test]
    async fn test_blank_fallback_uses_notice() {
        let provider = Arc::new(ScriptedProvider::replying("   ", 4));
        let blank = SectionTemplate::new("notes", "Notes").with_generation("Write notes", vec![]);
        let (resolution, usage) = run(&provider, &blank).await;

        assert_eq!(resolution.section.content, FALLBACK_NOTICE);
        assert_eq!(
            resolution.fallback_reason,
            Some(FallbackReason::EmptyResponse { tokens: 4 })
        );
        assert_eq!(usage.summary().total_tokens, 4);
    }

    #[tokio::test]
    async fn test_without_provider_falls_back_quietly() {
        let usage = UsageTracker::new();
        let resolution = generator(None)
            .generate(&section(vec![]), &data_set(), &usage, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(resolution.fallback_reason, Some(FallbackReason::Unavailable));
        assert_eq!(resolution.trace().fallback_reason.as_deref(), Some("generation unavailable"));
    }

    struct MisconfiguredProvider;

    #[async_trait]
    impl LlmProvider for MisconfiguredProvider {
        async fn generate(&self, _: &GenerationRequest) -> Result<LlmResponse> {
            Err(ReportError::Config("missing api key".into()))
        }
        fn name(&self) -> &str {
            "misconfigured"
        }
        fn model(&self) -> &str {
            "none"
        }
    }

    #[tokio::test]
    async fn test_non_generation_error_is_fatal() {
        let generator = SectionGenerator::new(
            Some(Arc::new(MisconfiguredProvider)),
            GenerationSettings::default(),
            PlaceholderResolver::default(),
        );
        let err = generator
            .generate(
                &section(vec![]),
                &data_set(),
                &UsageTracker::new(),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "CONFIG");
    }
}
