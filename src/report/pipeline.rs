//! Report Pipeline
//!
//! Orchestrates one report request end to end:
//!
//! ```text
//! template ──▶ collect ──▶ resolve sections (bounded, unordered) ──▶ re-sort ──▶ compose
//! ```
//!
//! Configuration errors abort before any data is read. Section resolution runs
//! with bounded concurrency; completion order never reaches the composer because
//! results are re-sorted into template display order first.

use std::sync::Arc;

use chrono::NaiveDate;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use super::collector::{PeriodDataCollector, PeriodDataSet};
use super::composer::{ComposeInput, ComposedDocument, Composer, DocumentHeader, SummaryTable};
use super::context::format_date;
use super::generator::{SectionGenerator, SectionResolution, SharedGenerator};
use super::resolver::PlaceholderResolver;
use super::source::{SharedRecordSource, SharedTemplateSource};
use crate::ai::provider::SharedProvider;
use crate::ai::timeout::TimeoutConfig;
use crate::ai::usage::{GenerationUsage, UsageTracker};
use crate::config::Config;
use crate::types::{
    ReportError, ReportPeriod, ReportTemplate, ResolvedSection, Result, SectionTemplate,
    SectionTrace, SignatureEntry,
};

/// One report request as the caller supplies it
#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub project_id: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    /// Explicit template; the project or global default otherwise
    pub template_id: Option<String>,
    pub signatures: Vec<SignatureEntry>,
    pub cancel: CancellationToken,
}

impl ReportRequest {
    pub fn new(project_id: impl Into<String>, period_start: NaiveDate, period_end: NaiveDate) -> Self {
        Self {
            project_id: project_id.into(),
            period_start,
            period_end,
            template_id: None,
            signatures: Vec::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_template(mut self, template_id: impl Into<String>) -> Self {
        self.template_id = Some(template_id.into());
        self
    }

    pub fn with_signatures(mut self, signatures: Vec<SignatureEntry>) -> Self {
        self.signatures = signatures;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// A complete document plus the diagnostics returned alongside it
#[derive(Debug, Clone)]
pub struct ReportOutcome {
    pub document: ComposedDocument,
    pub usage: GenerationUsage,
    /// Resolution kind per section, in display order
    pub trace: Vec<SectionTrace>,
    pub template_id: String,
    pub period: ReportPeriod,
}

pub struct ReportPipeline {
    templates: SharedTemplateSource,
    collector: PeriodDataCollector,
    resolver: PlaceholderResolver,
    generator: SharedGenerator,
    composer: Composer,
    max_concurrent_sections: usize,
}

impl ReportPipeline {
    pub fn new(
        records: SharedRecordSource,
        templates: SharedTemplateSource,
        provider: Option<SharedProvider>,
        config: &Config,
    ) -> Result<Self> {
        config.validate()?;

        let timeouts = TimeoutConfig::from_config(config);
        let resolver = PlaceholderResolver::new(config.resolver.missing_token);
        let generator = Arc::new(SectionGenerator::new(
            provider,
            config.generation.clone(),
            resolver,
        ));

        Ok(Self {
            templates,
            collector: PeriodDataCollector::new(records, timeouts.collection),
            resolver,
            generator,
            composer: Composer::new(config.layout.clone())?,
            max_concurrent_sections: config.generation.max_concurrent_sections.max(1),
        })
    }

    /// Run one report request.
    ///
    /// Returns either a complete document or a single error; generation
    /// failures never surface here, they become `generated_fallback` sections.
    #[instrument(skip_all, fields(project = %request.project_id, start = %request.period_start, end = %request.period_end))]
    pub async fn run(&self, request: &ReportRequest) -> Result<ReportOutcome> {
        let template = self.load_template(request).await?;
        info!(
            "Using template '{}' ({} sections)",
            template.name,
            template.sections.len()
        );

        let data = self
            .collector
            .collect(&request.project_id, request.period_start, request.period_end)
            .await?;

        let usage = UsageTracker::new();
        let resolutions = self
            .resolve_sections(template.ordered_sections(), &data, &usage, &request.cancel)
            .await?;

        let trace: Vec<SectionTrace> = resolutions.iter().map(SectionResolution::trace).collect();
        let sections: Vec<ResolvedSection> = resolutions.into_iter().map(|r| r.section).collect();

        let header = self.header(&data);
        let summary = SummaryTable::from_summary(data.summary());
        let document = self.composer.compose(&ComposeInput {
            header: &header,
            sections: &sections,
            summary: Some(&summary),
            signatures: &request.signatures,
        })?;

        let usage = usage.summary();
        info!(
            "Report ready: {} pages, {} generated, {} fallback, {} tokens",
            document.page_count(),
            usage.sections_generated,
            usage.sections_fallback,
            usage.total_tokens
        );

        Ok(ReportOutcome {
            document,
            usage,
            trace,
            template_id: template.id,
            period: data.period(),
        })
    }

    async fn load_template(&self, request: &ReportRequest) -> Result<ReportTemplate> {
        let template = self
            .templates
            .load_template(&request.project_id, request.template_id.as_deref())
            .await?
            .ok_or_else(|| ReportError::MissingTemplate {
                project_id: request.project_id.clone(),
            })?;

        if template.sections.is_empty() {
            return Err(ReportError::MissingSections {
                template: template.name,
            });
        }
        template.validate()?;
        Ok(template)
    }

    /// Resolve every section, at most `max_concurrent_sections` at a time.
    ///
    /// The first fatal error wins; results come back in the order given.
    async fn resolve_sections(
        &self,
        sections: Vec<SectionTemplate>,
        data: &PeriodDataSet,
        usage: &UsageTracker,
        cancel: &CancellationToken,
    ) -> Result<Vec<SectionResolution>> {
        let total = sections.len();
        let mut stream = futures::stream::iter(sections.into_iter().enumerate())
            .map(|(index, section)| {
                let generator = Arc::clone(&self.generator);
                let resolver = self.resolver;
                async move {
                    let resolution = if section.use_generation {
                        generator.generate(&section, data, usage, cancel).await?
                    } else {
                        SectionResolution::substituted(resolver.resolve(&section, data))
                    };
                    Ok::<_, ReportError>((index, resolution))
                }
            })
            .buffer_unordered(self.max_concurrent_sections);

        let mut resolved = Vec::with_capacity(total);
        while let Some(result) = stream.next().await {
            let (index, resolution) = result?;
            debug!(
                section = %resolution.section.section_key,
                kind = %resolution.section.resolution_kind,
                "Section resolved"
            );
            resolved.push((index, resolution));
        }

        resolved.sort_by_key(|(index, _)| *index);
        Ok(resolved.into_iter().map(|(_, r)| r).collect())
    }

    fn header(&self, data: &PeriodDataSet) -> DocumentHeader {
        let project = data.project();
        let period = data.period();

        let mut header = DocumentHeader::new(self.composer.config().title.as_str())
            .line(format!("Project: {} ({})", project.name, project.code));
        if !project.client_name.is_empty() {
            header = header.line(format!("Client: {}", project.client_name));
        }
        header.line(format!(
            "Period: {} - {}",
            format_date(period.start()),
            format_date(period.end())
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::testing::{ScriptedProvider, Step};
    use crate::ai::provider::{GenerationRequest, LlmProvider, LlmResponse, ResponseMetadata, TokenUsage};
    use crate::report::source::{InMemorySource, ProjectRecords};
    use crate::types::{
        ActivityEntry, DataSourceName, ErrorCategory, ProjectSnapshot, ResolutionKind,
    };
    use async_trait::async_trait;
    use std::time::Duration;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn records() -> ProjectRecords {
        let mut records = ProjectRecords::new(ProjectSnapshot {
            id: "P1".into(),
            name: "Riverside Bridge".into(),
            code: "RB-01".into(),
            address: "Av. Costanera 100".into(),
            client_name: "Ministry of Works".into(),
            budget: 1_250_000.0,
        });
        records.daily_logs = (1..=10)
            .map(|d| ActivityEntry {
                date: date(d),
                weather: "Sunny".into(),
                personnel_count: 6,
                activities_text: "Deck formwork".into(),
                observations: None,
            })
            .collect();
        records
    }

    fn template(sections: Vec<SectionTemplate>) -> ReportTemplate {
        let mut template = ReportTemplate {
            id: "monthly".into(),
            name: "Monthly".into(),
            project_id: None,
            is_default: true,
            sections,
        };
        template.assign_creation_order();
        template
    }

    fn pipeline(source: InMemorySource, provider: Option<SharedProvider>) -> ReportPipeline {
        let source = Arc::new(source);
        ReportPipeline::new(source.clone(), source, provider, &Config::default()).unwrap()
    }

    fn request() -> ReportRequest {
        ReportRequest::new("P1", date(1), date(15))
    }

    #[tokio::test]
    async fn test_missing_template_aborts_before_collection() {
        // no project either: the template check must come first
        let pipeline = pipeline(InMemorySource::new(), None);
        let err = pipeline.run(&request()).await.unwrap_err();
        assert_eq!(err.code(), "MISSING_TEMPLATE");
        assert!(err.to_string().contains("create a template first"));
    }

    #[tokio::test]
    async fn test_template_without_sections() {
        let source = InMemorySource::new()
            .with_project(records())
            .with_template(template(vec![]));
        let err = pipeline(source, None).run(&request()).await.unwrap_err();
        assert_eq!(err.code(), "MISSING_SECTIONS");
    }

    #[tokio::test]
    async fn test_unknown_project() {
        let source = InMemorySource::new().with_template(template(vec![SectionTemplate::new(
            "intro", "Intro",
        )]));
        let err = pipeline(source, None).run(&request()).await.unwrap_err();
        assert_eq!(err.code(), "PROJECT_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_end_to_end_mixed_sections() {
        let source = InMemorySource::new().with_project(records()).with_template(template(vec![
            SectionTemplate::new("weather_summary", "Weather")
                .with_order(1)
                .with_content("Entries registered: {{daily_logs.count}}"),
            SectionTemplate::new("progress", "Progress")
                .with_order(2)
                .with_content("Fallback text")
                .with_generation("Summarize progress", vec![DataSourceName::DailyLogs]),
            SectionTemplate::new("quality", "Quality")
                .with_order(3)
                .with_content("No samples: {{quality_samples.count}}")
                .with_generation("Summarize quality", vec![DataSourceName::QualitySamples]),
        ]));
        // first generated section answers, second is rejected
        let provider = Arc::new(ScriptedProvider::scripted(
            vec![Step::Reply {
                text: "<p>Deck works advanced.</p>".into(),
                tokens: 42,
            }],
            Step::Fail(ErrorCategory::ContentPolicy),
        ));
        let pipeline = ReportPipeline::new(
            Arc::new(source.clone()),
            Arc::new(source),
            Some(provider.clone() as SharedProvider),
            &Config {
                generation: crate::config::GenerationSettings {
                    max_concurrent_sections: 1,
                    ..Default::default()
                },
                ..Config::default()
            },
        )
        .unwrap();

        let outcome = pipeline
            .run(&request().with_signatures(vec![SignatureEntry::new("Ana Ruiz", "Inspector")]))
            .await
            .unwrap();

        let kinds: Vec<_> = outcome
            .trace
            .iter()
            .map(|t| (t.section_key.as_str(), t.resolution_kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("weather_summary", ResolutionKind::Substituted),
                ("progress", ResolutionKind::Generated),
                ("quality", ResolutionKind::GeneratedFallback),
            ]
        );
        assert_eq!(outcome.trace[2].fallback_reason.as_deref(), Some("rejected (CONTENT_POLICY)"));
        assert_eq!(outcome.usage.sections_generated, 1);
        assert_eq!(outcome.usage.sections_fallback, 1);
        assert_eq!(outcome.usage.total_tokens, 42);
        assert_eq!(outcome.template_id, "monthly");
        assert!(outcome.document.bytes().starts_with(b"%PDF-"));
        assert!(outcome.document.page_count() >= 1);

        let texts: Vec<String> = outcome.document.pages()[0]
            .blocks
            .iter()
            .filter_map(|b| b.text())
            .collect();
        assert!(texts.iter().any(|t| t == "Entries registered: 10"));
        assert!(texts.iter().any(|t| t == "Project: Riverside Bridge (RB-01)"));
        assert!(texts.iter().any(|t| t == "Period: 01/01/2025 - 15/01/2025"));
    }

    /// Answers sooner for later sections so completion order is reversed
    struct ReversingProvider;

    #[async_trait]
    impl LlmProvider for ReversingProvider {
        async fn generate(&self, request: &GenerationRequest) -> Result<LlmResponse> {
            let rank: u64 = request.title.trim_start_matches('S').parse().unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(1000 - rank * 100)).await;
            Ok(LlmResponse::new(
                format!("<p>Body of {}</p>", request.title),
                TokenUsage::default(),
                ResponseMetadata::default(),
            ))
        }

        fn name(&self) -> &str {
            "reversing"
        }

        fn model(&self) -> &str {
            "test"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_never_reorders_sections() {
        let sections = (0..6)
            .map(|i| {
                SectionTemplate::new(format!("s{}", i), format!("S{}", i))
                    .with_order(i)
                    .with_generation("Write it", vec![])
            })
            .collect();
        let source = InMemorySource::new()
            .with_project(records())
            .with_template(template(sections));
        let pipeline = pipeline(source, Some(Arc::new(ReversingProvider)));

        let outcome = pipeline.run(&request()).await.unwrap();
        let keys: Vec<_> = outcome.trace.iter().map(|t| t.section_key.clone()).collect();
        assert_eq!(keys, ["s0", "s1", "s2", "s3", "s4", "s5"]);
        assert!(outcome
            .trace
            .iter()
            .all(|t| t.resolution_kind == ResolutionKind::Generated));

        let titles: Vec<String> = outcome
            .document
            .pages()
            .iter()
            .flat_map(|p| p.blocks.iter().filter_map(|b| b.text()))
            .filter(|t| t.starts_with('S') && t.len() == 2)
            .collect();
        assert_eq!(titles, ["S0", "S1", "S2", "S3", "S4", "S5"]);
    }

    #[tokio::test]
    async fn test_cancelled_request_still_returns_complete_document() {
        let source = InMemorySource::new().with_project(records()).with_template(template(vec![
            SectionTemplate::new("progress", "Progress")
                .with_content("Entries: {{daily_logs.count}}")
                .with_generation("Summarize", vec![DataSourceName::DailyLogs]),
        ]));
        let provider = Arc::new(ScriptedProvider::replying("<p>never used</p>", 10));
        let pipeline = pipeline(source, Some(provider.clone() as SharedProvider));

        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = pipeline
            .run(&request().with_cancellation(cancel))
            .await
            .unwrap();

        assert_eq!(provider.calls(), 0);
        assert_eq!(outcome.trace[0].resolution_kind, ResolutionKind::GeneratedFallback);
        assert_eq!(outcome.usage.sections_fallback, 1);
        assert!(outcome.document.byte_size() > 0);
    }

    #[tokio::test]
    async fn test_oversized_content_surfaces_overflow() {
        let source = InMemorySource::new().with_project(records()).with_template(template(vec![
            SectionTemplate::new("plans", "Plans").with_content("<img alt=\"plan\" height=\"5000\">"),
        ]));
        let err = pipeline(source, None).run(&request()).await.unwrap_err();
        assert_eq!(err.code(), "COMPOSITION_OVERFLOW");
    }
}
