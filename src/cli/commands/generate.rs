//! Generate Command
//!
//! Run the report pipeline for one project and period, store the PDF and
//! record it in the report history.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Deserialize;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::ai::provider::create_provider;
use crate::cli::CommandContext;
use crate::cli::ui::Output;
use crate::cli::util::report_file_name;
use crate::report::{ReportPipeline, ReportRequest, SharedRecordSource, SharedTemplateSource};
use crate::storage::{DocumentSink, FileSink, ReportRecord};
use crate::types::{ReportError, Result, SignatureEntry};

/// Options for `sitereport generate`
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub project_id: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub template_id: Option<String>,
    /// YAML file with the signature grid
    pub signatures: Option<PathBuf>,
    /// Output file; `<output_dir>/<project>_<from>_<to>.pdf` otherwise
    pub output: Option<PathBuf>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub no_generation: bool,
}

#[derive(Debug, Deserialize)]
struct SignatureFile {
    signatures: Vec<SignatureEntry>,
}

pub fn run(options: GenerateOptions) -> Result<()> {
    let ctx = CommandContext::load()?;

    let mut config = ctx.config.clone();
    if let Some(provider) = &options.provider {
        config.llm.provider = provider.clone();
    }
    if let Some(model) = &options.model {
        config.llm.model = model.clone();
    }
    if options.no_generation {
        config.generation.enabled = false;
    }

    let provider = if config.generation.enabled {
        create_provider(&config.llm)?
    } else {
        None
    };
    match &provider {
        Some(p) => info!("Using LLM provider: {} ({})", p.name(), p.model()),
        None => info!("Generation disabled: generation-assisted sections use literal content"),
    }

    let signatures = match &options.signatures {
        Some(path) => load_signatures(path)?,
        None => Vec::new(),
    };

    let records: SharedRecordSource = Arc::new(ctx.records());
    let templates: SharedTemplateSource = Arc::new(ctx.templates());
    let pipeline = ReportPipeline::new(records, templates, provider, &config)?;

    let mut request = ReportRequest::new(&options.project_id, options.from, options.to)
        .with_signatures(signatures);
    if let Some(template_id) = &options.template_id {
        request = request.with_template(template_id);
    }

    let (sink, file_name) = match &options.output {
        Some(path) => split_output_path(path)?,
        None => (
            FileSink::new(ctx.output_dir()),
            report_file_name(&options.project_id, options.from, options.to),
        ),
    };

    let rt = Runtime::new()?;
    let (outcome, stored) = rt.block_on(async {
        let cancel = CancellationToken::new();
        let request = request.with_cancellation(cancel.clone());

        // Ctrl-C stops outstanding generation; the report still completes
        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted: remaining sections fall back to literal content");
                cancel.cancel();
            }
        });

        let result = pipeline.run(&request).await;
        watcher.abort();

        let outcome = result?;
        let stored = sink.store(&file_name, &outcome.document).await?;
        Ok::<_, ReportError>((outcome, stored))
    })?;

    let record = ReportRecord::from_outcome(&options.project_id, &outcome, &stored.location);
    ctx.history().record(&record)?;

    let out = Output::new();
    out.success(&format!("Report written to {}", stored.location));
    out.field("Template", &outcome.template_id);
    out.field("Period", outcome.period);
    out.field("Pages", outcome.document.page_count());
    out.field("Size", format!("{} bytes", stored.byte_size));
    out.field("SHA-256", &stored.digest);

    out.section("Generation usage");
    out.field("Generated", outcome.usage.sections_generated);
    out.field("Fallback", outcome.usage.sections_fallback);
    out.field("Tokens", outcome.usage.total_tokens);

    out.section("Sections");
    for entry in &outcome.trace {
        out.trace(entry);
    }
    if outcome.usage.sections_fallback > 0 {
        out.warning("Some sections used their literal content; see the reasons above");
    }

    Ok(())
}

fn load_signatures(path: &Path) -> Result<Vec<SignatureEntry>> {
    let content = std::fs::read_to_string(path)?;
    let file: SignatureFile = serde_yaml::from_str(&content)?;
    Ok(file.signatures)
}

fn split_output_path(path: &Path) -> Result<(FileSink, String)> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            ReportError::Config(format!("Invalid output path: {}", path.display()))
        })?
        .to_string();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((FileSink::new(dir), file_name))
}
