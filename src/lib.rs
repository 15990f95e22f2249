//! sitereport - Periodic Operational Reports for Construction Supervision
//!
//! Aggregates a project's operational records for a date range, resolves a
//! configurable report template into section content, and composes the result
//! into a paginated PDF.
//!
//! ## Pipeline
//!
//! ```text
//! ReportTemplate ─┐
//!                 ├─▶ PeriodDataCollector ─▶ PlaceholderResolver / SectionGenerator ─▶ Composer
//! RecordSource ───┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use sitereport::{Config, Database, RecordStore, ReportPipeline, ReportRequest, TemplateStore};
//!
//! let db = Arc::new(Database::open("sitereport.db")?);
//! db.initialize()?;
//! let pipeline = ReportPipeline::new(
//!     Arc::new(RecordStore::new(db.clone())),
//!     Arc::new(TemplateStore::new(db)),
//!     None,
//!     &Config::default(),
//! )?;
//! let outcome = pipeline.run(&ReportRequest::new("P1", start, end)).await?;
//! std::fs::write("report.pdf", outcome.document.bytes())?;
//! ```
//!
//! ## Modules
//!
//! - [`report`]: collector, resolver, generator, composer and the pipeline
//! - [`ai`]: generative text providers, prompts, usage accounting
//! - [`storage`]: SQLite record/template store, report history, document sinks
//! - [`config`]: layered configuration

pub mod ai;
pub mod cli;
pub mod config;
pub mod constants;
pub mod report;
pub mod storage;
pub mod types;

// Configuration
pub use config::{Config, ConfigLoader, MissingTokenPolicy};

// Error Types
pub use types::error::{ErrorCategory, ReportError, Result, ResultExt};

// Domain
pub use types::{
    ActivityEntry, DataSourceName, PhotoRecord, PhotoSet, ProjectSnapshot, QualitySample,
    ReportPeriod, ReportTemplate, ResolutionKind, ResolvedSection, SampleStatus, SectionTemplate,
    SectionTrace, SignatureEntry, SignatureMark,
};

// Pipeline
pub use report::{
    ComposedDocument, Composer, PageConfig, PeriodDataCollector, PeriodDataSet,
    PlaceholderResolver, RecordSource, ReportOutcome, ReportPipeline, ReportRequest,
    SectionGenerator, TemplateSource,
};

// Storage
pub use storage::{
    Database, DocumentSink, FileSink, PoolConfig, RecordStore, ReportHistory, SharedDatabase,
    TemplateStore,
};

// AI
pub use ai::{GenerationUsage, LlmProvider, LlmResponse, SharedProvider, create_provider};
