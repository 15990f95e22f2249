//! Report Pipeline Components
//!
//! Collector → Resolver / Generator → Composer, plus the collaborator seams
//! they read through.

pub mod collector;
pub mod composer;
pub mod context;
pub mod generator;
pub mod pipeline;
pub mod resolver;
pub mod source;

pub use collector::{PeriodDataCollector, PeriodDataSet, PeriodSummary};
pub use composer::{
    BlockContent, ComposeInput, ComposedDocument, Composer, DocumentHeader, DrawnBlock, Page,
    PageConfig, SummaryTable,
};
pub use context::{FieldValue, render_context};
pub use generator::{
    FallbackReason, GenerationOutcome, SectionGenerator, SectionResolution, SharedGenerator,
};
pub use pipeline::{ReportOutcome, ReportPipeline, ReportRequest};
pub use resolver::PlaceholderResolver;
pub use source::{
    InMemorySource, ProjectRecords, RecordSource, SharedRecordSource, SharedTemplateSource,
    TemplateSource,
};
