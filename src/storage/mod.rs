pub mod database;
pub mod history;
pub mod records;
pub mod sink;
pub mod templates;

pub use database::{Database, PoolConfig, SharedDatabase, blocking};
pub use history::{ReportHistory, ReportRecord};
pub use records::{ImportStats, ProjectImport, RecordImport, RecordStore};
pub use sink::{DocumentSink, FileSink, StoredDocument};
pub use templates::{TemplateFile, TemplateStore};
