//! CLI Common Utilities
//!
//! Shared initialization and context management for CLI commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{Config, ConfigLoader};
use crate::constants::storage;
use crate::storage::{Database, ReportHistory, RecordStore, SharedDatabase, TemplateStore};
use crate::types::{ReportError, Result};

/// Command execution context
///
/// Created via `CommandContext::load()` for commands that read or write the
/// local store.
#[derive(Clone)]
pub struct CommandContext {
    /// Application directory (.sitereport)
    pub app_dir: PathBuf,
    /// Shared database handle
    pub db: SharedDatabase,
    /// Loaded configuration
    pub config: Config,
}

impl CommandContext {
    /// Validates initialization, loads config, and opens the database.
    pub fn load() -> Result<Self> {
        let app_dir = require_initialized()?;
        let config = ConfigLoader::load()?;
        let db = open_database(&config.storage.database_path)?;

        Ok(Self {
            app_dir,
            db: Arc::new(db),
            config,
        })
    }

    pub fn records(&self) -> RecordStore {
        RecordStore::new(Arc::clone(&self.db))
    }

    pub fn templates(&self) -> TemplateStore {
        TemplateStore::new(Arc::clone(&self.db))
    }

    pub fn history(&self) -> ReportHistory {
        ReportHistory::new(Arc::clone(&self.db))
    }

    pub fn output_dir(&self) -> &Path {
        &self.config.storage.output_dir
    }
}

/// Returns the .sitereport directory, or `ReportError::NotInitialized`.
pub fn require_initialized() -> Result<PathBuf> {
    let app_dir = Path::new(storage::APP_DIR);

    if !app_dir.exists() {
        return Err(ReportError::NotInitialized);
    }

    Ok(app_dir.to_path_buf())
}

/// Open an existing database, running any pending migrations
pub fn open_database(path: &Path) -> Result<Database> {
    if !path.exists() {
        return Err(ReportError::NotInitialized);
    }

    let db = Database::open(path)?;
    db.initialize()?;
    Ok(db)
}

/// Create and initialize the database, including its parent directory
pub fn create_database(path: &Path) -> Result<Database> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let db = Database::open(path)?;
    db.initialize()?;
    Ok(db)
}

pub fn is_initialized() -> bool {
    Path::new(storage::APP_DIR).exists()
}

/// Parse a `YYYY-MM-DD` command-line date
pub fn parse_date_arg(s: &str) -> std::result::Result<chrono::NaiveDate, String> {
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| format!("Invalid date '{}'. Expected YYYY-MM-DD", s))
}

/// Default file name of a generated report
pub fn report_file_name(
    project_id: &str,
    start: chrono::NaiveDate,
    end: chrono::NaiveDate,
) -> String {
    let stem: String = project_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    format!(
        "{}_{}_{}.pdf",
        stem,
        start.format("%Y%m%d"),
        end.format("%Y%m%d")
    )
}
