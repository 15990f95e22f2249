//! Init Command
//!
//! Initialize sitereport in the current directory.

use crate::cli::ui::Output;
use crate::cli::util::create_database;
use crate::config::ConfigLoader;
use crate::constants::storage;
use crate::types::{ReportError, Result};

pub fn run(force: bool) -> Result<()> {
    let root = std::env::current_dir()?;
    let app_dir = root.join(storage::APP_DIR);

    if app_dir.exists() && !force {
        return Err(ReportError::Config(
            "Already initialized. Use --force to overwrite.".to_string(),
        ));
    }

    ConfigLoader::init_project_at(&root)?;

    if let Err(e) = ConfigLoader::init_global(false) {
        tracing::debug!("Global config init skipped: {}", e);
    }

    let config = ConfigLoader::load()?;
    create_database(&config.storage.database_path)?;

    let out = Output::new();
    out.success(&format!("Initialized sitereport in {}/", storage::APP_DIR));
    out.field("Database", config.storage.database_path.display());
    out.field("Reports", config.storage.output_dir.display());
    println!();
    println!("Next steps:");
    println!("  1. sitereport import records.json");
    println!("  2. sitereport templates import templates.yaml");
    println!("  3. sitereport generate --project <ID> --from <YYYY-MM-DD> --to <YYYY-MM-DD>");

    Ok(())
}
