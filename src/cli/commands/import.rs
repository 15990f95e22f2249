//! Import Command
//!
//! Load projects and operational records from a JSON file.

use std::path::Path;

use crate::cli::CommandContext;
use crate::cli::ui::Output;
use crate::storage::RecordImport;
use crate::types::Result;

pub fn run(path: &Path) -> Result<()> {
    let ctx = CommandContext::load()?;
    let content = std::fs::read_to_string(path)?;
    let import: RecordImport = serde_json::from_str(&content)?;

    let stats = ctx.records().import(&import)?;

    let out = Output::new();
    out.success(&format!("Imported {}", path.display()));
    out.field("Projects", stats.projects);
    out.field("Daily logs", stats.daily_logs);
    out.field("Quality samples", stats.quality_samples);
    out.field("Photos", stats.photos);
    Ok(())
}
