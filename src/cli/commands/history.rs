//! History Command
//!
//! List reports generated for a project.

use crate::cli::CommandContext;
use crate::cli::ui::Output;
use crate::report::context::format_date;
use crate::types::Result;

pub fn run(project_id: &str, format: &str) -> Result<()> {
    let ctx = CommandContext::load()?;
    let records = ctx.history().list(project_id)?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    let out = Output::new();
    if records.is_empty() {
        out.info(&format!("No reports generated for {}", project_id));
        return Ok(());
    }

    out.section(&format!("Reports for {}", project_id));
    for record in &records {
        println!(
            "{}  {} - {}  {} pages  {}",
            record.created_at.format("%Y-%m-%d %H:%M"),
            format_date(record.period.start()),
            format_date(record.period.end()),
            record.page_count,
            record.output_path
        );
        println!(
            "    template {}  generated {}  fallback {}  tokens {}  sha256 {}",
            record.template_id,
            record.usage.sections_generated,
            record.usage.sections_fallback,
            record.usage.total_tokens,
            &record.digest[..record.digest.len().min(12)]
        );
    }
    Ok(())
}
