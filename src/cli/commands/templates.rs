//! Templates Command
//!
//! Usage:
//!   sitereport templates import <file.yaml>
//!   sitereport templates list [--project ID] [-f json]
//!   sitereport templates delete <id>

use std::path::Path;

use crate::cli::CommandContext;
use crate::cli::ui::Output;
use crate::types::{ReportError, Result};

pub fn import(path: &Path) -> Result<()> {
    let ctx = CommandContext::load()?;
    let yaml = std::fs::read_to_string(path)?;
    let ids = ctx.templates().import_yaml(&yaml)?;

    let out = Output::new();
    out.success(&format!("Imported {} templates from {}", ids.len(), path.display()));
    for id in ids {
        println!("  {}", id);
    }
    Ok(())
}

pub fn list(project_id: Option<&str>, format: &str) -> Result<()> {
    let ctx = CommandContext::load()?;
    let templates = ctx.templates().list(project_id)?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&templates)?);
        return Ok(());
    }

    let out = Output::new();
    if templates.is_empty() {
        out.info("No templates configured. Run 'sitereport templates import <file.yaml>'.");
        return Ok(());
    }

    out.section("Report templates");
    for template in &templates {
        let scope = template.scope();
        let marker = if template.is_default { " (default)" } else { "" };
        println!("{}  {} [{}]{}", template.id, template.name, scope, marker);
        for section in template.ordered_sections() {
            let mode = if section.use_generation {
                "generation"
            } else {
                "literal"
            };
            println!(
                "    {:>3}  {:<24} {}",
                section.display_order, section.section_key, mode
            );
        }
    }
    Ok(())
}

pub fn delete(template_id: &str) -> Result<()> {
    let ctx = CommandContext::load()?;
    if !ctx.templates().delete(template_id)? {
        return Err(ReportError::InvalidTemplate(format!(
            "no template with id '{}'",
            template_id
        )));
    }

    Output::new().success(&format!("Deleted template {}", template_id));
    Ok(())
}
