//! Projects Command
//!
//! List imported projects, so their IDs can be passed to `generate`.

use crate::cli::CommandContext;
use crate::cli::ui::Output;
use crate::report::context::format_currency;
use crate::types::Result;

pub fn run(format: &str) -> Result<()> {
    let ctx = CommandContext::load()?;
    let projects = ctx.records().list_projects()?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&projects)?);
        return Ok(());
    }

    let out = Output::new();
    if projects.is_empty() {
        out.info("No projects imported. Run 'sitereport import <records.json>'.");
        return Ok(());
    }

    out.section("Projects");
    for project in &projects {
        println!("{}  {}  {}", project.id, project.code, project.name);
        println!(
            "    client {}  budget {}",
            project.client_name,
            format_currency(project.budget)
        );
    }
    Ok(())
}
