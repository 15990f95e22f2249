use console::style;

use crate::types::{ResolutionKind, SectionTrace};

pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", style("✓").green(), message);
    }

    pub fn warning(&self, message: &str) {
        println!("{} {}", style("⚠").yellow(), message);
    }

    pub fn info(&self, message: &str) {
        println!("{} {}", style("ℹ").blue(), message);
    }

    pub fn section(&self, message: &str) {
        println!("\n{}", style(message).bold());
        println!("{}", "─".repeat(40));
    }

    /// Aligned `label: value` line
    pub fn field(&self, label: &str, value: impl std::fmt::Display) {
        println!("  {:<18} {}", style(format!("{}:", label)).dim(), value);
    }

    /// One line of the per-section resolution trace
    pub fn trace(&self, entry: &SectionTrace) {
        let kind = match entry.resolution_kind {
            ResolutionKind::Substituted => style(entry.resolution_kind.as_str()).cyan(),
            ResolutionKind::Generated => style(entry.resolution_kind.as_str()).green(),
            ResolutionKind::GeneratedFallback => style(entry.resolution_kind.as_str()).yellow(),
        };

        let mut line = format!("  {:<24} {}", entry.section_key, kind);
        if let Some(tokens) = entry.tokens {
            line.push_str(&format!(" ({} tokens)", tokens));
        }
        if let Some(reason) = &entry.fallback_reason {
            line.push_str(&format!(" {}", style(reason).dim()));
        }
        println!("{}", line);
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}
