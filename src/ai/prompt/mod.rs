//! Prompt Builder System
//!
//! Standardized user-prompt construction for generation-assisted sections.
//! The system persona travels separately; this builds the user turn.

/// Prompt section types
#[derive(Debug, Clone)]
pub enum PromptSection {
    /// Text under a `#` header
    Text { header: String, content: String },
    /// Data excerpt, fenced so the model treats it as reference material
    Data { label: String, content: String },
    /// Numbered output rules
    Rules(Vec<String>),
}

/// Prompt builder for consistent prompt construction
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    sections: Vec<PromptSection>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add text section with header
    pub fn section(mut self, header: &str, content: &str) -> Self {
        self.sections.push(PromptSection::Text {
            header: header.to_string(),
            content: content.to_string(),
        });
        self
    }

    /// Add a data excerpt; empty excerpts are skipped entirely
    pub fn data(mut self, label: &str, content: &str) -> Self {
        if !content.trim().is_empty() {
            self.sections.push(PromptSection::Data {
                label: label.to_string(),
                content: content.to_string(),
            });
        }
        self
    }

    /// Add output rules
    pub fn rules(mut self, rules: Vec<&str>) -> Self {
        self.sections.push(PromptSection::Rules(
            rules.into_iter().map(String::from).collect(),
        ));
        self
    }

    /// Build the final prompt string
    pub fn build(self) -> String {
        let mut prompt = String::new();

        for section in self.sections {
            match section {
                PromptSection::Text { header, content } => {
                    prompt.push_str(&format!("# {}\n\n", header));
                    prompt.push_str(&content);
                    prompt.push_str("\n\n");
                }
                PromptSection::Data { label, content } => {
                    prompt.push_str(&format!("<{}>\n", label));
                    prompt.push_str(content.trim_end());
                    prompt.push_str(&format!("\n</{}>\n\n", label));
                }
                PromptSection::Rules(rules) => {
                    prompt.push_str("<RULES>\n");
                    for (i, rule) in rules.iter().enumerate() {
                        prompt.push_str(&format!("{}. {}\n", i + 1, rule));
                    }
                    prompt.push_str("</RULES>\n\n");
                }
            }
        }

        prompt.trim_end().to_string()
    }
}

/// Preset prompt templates
pub struct PromptTemplates;

impl PromptTemplates {
    /// User turn for one report section
    pub fn report_section(title: &str, instruction: &str, context: &str) -> PromptBuilder {
        PromptBuilder::new()
            .section(&format!("Section: {}", title), instruction)
            .data("PERIOD_DATA", context)
            .rules(vec![
                "Use only facts present in PERIOD_DATA",
                "Do not invent dates, quantities, or names",
                "Do not repeat the section title",
            ])
    }
}
