//! Report template configuration types
//!
//! Long-lived, administrator-owned configuration. The pipeline only reads it.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::error::{ReportError, Result};

/// Named slice of the period data set a section may read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSourceName {
    Project,
    DailyLogs,
    QualitySamples,
    Photos,
    Summary,
}

impl DataSourceName {
    pub const ALL: [DataSourceName; 5] = [
        Self::Project,
        Self::DailyLogs,
        Self::QualitySamples,
        Self::Photos,
        Self::Summary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::DailyLogs => "daily_logs",
            Self::QualitySamples => "quality_samples",
            Self::Photos => "photos",
            Self::Summary => "summary",
        }
    }
}

impl std::fmt::Display for DataSourceName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DataSourceName {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|source| source.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "Unknown data source: {}. Valid values: project, daily_logs, quality_samples, photos, summary",
                    s
                )
            })
    }
}

/// Which templates a template applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateScope {
    Global,
    Project(String),
}

impl std::fmt::Display for TemplateScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::Project(id) => write!(f, "project {}", id),
        }
    }
}

/// One ordered unit of a report template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionTemplate {
    pub section_key: String,
    pub title: String,
    #[serde(default)]
    pub display_order: i32,
    /// Creation ordinal; breaks `display_order` ties
    #[serde(default)]
    pub creation_seq: i64,
    #[serde(default)]
    pub base_content: String,
    #[serde(default)]
    pub use_generation: bool,
    #[serde(default)]
    pub generation_prompt: Option<String>,
    #[serde(default)]
    pub data_sources: Vec<DataSourceName>,
}

impl SectionTemplate {
    pub fn new(section_key: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            section_key: section_key.into(),
            title: title.into(),
            display_order: 0,
            creation_seq: 0,
            base_content: String::new(),
            use_generation: false,
            generation_prompt: None,
            data_sources: Vec::new(),
        }
    }

    pub fn with_order(mut self, display_order: i32) -> Self {
        self.display_order = display_order;
        self
    }

    pub fn with_content(mut self, base_content: impl Into<String>) -> Self {
        self.base_content = base_content.into();
        self
    }

    pub fn with_generation(
        mut self,
        prompt: impl Into<String>,
        data_sources: Vec<DataSourceName>,
    ) -> Self {
        self.use_generation = true;
        self.generation_prompt = Some(prompt.into());
        self.data_sources = data_sources;
        self
    }
}

/// Named, ordered collection of section definitions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportTemplate {
    #[serde(default)]
    pub id: String,
    pub name: String,
    /// `None` for a global template
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub sections: Vec<SectionTemplate>,
}

impl ReportTemplate {
    pub fn scope(&self) -> TemplateScope {
        match &self.project_id {
            Some(id) => TemplateScope::Project(id.clone()),
            None => TemplateScope::Global,
        }
    }

    /// Sections in rendering order: `display_order`, then creation order
    pub fn ordered_sections(&self) -> Vec<SectionTemplate> {
        let mut sections = self.sections.clone();
        sections.sort_by_key(|s| (s.display_order, s.creation_seq));
        sections
    }

    /// Assign creation ordinals from list position where none were recorded
    pub fn assign_creation_order(&mut self) {
        for (seq, section) in self.sections.iter_mut().enumerate() {
            if section.creation_seq == 0 {
                section.creation_seq = seq as i64 + 1;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ReportError::InvalidTemplate(
                "template name must not be empty".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for section in &self.sections {
            if section.section_key.trim().is_empty() {
                return Err(ReportError::InvalidTemplate(format!(
                    "template '{}' has a section without a key",
                    self.name
                )));
            }
            if !seen.insert(section.section_key.as_str()) {
                return Err(ReportError::InvalidTemplate(format!(
                    "duplicate section_key '{}' in template '{}'",
                    section.section_key, self.name
                )));
            }
        }
        Ok(())
    }
}
