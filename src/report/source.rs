//! Collaborator Seams
//!
//! Read contracts the pipeline consumes from the record store and the template
//! configuration store, plus an in-memory implementation of both.

use std::sync::Arc;

use async_trait::async_trait;

use crate::types::{
    ActivityEntry, PhotoSet, ProjectSnapshot, QualitySample, ReportPeriod, ReportTemplate, Result,
};

/// Read access to project operational records
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Project snapshot, `None` when the project does not exist
    async fn project(&self, project_id: &str) -> Result<Option<ProjectSnapshot>>;

    /// Daily activity entries dated within `period`
    async fn activity_entries(
        &self,
        project_id: &str,
        period: ReportPeriod,
    ) -> Result<Vec<ActivityEntry>>;

    /// Quality-control samples dated within `period`
    async fn quality_samples(
        &self,
        project_id: &str,
        period: ReportPeriod,
    ) -> Result<Vec<QualitySample>>;

    /// Photographic records taken within `period`
    async fn photos(&self, project_id: &str, period: ReportPeriod) -> Result<PhotoSet>;
}

/// Read access to report template configuration
#[async_trait]
pub trait TemplateSource: Send + Sync {
    /// Resolve the template for a report.
    ///
    /// An explicit `template_id` wins; otherwise the project's default template,
    /// otherwise the global default. `None` when nothing applies.
    async fn load_template(
        &self,
        project_id: &str,
        template_id: Option<&str>,
    ) -> Result<Option<ReportTemplate>>;
}

pub type SharedRecordSource = Arc<dyn RecordSource>;
pub type SharedTemplateSource = Arc<dyn TemplateSource>;

// =============================================================================
// In-memory source
// =============================================================================

/// Records for one project held in memory
#[derive(Debug, Clone)]
pub struct ProjectRecords {
    pub project: ProjectSnapshot,
    pub daily_logs: Vec<ActivityEntry>,
    pub quality_samples: Vec<QualitySample>,
    pub photos: PhotoSet,
}

impl ProjectRecords {
    pub fn new(project: ProjectSnapshot) -> Self {
        Self {
            project,
            daily_logs: Vec::new(),
            quality_samples: Vec::new(),
            photos: PhotoSet::default(),
        }
    }
}

/// In-memory record and template source
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    projects: Vec<ProjectRecords>,
    templates: Vec<ReportTemplate>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_project(mut self, records: ProjectRecords) -> Self {
        self.projects.push(records);
        self
    }

    pub fn with_template(mut self, template: ReportTemplate) -> Self {
        self.templates.push(template);
        self
    }

    fn records(&self, project_id: &str) -> Option<&ProjectRecords> {
        self.projects.iter().find(|r| r.project.id == project_id)
    }
}

#[async_trait]
impl RecordSource for InMemorySource {
    async fn project(&self, project_id: &str) -> Result<Option<ProjectSnapshot>> {
        Ok(self.records(project_id).map(|r| r.project.clone()))
    }

    async fn activity_entries(
        &self,
        project_id: &str,
        period: ReportPeriod,
    ) -> Result<Vec<ActivityEntry>> {
        Ok(self
            .records(project_id)
            .map(|r| {
                r.daily_logs
                    .iter()
                    .filter(|e| period.contains(e.date))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn quality_samples(
        &self,
        project_id: &str,
        period: ReportPeriod,
    ) -> Result<Vec<QualitySample>> {
        Ok(self
            .records(project_id)
            .map(|r| {
                r.quality_samples
                    .iter()
                    .filter(|s| period.contains(s.date))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn photos(&self, project_id: &str, period: ReportPeriod) -> Result<PhotoSet> {
        let items = self
            .records(project_id)
            .map(|r| {
                r.photos
                    .items
                    .iter()
                    .filter(|p| period.contains(p.taken_on))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(PhotoSet::from_items(items))
    }
}

#[async_trait]
impl TemplateSource for InMemorySource {
    async fn load_template(
        &self,
        project_id: &str,
        template_id: Option<&str>,
    ) -> Result<Option<ReportTemplate>> {
        if let Some(id) = template_id {
            return Ok(self.templates.iter().find(|t| t.id == id).cloned());
        }

        let project_default = self
            .templates
            .iter()
            .find(|t| t.is_default && t.project_id.as_deref() == Some(project_id));
        let global_default = || {
            self.templates
                .iter()
                .find(|t| t.is_default && t.project_id.is_none())
        };

        Ok(project_default.or_else(global_default).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(id: &str, project_id: Option<&str>, is_default: bool) -> ReportTemplate {
        ReportTemplate {
            id: id.into(),
            name: id.into(),
            project_id: project_id.map(String::from),
            is_default,
            sections: vec![],
        }
    }

    #[tokio::test]
    async fn test_project_default_beats_global_default() {
        let source = InMemorySource::new()
            .with_template(template("global", None, true))
            .with_template(template("p1", Some("P1"), true));

        let t = source.load_template("P1", None).await.unwrap().unwrap();
        assert_eq!(t.id, "p1");

        let t = source.load_template("P2", None).await.unwrap().unwrap();
        assert_eq!(t.id, "global");
    }

    #[tokio::test]
    async fn test_explicit_template_wins() {
        let source = InMemorySource::new()
            .with_template(template("global", None, true))
            .with_template(template("special", None, false));

        let t = source
            .load_template("P1", Some("special"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(t.id, "special");
        assert!(source.load_template("P1", Some("nope")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_no_default_yields_none() {
        let source = InMemorySource::new().with_template(template("draft", None, false));
        assert!(source.load_template("P1", None).await.unwrap().is_none());
    }
}
