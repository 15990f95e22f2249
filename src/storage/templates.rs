//! Report template store
//!
//! Administrator-owned template configuration. Write-time checks keep
//! `section_key` unique per template and at most one default per scope.

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Deserialize;
use tracing::{debug, info};

use super::database::{Database, SharedDatabase, blocking};
use crate::report::source::TemplateSource;
use crate::types::{DataSourceName, ReportTemplate, Result, SectionTemplate};

/// Shape of a template import file
#[derive(Debug, Deserialize)]
pub struct TemplateFile {
    pub templates: Vec<ReportTemplate>,
}

#[derive(Clone)]
pub struct TemplateStore {
    db: SharedDatabase,
}

impl TemplateStore {
    pub fn new(db: SharedDatabase) -> Self {
        Self { db }
    }

    /// Insert or replace a template with its sections.
    ///
    /// Saving a default template demotes the previous default of the same
    /// scope. Returns the template id, generated when the template has none.
    pub fn save(&self, template: &ReportTemplate) -> Result<String> {
        template.validate()?;

        let mut template = template.clone();
        if template.id.trim().is_empty() {
            template.id = uuid::Uuid::new_v4().to_string();
        }
        template.assign_creation_order();

        let record = &template;
        self.db.transaction(|conn| {
            if record.is_default {
                let demoted = conn.execute(
                    "UPDATE report_templates SET is_default = 0
                     WHERE is_default = 1
                       AND COALESCE(project_id, '') = COALESCE(?1, '')
                       AND id != ?2",
                    params![record.project_id, record.id],
                )?;
                if demoted > 0 {
                    debug!(template = %record.id, "Demoted previous default template");
                }
            }

            conn.execute(
                "INSERT INTO report_templates (id, name, project_id, is_default)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    project_id = excluded.project_id,
                    is_default = excluded.is_default",
                params![record.id, record.name, record.project_id, record.is_default],
            )?;

            conn.execute(
                "DELETE FROM section_templates WHERE template_id = ?1",
                params![record.id],
            )?;
            for section in &record.sections {
                insert_section(conn, &record.id, section)?;
            }
            Ok(())
        })?;

        info!(
            "Saved template '{}' ({}, {} sections)",
            template.name,
            template.id,
            template.sections.len()
        );
        Ok(template.id)
    }

    /// Save every template of a YAML import file, in file order
    pub fn import_yaml(&self, yaml: &str) -> Result<Vec<String>> {
        let file: TemplateFile = serde_yaml::from_str(yaml)?;
        file.templates.iter().map(|t| self.save(t)).collect()
    }

    pub fn get(&self, template_id: &str) -> Result<Option<ReportTemplate>> {
        load_template_by_id(&self.db, template_id)
    }

    /// Templates visible to a project (its own plus global ones), or all of them
    pub fn list(&self, project_id: Option<&str>) -> Result<Vec<ReportTemplate>> {
        let conn = self.db.connection()?;
        let ids: Vec<String> = match project_id {
            Some(project_id) => {
                let mut stmt = conn.prepare(
                    "SELECT id FROM report_templates
                     WHERE project_id = ?1 OR project_id IS NULL
                     ORDER BY project_id IS NULL, name, id",
                )?;
                stmt.query_map(params![project_id], |row| row.get(0))?
                    .collect::<std::result::Result<_, _>>()?
            }
            None => {
                let mut stmt =
                    conn.prepare("SELECT id FROM report_templates ORDER BY name, id")?;
                stmt.query_map([], |row| row.get(0))?
                    .collect::<std::result::Result<_, _>>()?
            }
        };
        drop(conn);

        let mut templates = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(template) = load_template_by_id(&self.db, &id)? {
                templates.push(template);
            }
        }
        Ok(templates)
    }

    pub fn delete(&self, template_id: &str) -> Result<bool> {
        let removed = self.db.execute(
            "DELETE FROM report_templates WHERE id = ?1",
            &[&template_id],
        )?;
        Ok(removed > 0)
    }
}

fn insert_section(conn: &Connection, template_id: &str, section: &SectionTemplate) -> Result<()> {
    let data_sources = serde_json::to_string(&section.data_sources)?;
    conn.execute(
        "INSERT INTO section_templates
            (template_id, section_key, title, display_order, creation_seq,
             base_content, use_generation, generation_prompt, data_sources)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            template_id,
            section.section_key,
            section.title,
            section.display_order,
            section.creation_seq,
            section.base_content,
            section.use_generation,
            section.generation_prompt,
            data_sources,
        ],
    )?;
    Ok(())
}

fn load_template_by_id(db: &Database, template_id: &str) -> Result<Option<ReportTemplate>> {
    let conn = db.connection()?;
    let header = conn
        .query_row(
            "SELECT id, name, project_id, is_default FROM report_templates WHERE id = ?1",
            params![template_id],
            |row| {
                Ok(ReportTemplate {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    project_id: row.get(2)?,
                    is_default: row.get(3)?,
                    sections: Vec::new(),
                })
            },
        )
        .optional()?;

    let Some(mut template) = header else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT section_key, title, display_order, creation_seq, base_content,
                use_generation, generation_prompt, data_sources
         FROM section_templates
         WHERE template_id = ?1
         ORDER BY display_order, creation_seq",
    )?;
    let rows = stmt
        .query_map(params![template_id], |row| {
            let section = SectionTemplate {
                section_key: row.get(0)?,
                title: row.get(1)?,
                display_order: row.get(2)?,
                creation_seq: row.get(3)?,
                base_content: row.get(4)?,
                use_generation: row.get(5)?,
                generation_prompt: row.get(6)?,
                data_sources: Vec::new(),
            };
            Ok((section, row.get::<_, String>(7)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    for (mut section, sources) in rows {
        section.data_sources = serde_json::from_str::<Vec<DataSourceName>>(&sources)?;
        template.sections.push(section);
    }
    Ok(Some(template))
}

fn default_template_id(db: &Database, project_id: Option<&str>) -> Result<Option<String>> {
    let conn = db.connection()?;
    let id = match project_id {
        Some(project_id) => conn
            .query_row(
                "SELECT id FROM report_templates WHERE is_default = 1 AND project_id = ?1",
                params![project_id],
                |row| row.get(0),
            )
            .optional()?,
        None => conn
            .query_row(
                "SELECT id FROM report_templates WHERE is_default = 1 AND project_id IS NULL",
                [],
                |row| row.get(0),
            )
            .optional()?,
    };
    Ok(id)
}

fn resolve_template(
    db: &Database,
    project_id: &str,
    template_id: Option<&str>,
) -> Result<Option<ReportTemplate>> {
    if let Some(id) = template_id {
        return load_template_by_id(db, id);
    }

    let id = match default_template_id(db, Some(project_id))? {
        Some(id) => Some(id),
        None => default_template_id(db, None)?,
    };
    match id {
        Some(id) => load_template_by_id(db, &id),
        None => Ok(None),
    }
}

#[async_trait]
impl TemplateSource for TemplateStore {
    async fn load_template(
        &self,
        project_id: &str,
        template_id: Option<&str>,
    ) -> Result<Option<ReportTemplate>> {
        let project_id = project_id.to_string();
        let template_id = template_id.map(String::from);
        blocking(&self.db, move |db| {
            resolve_template(db, &project_id, template_id.as_deref())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ReportError;
    use std::sync::Arc;

    fn store() -> TemplateStore {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        TemplateStore::new(Arc::new(db))
    }

    fn template(id: &str, project_id: Option<&str>, is_default: bool) -> ReportTemplate {
        ReportTemplate {
            id: id.into(),
            name: format!("Template {}", id),
            project_id: project_id.map(String::from),
            is_default,
            sections: vec![
                SectionTemplate::new("intro", "Introduction")
                    .with_order(1)
                    .with_content("Period report for {{project.name}}"),
            ],
        }
    }

    #[test]
    fn test_save_and_get_preserves_sections() {
        let store = store();
        let mut t = template("monthly", None, true);
        t.sections.push(
            SectionTemplate::new("quality", "Quality control")
                .with_order(1)
                .with_content("Samples: {{quality_samples.count}}")
                .with_generation(
                    "Summarize quality results",
                    vec![DataSourceName::QualitySamples, DataSourceName::Summary],
                ),
        );
        store.save(&t).unwrap();

        let loaded = store.get("monthly").unwrap().unwrap();
        assert_eq!(loaded.name, "Template monthly");
        assert!(loaded.is_default);
        let keys: Vec<_> = loaded.ordered_sections().into_iter().map(|s| s.section_key).collect();
        assert_eq!(keys, vec!["intro", "quality"]);

        let quality = &loaded.sections[1];
        assert!(quality.use_generation);
        assert_eq!(
            quality.data_sources,
            vec![DataSourceName::QualitySamples, DataSourceName::Summary]
        );
        assert_eq!(quality.creation_seq, 2);
    }

    #[test]
    fn test_save_assigns_id_when_missing() {
        let store = store();
        let id = store.save(&template("", None, false)).unwrap();
        assert!(!id.is_empty());
        assert!(store.get(&id).unwrap().is_some());
    }

    #[test]
    fn test_duplicate_section_key_rejected_at_write() {
        let store = store();
        let mut t = template("dup", None, false);
        t.sections.push(SectionTemplate::new("intro", "Again"));

        let err = store.save(&t).unwrap_err();
        assert!(matches!(err, ReportError::InvalidTemplate(_)));
        assert!(store.get("dup").unwrap().is_none());
    }

    #[test]
    fn test_one_default_per_scope() {
        let store = store();
        store.save(&template("g1", None, true)).unwrap();
        store.save(&template("p1", Some("P1"), true)).unwrap();
        store.save(&template("g2", None, true)).unwrap();

        assert!(!store.get("g1").unwrap().unwrap().is_default);
        assert!(store.get("g2").unwrap().unwrap().is_default);
        // other scopes keep their default
        assert!(store.get("p1").unwrap().unwrap().is_default);
    }

    #[test]
    fn test_resave_replaces_sections() {
        let store = store();
        store.save(&template("t", None, false)).unwrap();

        let mut t = template("t", None, false);
        t.sections = vec![SectionTemplate::new("closing", "Closing remarks")];
        store.save(&t).unwrap();

        let loaded = store.get("t").unwrap().unwrap();
        assert_eq!(loaded.sections.len(), 1);
        assert_eq!(loaded.sections[0].section_key, "closing");
    }

    #[test]
    fn test_list_scoped_to_project() {
        let store = store();
        store.save(&template("global", None, false)).unwrap();
        store.save(&template("mine", Some("P1"), false)).unwrap();
        store.save(&template("other", Some("P2"), false)).unwrap();

        let ids: Vec<_> = store
            .list(Some("P1"))
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec!["mine", "global"]);
        assert_eq!(store.list(None).unwrap().len(), 3);
    }

    #[test]
    fn test_import_yaml() {
        let store = store();
        let yaml = r#"
templates:
  - id: monthly
    name: Monthly supervision report
    is_default: true
    sections:
      - section_key: weather_summary
        title: Weather
        display_order: 1
        base_content: "Entries registered: {{daily_logs.count}}"
      - section_key: quality
        title: Quality
        display_order: 2
        use_generation: true
        generation_prompt: Summarize the quality samples
        data_sources: [quality_samples]
"#;
        let ids = store.import_yaml(yaml).unwrap();
        assert_eq!(ids, vec!["monthly"]);

        let loaded = store.get("monthly").unwrap().unwrap();
        assert_eq!(loaded.sections.len(), 2);
        assert_eq!(
            loaded.sections[0].base_content,
            "Entries registered: {{daily_logs.count}}"
        );
    }

    #[test]
    fn test_delete_cascades_sections() {
        let store = store();
        store.save(&template("t", None, false)).unwrap();
        assert!(store.delete("t").unwrap());
        assert!(!store.delete("t").unwrap());

        let count: i64 = store
            .db
            .connection()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM section_templates", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_template_source_resolution_order() {
        let store = store();
        store.save(&template("global", None, true)).unwrap();
        store.save(&template("project", Some("P1"), true)).unwrap();
        store.save(&template("explicit", Some("P1"), false)).unwrap();

        let explicit = store.load_template("P1", Some("explicit")).await.unwrap();
        assert_eq!(explicit.unwrap().id, "explicit");

        let project = store.load_template("P1", None).await.unwrap();
        assert_eq!(project.unwrap().id, "project");

        let global = store.load_template("P9", None).await.unwrap();
        assert_eq!(global.unwrap().id, "global");

        let missing = store.load_template("P1", Some("nope")).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_no_default_resolves_to_none() {
        let store = store();
        store.save(&template("plain", None, false)).unwrap();
        assert!(store.load_template("P1", None).await.unwrap().is_none());
    }
}
