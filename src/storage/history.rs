//! Generated report history

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::params;
use serde::Serialize;

use super::database::{SharedDatabase, parse_date};
use crate::ai::usage::GenerationUsage;
use crate::report::ReportOutcome;
use crate::types::{ReportPeriod, Result};

/// One generated report, as recorded after its document was stored
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRecord {
    pub id: String,
    pub project_id: String,
    pub period: ReportPeriod,
    pub template_id: String,
    pub page_count: usize,
    pub byte_size: usize,
    pub digest: String,
    pub output_path: String,
    pub usage: GenerationUsage,
    pub created_at: DateTime<Utc>,
}

impl ReportRecord {
    pub fn from_outcome(project_id: &str, outcome: &ReportOutcome, output_path: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            period: outcome.period,
            template_id: outcome.template_id.clone(),
            page_count: outcome.document.page_count(),
            byte_size: outcome.document.byte_size(),
            digest: outcome.document.digest().to_string(),
            output_path: output_path.to_string(),
            usage: outcome.usage,
            created_at: Utc::now(),
        }
    }
}

#[derive(Clone)]
pub struct ReportHistory {
    db: SharedDatabase,
}

impl ReportHistory {
    pub fn new(db: SharedDatabase) -> Self {
        Self { db }
    }

    pub fn record(&self, record: &ReportRecord) -> Result<()> {
        let conn = self.db.connection()?;
        conn.execute(
            "INSERT INTO generated_reports
                (id, project_id, period_start, period_end, template_id, page_count,
                 byte_size, digest, output_path, sections_generated, sections_fallback,
                 total_tokens, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                record.id,
                record.project_id,
                record.period.start().format("%Y-%m-%d").to_string(),
                record.period.end().format("%Y-%m-%d").to_string(),
                record.template_id,
                record.page_count as i64,
                record.byte_size as i64,
                record.digest,
                record.output_path,
                record.usage.sections_generated,
                record.usage.sections_fallback,
                record.usage.total_tokens as i64,
                record.created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            ],
        )?;
        Ok(())
    }

    /// Reports for a project, newest first
    pub fn list(&self, project_id: &str) -> Result<Vec<ReportRecord>> {
        let conn = self.db.connection()?;
        let mut stmt = conn.prepare(
            "SELECT id, project_id, period_start, period_end, template_id, page_count,
                    byte_size, digest, output_path, sections_generated, sections_fallback,
                    total_tokens, created_at
             FROM generated_reports
             WHERE project_id = ?1
             ORDER BY created_at DESC, id",
        )?;

        let records = stmt
            .query_map(params![project_id], |row| {
                let start = parse_date(&row.get::<_, String>(2)?, 2)?;
                let end = parse_date(&row.get::<_, String>(3)?, 3)?;
                let period = ReportPeriod::new(start, end).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        3,
                        rusqlite::types::Type::Text,
                        Box::from(e.to_string()),
                    )
                })?;
                let created_at: String = row.get(12)?;
                let created_at = DateTime::parse_from_rfc3339(&created_at)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(
                            12,
                            rusqlite::types::Type::Text,
                            Box::new(e),
                        )
                    })?;

                Ok(ReportRecord {
                    id: row.get(0)?,
                    project_id: row.get(1)?,
                    period,
                    template_id: row.get(4)?,
                    page_count: row.get::<_, i64>(5)? as usize,
                    byte_size: row.get::<_, i64>(6)? as usize,
                    digest: row.get(7)?,
                    output_path: row.get(8)?,
                    usage: GenerationUsage {
                        sections_generated: row.get(9)?,
                        sections_fallback: row.get(10)?,
                        total_tokens: row.get::<_, i64>(11)? as u64,
                    },
                    created_at,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }
}
