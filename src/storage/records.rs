//! Operational record store
//!
//! Projects, daily activity entries, quality samples and photos, plus the
//! [`RecordSource`] adapter the collector reads through.

use std::collections::BTreeSet;

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::database::{Database, SharedDatabase, blocking, parse_date};
use crate::report::source::RecordSource;
use crate::types::{
    ActivityEntry, PhotoRecord, PhotoSet, ProjectSnapshot, QualitySample, ReportPeriod, Result,
    SampleStatus,
};

/// One project with its records, as found in an import file
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProjectImport {
    #[serde(flatten)]
    pub project: ProjectSnapshot,
    #[serde(default)]
    pub daily_logs: Vec<ActivityEntry>,
    #[serde(default)]
    pub quality_samples: Vec<QualitySample>,
    #[serde(default)]
    pub photos: Vec<PhotoRecord>,
}

/// Top-level shape of a records import file
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RecordImport {
    pub projects: Vec<ProjectImport>,
}

/// Row counts written by one import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub projects: usize,
    pub daily_logs: usize,
    pub quality_samples: usize,
    pub photos: usize,
}

#[derive(Clone)]
pub struct RecordStore {
    db: SharedDatabase,
}

impl RecordStore {
    pub fn new(db: SharedDatabase) -> Self {
        Self { db }
    }

    /// Import projects and records in one transaction.
    ///
    /// Projects are upserted; samples and photos are keyed by number and URL.
    /// Activity entries replace whole days: every stored entry on a date the
    /// file covers is removed, then all of the file's entries for it are kept.
    pub fn import(&self, import: &RecordImport) -> Result<ImportStats> {
        let stats = self.db.transaction(|conn| {
            let mut stats = ImportStats::default();
            for item in &import.projects {
                upsert_project(conn, &item.project)?;
                stats.projects += 1;

                stats.daily_logs +=
                    replace_activity_days(conn, &item.project.id, &item.daily_logs)?;
                for sample in &item.quality_samples {
                    upsert_sample(conn, &item.project.id, sample)?;
                    stats.quality_samples += 1;
                }
                for photo in &item.photos {
                    upsert_photo(conn, &item.project.id, photo)?;
                    stats.photos += 1;
                }
            }
            Ok(stats)
        })?;

        info!(
            "Imported {} projects ({} daily logs, {} samples, {} photos)",
            stats.projects, stats.daily_logs, stats.quality_samples, stats.photos
        );
        Ok(stats)
    }

    pub fn list_projects(&self) -> Result<Vec<ProjectSnapshot>> {
        let conn = self.db.connection()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, code, address, client_name, budget FROM projects ORDER BY code, id",
        )?;
        let projects = stmt
            .query_map([], map_project)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(projects)
    }
}

fn load_project(db: &Database, project_id: &str) -> Result<Option<ProjectSnapshot>> {
    let conn = db.connection()?;
    let project = conn
        .query_row(
            "SELECT id, name, code, address, client_name, budget FROM projects WHERE id = ?1",
            params![project_id],
            map_project,
        )
        .optional()?;
    Ok(project)
}

fn load_activity_entries(
    db: &Database,
    project_id: &str,
    period: ReportPeriod,
) -> Result<Vec<ActivityEntry>> {
    let conn = db.connection()?;
    let mut stmt = conn.prepare(
        "SELECT entry_date, weather, personnel_count, activities_text, observations
         FROM activity_entries
         WHERE project_id = ?1 AND entry_date BETWEEN ?2 AND ?3
         ORDER BY entry_date, id",
    )?;
    let entries = stmt
        .query_map(
            params![project_id, iso(period.start()), iso(period.end())],
            |row| {
                Ok(ActivityEntry {
                    date: parse_date(&row.get::<_, String>(0)?, 0)?,
                    weather: row.get(1)?,
                    personnel_count: row.get(2)?,
                    activities_text: row.get(3)?,
                    observations: row.get(4)?,
                })
            },
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    debug!(project_id, count = entries.len(), "Loaded activity entries");
    Ok(entries)
}

fn load_quality_samples(
    db: &Database,
    project_id: &str,
    period: ReportPeriod,
) -> Result<Vec<QualitySample>> {
    let conn = db.connection()?;
    let mut stmt = conn.prepare(
        "SELECT sample_number, sample_type, sample_date, location, status, result
         FROM quality_samples
         WHERE project_id = ?1 AND sample_date BETWEEN ?2 AND ?3
         ORDER BY sample_date, sample_number",
    )?;
    let samples = stmt
        .query_map(
            params![project_id, iso(period.start()), iso(period.end())],
            |row| {
                Ok(QualitySample {
                    sample_number: row.get(0)?,
                    sample_type: row.get(1)?,
                    date: parse_date(&row.get::<_, String>(2)?, 2)?,
                    location: row.get(3)?,
                    status: parse_status(&row.get::<_, String>(4)?, 4)?,
                    result: row.get(5)?,
                })
            },
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    debug!(project_id, count = samples.len(), "Loaded quality samples");
    Ok(samples)
}

fn load_photos(db: &Database, project_id: &str, period: ReportPeriod) -> Result<PhotoSet> {
    let conn = db.connection()?;
    let mut stmt = conn.prepare(
        "SELECT url, taken_on, tag, caption
         FROM photos
         WHERE project_id = ?1 AND taken_on BETWEEN ?2 AND ?3
         ORDER BY taken_on, id",
    )?;
    let items = stmt
        .query_map(
            params![project_id, iso(period.start()), iso(period.end())],
            |row| {
                Ok(PhotoRecord {
                    url: row.get(0)?,
                    taken_on: parse_date(&row.get::<_, String>(1)?, 1)?,
                    tag: row.get(2)?,
                    caption: row.get(3)?,
                })
            },
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(PhotoSet::from_items(items))
}

/// A stored status outside the known set fails the read rather than
/// counting as pending.
fn parse_status(value: &str, column: usize) -> rusqlite::Result<SampleStatus> {
    value.parse().map_err(|e: String| {
        rusqlite::Error::FromSqlConversionFailure(
            column,
            rusqlite::types::Type::Text,
            Box::from(e),
        )
    })
}

fn iso(date: chrono::NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn map_project(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProjectSnapshot> {
    Ok(ProjectSnapshot {
        id: row.get(0)?,
        name: row.get(1)?,
        code: row.get(2)?,
        address: row.get(3)?,
        client_name: row.get(4)?,
        budget: row.get(5)?,
    })
}

fn upsert_project(conn: &Connection, project: &ProjectSnapshot) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO projects (id, name, code, address, client_name, budget)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            code = excluded.code,
            address = excluded.address,
            client_name = excluded.client_name,
            budget = excluded.budget,
            updated_at = CURRENT_TIMESTAMP
        "#,
        params![
            project.id,
            project.name,
            project.code,
            project.address,
            project.client_name,
            project.budget,
        ],
    )?;
    Ok(())
}

fn replace_activity_days(
    conn: &Connection,
    project_id: &str,
    entries: &[ActivityEntry],
) -> Result<usize> {
    let days: BTreeSet<String> = entries.iter().map(|e| iso(e.date)).collect();
    for day in &days {
        conn.execute(
            "DELETE FROM activity_entries WHERE project_id = ?1 AND entry_date = ?2",
            params![project_id, day],
        )?;
    }

    let mut stmt = conn.prepare(
        "INSERT INTO activity_entries
         (project_id, entry_date, weather, personnel_count, activities_text, observations)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    for entry in entries {
        stmt.execute(params![
            project_id,
            iso(entry.date),
            entry.weather,
            entry.personnel_count,
            entry.activities_text,
            entry.observations,
        ])?;
    }
    Ok(entries.len())
}

fn upsert_sample(conn: &Connection, project_id: &str, sample: &QualitySample) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO quality_samples
            (project_id, sample_number, sample_type, sample_date, location, status, result)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT(project_id, sample_number) DO UPDATE SET
            sample_type = excluded.sample_type,
            sample_date = excluded.sample_date,
            location = excluded.location,
            status = excluded.status,
            result = excluded.result
        "#,
        params![
            project_id,
            sample.sample_number,
            sample.sample_type,
            iso(sample.date),
            sample.location,
            sample.status.as_str(),
            sample.result,
        ],
    )?;
    Ok(())
}

fn upsert_photo(conn: &Connection, project_id: &str, photo: &PhotoRecord) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO photos (project_id, url, taken_on, tag, caption)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT(project_id, url) DO UPDATE SET
            taken_on = excluded.taken_on,
            tag = excluded.tag,
            caption = excluded.caption
        "#,
        params![project_id, photo.url, iso(photo.taken_on), photo.tag, photo.caption],
    )?;
    Ok(())
}

#[async_trait]
impl RecordSource for RecordStore {
    async fn project(&self, project_id: &str) -> Result<Option<ProjectSnapshot>> {
        let project_id = project_id.to_string();
        blocking(&self.db, move |db| load_project(db, &project_id)).await
    }

    async fn activity_entries(
        &self,
        project_id: &str,
        period: ReportPeriod,
    ) -> Result<Vec<ActivityEntry>> {
        let project_id = project_id.to_string();
        blocking(&self.db, move |db| load_activity_entries(db, &project_id, period)).await
    }

    async fn quality_samples(
        &self,
        project_id: &str,
        period: ReportPeriod,
    ) -> Result<Vec<QualitySample>> {
        let project_id = project_id.to_string();
        blocking(&self.db, move |db| load_quality_samples(db, &project_id, period)).await
    }

    async fn photos(&self, project_id: &str, period: ReportPeriod) -> Result<PhotoSet> {
        let project_id = project_id.to_string();
        blocking(&self.db, move |db| load_photos(db, &project_id, period)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn store() -> RecordStore {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        RecordStore::new(Arc::new(db))
    }

    fn import() -> RecordImport {
        serde_json::from_str(
            r#"{
              "projects": [{
                "id": "P1", "name": "Riverside Bridge", "code": "RB-01",
                "client_name": "Ministry of Works", "budget": 1250000,
                "daily_logs": [
                  {"date": "2024-12-31", "weather": "Rain", "personnel_count": 3, "activities_text": "Mobilization"},
                  {"date": "2025-01-01", "weather": "Sunny", "personnel_count": 5, "activities_text": "Excavation"},
                  {"date": "2025-01-15", "weather": "Cloudy", "personnel_count": 7, "activities_text": "Formwork", "observations": "Late delivery"},
                  {"date": "2025-01-16", "weather": "Sunny", "personnel_count": 8, "activities_text": "Pouring"}
                ],
                "quality_samples": [
                  {"sample_number": "S-2", "type": "Concrete cylinder", "date": "2025-01-10", "status": "passed", "result": "28 MPa"},
                  {"sample_number": "S-1", "type": "Soil density", "date": "2025-01-05", "location": "Abutment A"}
                ],
                "photos": [
                  {"url": "s3://bucket/a.jpg", "taken_on": "2025-01-03", "tag": "progress"},
                  {"url": "s3://bucket/b.jpg", "taken_on": "2025-02-01"}
                ]
              }]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_import_counts_rows() {
        let store = store();
        let stats = store.import(&import()).unwrap();
        assert_eq!(
            stats,
            ImportStats {
                projects: 1,
                daily_logs: 4,
                quality_samples: 2,
                photos: 2
            }
        );
        assert_eq!(store.list_projects().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_import_is_repeatable() {
        let store = store();
        store.import(&import()).unwrap();
        store.import(&import()).unwrap();

        let period = ReportPeriod::new(date(1), date(31)).unwrap();
        assert_eq!(store.activity_entries("P1", period).await.unwrap().len(), 3);
        assert_eq!(store.quality_samples("P1", period).await.unwrap().len(), 2);
    }

    fn shifts() -> RecordImport {
        serde_json::from_str(
            r#"{
              "projects": [{
                "id": "P1", "name": "Riverside Bridge", "code": "RB-01",
                "client_name": "Ministry of Works", "budget": 1250000,
                "daily_logs": [
                  {"date": "2025-01-02", "weather": "Sunny", "personnel_count": 6, "activities_text": "Day shift"},
                  {"date": "2025-01-02", "weather": "Clear", "personnel_count": 3, "activities_text": "Night shift"}
                ]
              }]
            }"#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_same_day_entries_are_all_kept() {
        let store = store();
        let stats = store.import(&shifts()).unwrap();
        assert_eq!(stats.daily_logs, 2);

        let period = ReportPeriod::new(date(2), date(2)).unwrap();
        let entries = store.activity_entries("P1", period).await.unwrap();
        let texts: Vec<_> = entries.iter().map(|e| e.activities_text.as_str()).collect();
        assert_eq!(texts, vec!["Day shift", "Night shift"]);

        store.import(&shifts()).unwrap();
        assert_eq!(store.activity_entries("P1", period).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_reimport_replaces_covered_days_only() {
        let store = store();
        store.import(&import()).unwrap();
        store.import(&shifts()).unwrap();

        let period = ReportPeriod::new(date(1), date(31)).unwrap();
        let entries = store.activity_entries("P1", period).await.unwrap();
        let dates: Vec<_> = entries.iter().map(|e| e.date).collect();
        assert_eq!(dates, vec![date(1), date(2), date(2), date(15), date(16)]);
    }

    #[tokio::test]
    async fn test_unknown_stored_status_fails_read() {
        let store = store();
        store.import(&import()).unwrap();
        store
            .db
            .execute(
                "UPDATE quality_samples SET status = 'lost' WHERE sample_number = 'S-1'",
                &[],
            )
            .unwrap();

        let period = ReportPeriod::new(date(1), date(31)).unwrap();
        assert!(store.quality_samples("P1", period).await.is_err());
    }

    #[tokio::test]
    async fn test_record_source_filters_inclusive_range() {
        let store = store();
        store.import(&import()).unwrap();
        let period = ReportPeriod::new(date(1), date(15)).unwrap();

        let project = RecordSource::project(&store, "P1").await.unwrap().unwrap();
        assert_eq!(project.client_name, "Ministry of Works");
        assert_eq!(project.budget, 1_250_000.0);

        let entries = store.activity_entries("P1", period).await.unwrap();
        let dates: Vec<_> = entries.iter().map(|e| e.date).collect();
        assert_eq!(dates, vec![date(1), date(15)]);
        assert_eq!(entries[1].observations.as_deref(), Some("Late delivery"));

        let samples = store.quality_samples("P1", period).await.unwrap();
        assert_eq!(samples[0].sample_number, "S-1");
        assert_eq!(samples[0].status, SampleStatus::Pending);
        assert_eq!(samples[1].status, SampleStatus::Passed);

        let photos = store.photos("P1", period).await.unwrap();
        assert_eq!(photos.count, 1);
        assert_eq!(photos.items[0].tag.as_deref(), Some("progress"));
    }

    #[tokio::test]
    async fn test_unknown_project_is_none() {
        let store = store();
        assert!(RecordSource::project(&store, "nope").await.unwrap().is_none());
    }
}
