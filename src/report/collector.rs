//! Period Data Collector
//!
//! Fetches every operational record relevant to a reporting window and
//! normalizes them into one immutable [`PeriodDataSet`].
//!
//! The four reads are independent and run concurrently; the first failure
//! aborts the whole collection, and the aggregate is bounded by one timeout.

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, instrument};

use super::source::SharedRecordSource;
use crate::ai::timeout::with_timeout;
use crate::types::{
    ActivityEntry, PhotoSet, ProjectSnapshot, QualitySample, ReportError, ReportPeriod, Result,
    SampleStatus,
};

// =============================================================================
// Period Data Set
// =============================================================================

/// Derived statistics, computed once at collection time
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PeriodSummary {
    pub total_entries: usize,
    /// Distinct dates with at least one entry
    pub days_with_activity: usize,
    /// Sum of personnel counts over all entries
    pub personnel_days: u64,
    pub average_personnel: f64,
    pub samples_total: usize,
    pub samples_passed: usize,
    pub samples_failed: usize,
    pub samples_pending: usize,
    /// Passed over decided (passed + failed) samples, in percent
    pub sample_pass_rate: f64,
    pub photo_count: usize,
    /// Entry count per weather condition
    pub weather_days: BTreeMap<String, usize>,
}

impl PeriodSummary {
    fn compute(
        daily_logs: &[ActivityEntry],
        quality_samples: &[QualitySample],
        photos: &PhotoSet,
    ) -> Self {
        let total_entries = daily_logs.len();
        let personnel_days: u64 = daily_logs
            .iter()
            .map(|e| u64::from(e.personnel_count))
            .sum();
        let mut dates: Vec<NaiveDate> = daily_logs.iter().map(|e| e.date).collect();
        dates.dedup();

        let mut weather_days = BTreeMap::new();
        for entry in daily_logs {
            let condition = entry.weather.trim();
            if !condition.is_empty() {
                *weather_days.entry(condition.to_string()).or_insert(0) += 1;
            }
        }

        let count_status = |status: SampleStatus| {
            quality_samples
                .iter()
                .filter(|s| s.status == status)
                .count()
        };
        let samples_passed = count_status(SampleStatus::Passed);
        let samples_failed = count_status(SampleStatus::Failed);
        let decided = samples_passed + samples_failed;

        Self {
            total_entries,
            days_with_activity: dates.len(),
            personnel_days,
            average_personnel: if total_entries > 0 {
                personnel_days as f64 / total_entries as f64
            } else {
                0.0
            },
            samples_total: quality_samples.len(),
            samples_passed,
            samples_failed,
            samples_pending: count_status(SampleStatus::Pending),
            sample_pass_rate: if decided > 0 {
                samples_passed as f64 * 100.0 / decided as f64
            } else {
                0.0
            },
            photo_count: photos.count,
            weather_days,
        }
    }
}

/// Request-scoped snapshot of all project records within a period.
///
/// Immutable once assembled; every list holds only records dated inside the period.
#[derive(Debug, Clone, Serialize)]
pub struct PeriodDataSet {
    project: ProjectSnapshot,
    period: ReportPeriod,
    daily_logs: Vec<ActivityEntry>,
    quality_samples: Vec<QualitySample>,
    photos: PhotoSet,
    summary: PeriodSummary,
}

impl PeriodDataSet {
    /// Normalize raw reads: keep in-range records only, order by date, derive the summary.
    pub fn assemble(
        project: ProjectSnapshot,
        period: ReportPeriod,
        mut daily_logs: Vec<ActivityEntry>,
        mut quality_samples: Vec<QualitySample>,
        photos: PhotoSet,
    ) -> Self {
        daily_logs.retain(|e| period.contains(e.date));
        daily_logs.sort_by_key(|e| e.date);

        quality_samples.retain(|s| period.contains(s.date));
        quality_samples.sort_by(|a, b| {
            a.date
                .cmp(&b.date)
                .then_with(|| a.sample_number.cmp(&b.sample_number))
        });

        let mut items = photos.items;
        items.retain(|p| period.contains(p.taken_on));
        items.sort_by_key(|p| p.taken_on);
        let photos = PhotoSet::from_items(items);

        let summary = PeriodSummary::compute(&daily_logs, &quality_samples, &photos);

        Self {
            project,
            period,
            daily_logs,
            quality_samples,
            photos,
            summary,
        }
    }

    pub fn project(&self) -> &ProjectSnapshot {
        &self.project
    }

    pub fn period(&self) -> ReportPeriod {
        self.period
    }

    pub fn daily_logs(&self) -> &[ActivityEntry] {
        &self.daily_logs
    }

    pub fn quality_samples(&self) -> &[QualitySample] {
        &self.quality_samples
    }

    pub fn photos(&self) -> &PhotoSet {
        &self.photos
    }

    pub fn summary(&self) -> &PeriodSummary {
        &self.summary
    }

    /// True when the period has no records of any kind
    pub fn is_sparse(&self) -> bool {
        self.daily_logs.is_empty() && self.quality_samples.is_empty() && self.photos.count == 0
    }
}

// =============================================================================
// Collector
// =============================================================================

/// Builds a [`PeriodDataSet`] from a [`RecordSource`](super::source::RecordSource)
pub struct PeriodDataCollector {
    source: SharedRecordSource,
    timeout: Duration,
}

impl PeriodDataCollector {
    pub fn new(source: SharedRecordSource, timeout: Duration) -> Self {
        Self { source, timeout }
    }

    #[instrument(skip(self), fields(timeout_ms = self.timeout.as_millis() as u64))]
    pub async fn collect(
        &self,
        project_id: &str,
        period_start: NaiveDate,
        period_end: NaiveDate,
    ) -> Result<PeriodDataSet> {
        let period = ReportPeriod::new(period_start, period_end)?;

        let gather = async {
            let reads = tokio::try_join!(
                labelled("project", self.source.project(project_id)),
                labelled(
                    "activity_entries",
                    self.source.activity_entries(project_id, period)
                ),
                labelled(
                    "quality_samples",
                    self.source.quality_samples(project_id, period)
                ),
                labelled("photos", self.source.photos(project_id, period)),
            )?;
            Ok::<_, ReportError>(reads)
        };

        let (project, daily_logs, quality_samples, photos) =
            with_timeout(self.timeout, gather, "period data collection").await?;

        let project = project.ok_or_else(|| ReportError::ProjectNotFound {
            project_id: project_id.to_string(),
        })?;

        debug!(
            entries = daily_logs.len(),
            samples = quality_samples.len(),
            photos = photos.count,
            "Collector reads complete"
        );

        let data = PeriodDataSet::assemble(project, period, daily_logs, quality_samples, photos);

        info!(
            "Collected period {} for {}: {} entries, {} samples, {} photos",
            period,
            project_id,
            data.summary.total_entries,
            data.summary.samples_total,
            data.summary.photo_count
        );

        Ok(data)
    }
}

/// Tag a collaborator read failure with the read that failed
async fn labelled<T, F>(source_name: &'static str, read: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    read.await.map_err(|e| match e {
        e @ ReportError::DataCollection { .. } => e,
        other => ReportError::collection(source_name, other.to_string()),
    })
}
