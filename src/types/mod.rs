pub mod error;
pub mod records;
pub mod section;
pub mod template;

pub use error::{ErrorCategory, ErrorClassifier, LlmError, ReportError, Result, ResultExt};
pub use records::{
    ActivityEntry, PhotoRecord, PhotoSet, ProjectSnapshot, QualitySample, SampleStatus,
};
pub use section::{
    ResolutionKind, ResolvedSection, SectionTrace, SectionUsage, SignatureEntry, SignatureMark,
};
pub use template::{DataSourceName, ReportTemplate, SectionTemplate, TemplateScope};

// =============================================================================
// Domain Newtypes
// =============================================================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Inclusive `[start, end]` reporting window
///
/// Can only be constructed with `start <= end`, deserialization included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "PeriodBounds")]
pub struct ReportPeriod {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Deserialize)]
struct PeriodBounds {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<PeriodBounds> for ReportPeriod {
    type Error = ReportError;

    fn try_from(bounds: PeriodBounds) -> Result<Self> {
        Self::new(bounds.start, bounds.end)
    }
}

impl ReportPeriod {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(ReportError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Inclusive membership test
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of calendar days covered, both ends included
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

impl std::fmt::Display for ReportPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_period_rejects_inverted_range() {
        let err = ReportPeriod::new(date(2025, 1, 15), date(2025, 1, 1)).unwrap_err();
        assert_eq!(err.code(), "INVALID_RANGE");
    }

    #[test]
    fn test_period_is_inclusive() {
        let period = ReportPeriod::new(date(2025, 1, 1), date(2025, 1, 15)).unwrap();
        assert!(period.contains(date(2025, 1, 1)));
        assert!(period.contains(date(2025, 1, 15)));
        assert!(!period.contains(date(2025, 1, 16)));
        assert_eq!(period.days(), 15);
    }

    #[test]
    fn test_single_day_period() {
        let period = ReportPeriod::new(date(2025, 2, 1), date(2025, 2, 1)).unwrap();
        assert_eq!(period.days(), 1);
    }

    #[test]
    fn test_deserialize_validates_range() {
        let period: ReportPeriod =
            serde_json::from_str(r#"{"start":"2025-01-01","end":"2025-01-15"}"#).unwrap();
        assert_eq!(period.days(), 15);

        let reversed = r#"{"start":"2025-01-15","end":"2025-01-01"}"#;
        let err = serde_json::from_str::<ReportPeriod>(reversed).unwrap_err();
        assert!(err.to_string().contains("2025-01-15"));
    }
}
