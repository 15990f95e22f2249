//! Operational record types
//!
//! Explicit, tagged records for every data source the report pipeline reads.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Read-only snapshot of the project a report is produced for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    pub id: String,
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub client_name: String,
    #[serde(default)]
    pub budget: f64,
}

/// One daily activity (site log) entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub date: NaiveDate,
    #[serde(default)]
    pub weather: String,
    #[serde(default)]
    pub personnel_count: u32,
    #[serde(default)]
    pub activities_text: String,
    #[serde(default)]
    pub observations: Option<String>,
}

/// Outcome of a quality-control sample
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SampleStatus {
    Passed,
    Failed,
    #[default]
    Pending,
}

impl SampleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Pending => "pending",
        }
    }
}

impl std::fmt::Display for SampleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SampleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "passed" | "approved" | "ok" => Ok(Self::Passed),
            "failed" | "rejected" => Ok(Self::Failed),
            "pending" | "" => Ok(Self::Pending),
            other => Err(format!(
                "Unknown sample status: {}. Valid values: passed, failed, pending",
                other
            )),
        }
    }
}

/// One quality-control sample (concrete cylinder, soil density test, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualitySample {
    pub sample_number: String,
    #[serde(rename = "type")]
    pub sample_type: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub status: SampleStatus,
    #[serde(default)]
    pub result: Option<String>,
}

/// One photographic record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoRecord {
    pub url: String,
    pub taken_on: NaiveDate,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
}

/// Photographic evidence for a period: count plus item metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhotoSet {
    pub count: usize,
    pub items: Vec<PhotoRecord>,
}

impl PhotoSet {
    pub fn from_items(items: Vec<PhotoRecord>) -> Self {
        Self {
            count: items.len(),
            items,
        }
    }
}
