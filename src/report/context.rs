//! Shared data vocabulary
//!
//! Locale formatting, per-record field lookup, and the fixed-format text blocks
//! that describe a [`PeriodDataSet`]. The resolver and the generator both go
//! through this module so every section describes data identically.

use chrono::NaiveDate;

use super::collector::PeriodDataSet;
use crate::constants::locale;
use crate::types::{ActivityEntry, DataSourceName, PhotoRecord, ProjectSnapshot, QualitySample};

// =============================================================================
// Values and Locale Formatting
// =============================================================================

/// A typed value that renders through the fixed locale convention
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Decimal(f64),
    Currency(f64),
    Percent(f64),
    Date(NaiveDate),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn count(value: usize) -> Self {
        Self::Integer(value as i64)
    }

    pub fn render(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Integer(n) => n.to_string(),
            Self::Decimal(v) => format_decimal(*v),
            Self::Currency(v) => format_currency(*v),
            Self::Percent(v) => format_percent(*v),
            Self::Date(d) => format_date(*d),
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(locale::DATE_FORMAT).to_string()
}

/// One decimal place with the locale decimal separator (`8,7`)
pub fn format_decimal(value: f64) -> String {
    format!("{:.1}", value).replace('.', &locale::DECIMAL_SEPARATOR.to_string())
}

/// Grouped thousands, no decimals (`$1.250.000`)
pub fn format_currency(value: f64) -> String {
    let rounded = value.round() as i64;
    let sign = if rounded < 0 { "-" } else { "" };
    format!(
        "{}{}{}",
        sign,
        locale::CURRENCY_SYMBOL,
        group_thousands(rounded.unsigned_abs())
    )
}

pub fn format_percent(value: f64) -> String {
    format!("{}%", format_decimal(value))
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(locale::THOUSANDS_SEPARATOR);
        }
        out.push(c);
    }
    out
}

// =============================================================================
// Field Lookup
// =============================================================================

/// Named field access over an explicit record schema
pub trait FieldLookup {
    fn field(&self, name: &str) -> Option<FieldValue>;
}

impl FieldLookup for ProjectSnapshot {
    fn field(&self, name: &str) -> Option<FieldValue> {
        Some(match name {
            "id" => FieldValue::text(&self.id),
            "name" => FieldValue::text(&self.name),
            "code" => FieldValue::text(&self.code),
            "address" => FieldValue::text(&self.address),
            "client" | "client_name" => FieldValue::text(&self.client_name),
            "budget" => FieldValue::Currency(self.budget),
            _ => return None,
        })
    }
}

impl FieldLookup for ActivityEntry {
    fn field(&self, name: &str) -> Option<FieldValue> {
        Some(match name {
            "date" => FieldValue::Date(self.date),
            "weather" => FieldValue::text(&self.weather),
            "personnel" | "personnel_count" => FieldValue::Integer(i64::from(self.personnel_count)),
            "activities" | "activities_text" => FieldValue::text(&self.activities_text),
            "observations" => FieldValue::text(self.observations.clone().unwrap_or_default()),
            _ => return None,
        })
    }
}

impl FieldLookup for QualitySample {
    fn field(&self, name: &str) -> Option<FieldValue> {
        Some(match name {
            "sample_number" | "number" => FieldValue::text(&self.sample_number),
            "type" | "sample_type" => FieldValue::text(&self.sample_type),
            "date" => FieldValue::Date(self.date),
            "location" => FieldValue::text(&self.location),
            "status" => FieldValue::text(self.status.as_str()),
            "result" => FieldValue::text(self.result.clone().unwrap_or_default()),
            _ => return None,
        })
    }
}

impl FieldLookup for PhotoRecord {
    fn field(&self, name: &str) -> Option<FieldValue> {
        Some(match name {
            "url" => FieldValue::text(&self.url),
            "date" | "taken_on" => FieldValue::Date(self.taken_on),
            "tag" => FieldValue::text(self.tag.clone().unwrap_or_default()),
            "caption" => FieldValue::text(self.caption.clone().unwrap_or_default()),
            _ => return None,
        })
    }
}

// =============================================================================
// Context Blocks
// =============================================================================

/// Heading plus items of one source's block; `None` when the source has no data
fn block_parts(source: DataSourceName, data: &PeriodDataSet) -> Option<(String, Vec<String>)> {
    match source {
        DataSourceName::Project => {
            let project = data.project();
            let period = data.period();
            let mut items = vec![
                format!("Name: {}", project.name),
                format!("Code: {}", project.code),
            ];
            if !project.address.is_empty() {
                items.push(format!("Address: {}", project.address));
            }
            if !project.client_name.is_empty() {
                items.push(format!("Client: {}", project.client_name));
            }
            items.push(format!("Budget: {}", format_currency(project.budget)));
            items.push(format!(
                "Period: {} - {} ({} days)",
                format_date(period.start()),
                format_date(period.end()),
                period.days()
            ));
            Some(("== Project ==".to_string(), items))
        }
        DataSourceName::DailyLogs => {
            let logs = data.daily_logs();
            if logs.is_empty() {
                return None;
            }
            let items = logs.iter().map(activity_item).collect();
            Some((format!("== Daily Activity ({} entries) ==", logs.len()), items))
        }
        DataSourceName::QualitySamples => {
            let samples = data.quality_samples();
            if samples.is_empty() {
                return None;
            }
            let items = samples.iter().map(sample_item).collect();
            Some((format!("== Quality Samples ({}) ==", samples.len()), items))
        }
        DataSourceName::Photos => {
            let photos = data.photos();
            if photos.count == 0 {
                return None;
            }
            let items = photos.items.iter().map(photo_item).collect();
            Some((
                format!("== Photographic Record ({} photos) ==", photos.count),
                items,
            ))
        }
        DataSourceName::Summary => {
            let s = data.summary();
            let mut items = vec![
                format!("Entries: {}", s.total_entries),
                format!("Days with activity: {}", s.days_with_activity),
                format!("Personnel-days: {}", s.personnel_days),
                format!("Average personnel: {}", format_decimal(s.average_personnel)),
                format!(
                    "Samples: {} (passed {}, failed {}, pending {})",
                    s.samples_total, s.samples_passed, s.samples_failed, s.samples_pending
                ),
                format!("Pass rate: {}", format_percent(s.sample_pass_rate)),
                format!("Photos: {}", s.photo_count),
            ];
            if !s.weather_days.is_empty() {
                items.push(format!("Weather: {}", weather_breakdown(data)));
            }
            Some(("== Period Summary ==".to_string(), items))
        }
    }
}

fn activity_item(entry: &ActivityEntry) -> String {
    let mut item = format!(
        "- {} | Weather: {} | Personnel: {}\n  Activities: {}",
        format_date(entry.date),
        if entry.weather.is_empty() {
            "n/a"
        } else {
            entry.weather.as_str()
        },
        entry.personnel_count,
        entry.activities_text.trim()
    );
    if let Some(observations) = entry.observations.as_deref()
        && !observations.trim().is_empty()
    {
        item.push_str("\n  Observations: ");
        item.push_str(observations.trim());
    }
    item
}

fn sample_item(sample: &QualitySample) -> String {
    let mut item = format!(
        "- {} | {} | {} | {} | {}",
        sample.sample_number,
        sample.sample_type,
        format_date(sample.date),
        sample.location,
        sample.status
    );
    if let Some(result) = sample.result.as_deref()
        && !result.is_empty()
    {
        item.push_str(" | Result: ");
        item.push_str(result);
    }
    item
}

fn photo_item(photo: &PhotoRecord) -> String {
    let mut item = format!("- {}", format_date(photo.taken_on));
    for part in [&photo.tag, &photo.caption].into_iter().flatten() {
        item.push_str(" | ");
        item.push_str(part);
    }
    item
}

/// `Rain 1, Sunny 2` in condition order
pub fn weather_breakdown(data: &PeriodDataSet) -> String {
    data.summary()
        .weather_days
        .iter()
        .map(|(condition, days)| format!("{} {}", condition, days))
        .collect::<Vec<_>>()
        .join(", ")
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Render one block, keeping whole items while they fit in `budget` characters
fn render_block_within(source: DataSourceName, data: &PeriodDataSet, budget: usize) -> Option<String> {
    let (heading, items) = block_parts(source, data)?;

    let mut out = heading;
    let mut used = char_len(&out);
    let mut kept = 0;
    for item in &items {
        let cost = char_len(item) + 1;
        if used + cost > budget {
            break;
        }
        out.push('\n');
        out.push_str(item);
        used += cost;
        kept += 1;
    }
    if kept < items.len() {
        out.push_str(&format!("\n(+{} more omitted)", items.len() - kept));
    }
    Some(out)
}

/// Fixed-format block for one data source, `None` when it has nothing to show
pub fn render_block(source: DataSourceName, data: &PeriodDataSet) -> Option<String> {
    render_block_within(source, data, usize::MAX)
}

/// Concatenate the blocks of `sources` (first occurrence order), bounded to
/// `max_chars` characters. Sources without data contribute nothing.
pub fn render_context(sources: &[DataSourceName], data: &PeriodDataSet, max_chars: usize) -> String {
    const SEPARATOR: &str = "\n\n";

    let mut seen: Vec<DataSourceName> = Vec::with_capacity(sources.len());
    let mut out = String::new();

    for source in sources {
        if seen.contains(source) {
            continue;
        }
        seen.push(*source);

        let prefix = if out.is_empty() { 0 } else { SEPARATOR.len() };
        let remaining = max_chars.saturating_sub(char_len(&out) + prefix);
        if remaining == 0 {
            break;
        }
        if let Some(block) = render_block_within(*source, data, remaining) {
            if !out.is_empty() {
                out.push_str(SEPARATOR);
            }
            out.push_str(&block);
        }
    }

    if char_len(&out) > max_chars {
        out = out.chars().take(max_chars).collect();
    }
    out
}
