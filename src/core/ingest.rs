//! Bulk import of astronomical tables into the stores.
//!
//! Solar-term tables carry one term per row:
//! `year,term_index,term_name_kr,term_name_zh,ecliptic_longitude_deg,utc_time,local_time`.
//! Lunar/solar tables carry one day per row:
//! `greg_year,greg_month,greg_day,lunar_year,lunar_month,lunar_day,is_leap_month`.
//! Imported rows are authoritative and tagged [`Precision::Exact`].

use crate::core::solar_terms::{wall_clock_to_utc, KST_OFFSET_MINUTES};
use crate::domain::model::{LunarDate, LunarSolarMapping, Precision, SolarTermRecord};
use crate::domain::ports::{LunarSolarStore, SolarTermStore};
use crate::domain::solar_term::SolarTerm;
use crate::utils::error::{Result, SajuError};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io::Read;

/// Fixed shift for tables whose local times were recorded against a
/// different standard meridian (UTC+8:30 in Korea, 1954–1961).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeridianCorrection {
    pub from_year: i32,
    pub to_year: i32,
    pub minutes: i32,
}

impl Default for MeridianCorrection {
    fn default() -> Self {
        Self {
            from_year: 1954,
            to_year: 1961,
            minutes: 30,
        }
    }
}

impl MeridianCorrection {
    pub fn none() -> Self {
        Self {
            from_year: 0,
            to_year: -1,
            minutes: 0,
        }
    }

    pub fn applies_to(&self, year: i32) -> bool {
        (self.from_year..=self.to_year).contains(&year)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub rows_read: usize,
    pub written: usize,
    /// `(line, reason)` for each row that could not be used.
    pub skipped: Vec<(u64, String)>,
    pub years: BTreeSet<i32>,
}

#[derive(Debug, Deserialize)]
struct TermRow {
    year: i32,
    #[serde(default)]
    term_name_kr: Option<String>,
    #[serde(default)]
    term_name_zh: Option<String>,
    #[serde(default)]
    ecliptic_longitude_deg: Option<f64>,
    #[serde(default)]
    utc_time: Option<String>,
    #[serde(default)]
    local_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LunarRow {
    greg_year: i32,
    greg_month: u32,
    greg_day: u32,
    lunar_year: i32,
    lunar_month: u32,
    lunar_day: u32,
    is_leap_month: String,
}

/// Ecliptic longitude to term: 소한 sits at 285°, one term per 15°.
fn term_from_longitude(degrees: f64) -> SolarTerm {
    let steps = ((degrees - 285.0) / 15.0).round() as i64;
    SolarTerm::from_index(steps.rem_euclid(24) as usize)
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl TermRow {
    fn term(&self) -> Result<SolarTerm> {
        if let Some(name) = non_empty(&self.term_name_kr).or(non_empty(&self.term_name_zh)) {
            return SolarTerm::from_name(name);
        }
        self.ecliptic_longitude_deg
            .map(term_from_longitude)
            .ok_or_else(|| SajuError::validation("term", "", "row has no term name or longitude"))
    }

    /// Local time wins over UTC. Only local time receives the meridian
    /// correction.
    fn timestamp(&self, correction: &MeridianCorrection) -> Result<DateTime<Utc>> {
        if let Some(raw) = non_empty(&self.local_time) {
            let mut local = parse_timestamp(raw)
                .ok_or_else(|| SajuError::validation("local_time", raw, "unrecognized timestamp"))?;
            if correction.applies_to(self.year) {
                local += Duration::minutes(correction.minutes as i64);
            }
            return Ok(wall_clock_to_utc(local, KST_OFFSET_MINUTES));
        }
        let raw = non_empty(&self.utc_time)
            .ok_or_else(|| SajuError::validation("utc_time", "", "row has no timestamp"))?;
        parse_timestamp(raw)
            .map(|naive| naive.and_utc())
            .ok_or_else(|| SajuError::validation("utc_time", raw, "unrecognized timestamp"))
    }
}

fn parse_leap_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "y" | "yes" | "윤" | "leap" => Ok(true),
        "0" | "false" | "n" | "no" | "평" | "" => Ok(false),
        other => Err(SajuError::validation("is_leap_month", other, "expected a boolean flag")),
    }
}

impl LunarRow {
    fn mapping(&self) -> Result<LunarSolarMapping> {
        let solar = NaiveDate::from_ymd_opt(self.greg_year, self.greg_month, self.greg_day)
            .ok_or_else(|| {
                SajuError::validation(
                    "solar date",
                    format!("{}-{}-{}", self.greg_year, self.greg_month, self.greg_day),
                    "not a calendar date",
                )
            })?;
        if !(1..=12).contains(&self.lunar_month) || !(1..=30).contains(&self.lunar_day) {
            return Err(SajuError::validation(
                "lunar date",
                format!("{}-{}-{}", self.lunar_year, self.lunar_month, self.lunar_day),
                "month must be 1-12 and day 1-30",
            ));
        }
        Ok(LunarSolarMapping {
            solar,
            lunar: LunarDate {
                year: self.lunar_year,
                month: self.lunar_month,
                day: self.lunar_day,
                is_leap_month: parse_leap_flag(&self.is_leap_month)?,
            },
        })
    }
}

fn line_of(record: &csv::StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or_default()
}

/// Reads rows with `convert`, collecting failures instead of aborting.
fn read_rows<R, Row, T, F>(reader: R, report: &mut IngestReport, convert: F) -> Result<Vec<T>>
where
    R: Read,
    Row: for<'de> Deserialize<'de>,
    F: Fn(&Row) -> Result<T>,
{
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let headers = csv_reader.headers()?.clone();

    let mut out = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        report.rows_read += 1;
        let line = line_of(&record);
        let converted = record
            .deserialize::<Row>(Some(&headers))
            .map_err(SajuError::from)
            .and_then(|row| convert(&row));
        match converted {
            Ok(value) => out.push(value),
            Err(e) => {
                tracing::warn!("Skipping line {}: {}", line, e);
                report.skipped.push((line, e.to_string()));
            }
        }
    }
    Ok(out)
}

pub async fn import_solar_terms_csv<R: Read>(
    reader: R,
    store: &dyn SolarTermStore,
    correction: MeridianCorrection,
) -> Result<IngestReport> {
    let mut report = IngestReport::default();
    let records = read_rows(reader, &mut report, |row: &TermRow| {
        Ok(SolarTermRecord {
            year: row.year,
            term: row.term()?,
            timestamp: row.timestamp(&correction)?,
            precision: Precision::Exact,
        })
    })?;

    report.years = records.iter().map(|r| r.year).collect();
    report.written = store.upsert_terms(&records).await?;
    tracing::info!(
        "Imported {} solar-term rows for {} years ({} skipped)",
        report.written,
        report.years.len(),
        report.skipped.len()
    );
    Ok(report)
}

pub async fn import_lunar_solar_csv<R: Read>(
    reader: R,
    store: &dyn LunarSolarStore,
) -> Result<IngestReport> {
    let mut report = IngestReport::default();
    let mappings = read_rows(reader, &mut report, LunarRow::mapping)?;

    report.years = mappings.iter().map(LunarSolarMapping::solar_year).collect();
    report.written = store.upsert_mappings(&mappings).await?;
    tracing::info!(
        "Imported {} lunar/solar rows ({} skipped)",
        report.written,
        report.skipped.len()
    );
    Ok(report)
}
