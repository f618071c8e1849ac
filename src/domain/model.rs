use crate::domain::ganji::{Branch, Element, Pillar};
use crate::domain::solar_term::SolarTerm;
use crate::utils::error::{Result, SajuError};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarSystem {
    Solar,
    Lunar,
    LunarLeap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

/// Birth time as entered: a wall-clock time, a two-hour period code, or nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BirthTime {
    Clock { hour: u32, minute: u32 },
    Period(Branch),
    Unknown,
}

/// Direct stem/branch entry per pillar ("I already know my chart").
/// Tokens are parsed when the chart is resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PillarOverrides {
    pub year: Option<String>,
    pub month: Option<String>,
    pub day: Option<String>,
    pub hour: Option<String>,
}

impl PillarOverrides {
    pub fn is_empty(&self) -> bool {
        self.year.is_none() && self.month.is_none() && self.day.is_none() && self.hour.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BirthInput {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub time: BirthTime,
    pub calendar: CalendarSystem,
    pub gender: Gender,
    #[serde(default)]
    pub overrides: PillarOverrides,
}

impl BirthInput {
    pub fn solar(year: i32, month: u32, day: u32, time: BirthTime, gender: Gender) -> Self {
        Self {
            year,
            month,
            day,
            time,
            calendar: CalendarSystem::Solar,
            gender,
            overrides: PillarOverrides::default(),
        }
    }
}

/// Source quality of a solar-term timestamp. Ordered so that a higher value
/// may replace a lower one, never the reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    Interpolated,
    Fetched,
    Curated,
    Exact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolarTermRecord {
    pub year: i32,
    pub term: SolarTerm,
    pub timestamp: DateTime<Utc>,
    pub precision: Precision,
}

/// All 24 terms of one calendar year, ordered by term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolarTermSet {
    year: i32,
    records: Vec<SolarTermRecord>,
}

impl SolarTermSet {
    pub fn new(year: i32, mut records: Vec<SolarTermRecord>) -> Result<Self> {
        records.retain(|r| r.year == year);
        records.sort_by_key(|r| r.term);
        records.dedup_by_key(|r| r.term);
        if records.len() != 24 {
            return Err(SajuError::IncompleteTermSet {
                year,
                found: records.len(),
            });
        }
        Ok(Self { year, records })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn records(&self) -> &[SolarTermRecord] {
        &self.records
    }

    pub fn get(&self, term: SolarTerm) -> &SolarTermRecord {
        &self.records[term.index()]
    }

    /// Lowest precision present in the set.
    pub fn precision(&self) -> Precision {
        self.records
            .iter()
            .map(|r| r.precision)
            .min()
            .unwrap_or(Precision::Interpolated)
    }

    pub fn with_precision(mut self, precision: Precision) -> Self {
        for r in &mut self.records {
            r.precision = precision;
        }
        self
    }

    pub fn into_records(self) -> Vec<SolarTermRecord> {
        self.records
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LunarDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub is_leap_month: bool,
}

impl std::fmt::Display for LunarDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}{}",
            self.year,
            self.month,
            self.day,
            if self.is_leap_month { " (leap)" } else { "" }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LunarSolarMapping {
    pub solar: NaiveDate,
    pub lunar: LunarDate,
}

impl LunarSolarMapping {
    pub fn solar_year(&self) -> i32 {
        self.solar.year()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    pub fn step(self) -> i64 {
        match self {
            Direction::Forward => 1,
            Direction::Backward => -1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FourPillars {
    pub year: Pillar,
    pub month: Pillar,
    pub day: Pillar,
    pub hour: Option<Pillar>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PillarElements {
    pub stem: Element,
    pub branch: Element,
}

impl From<Pillar> for PillarElements {
    fn from(p: Pillar) -> Self {
        Self {
            stem: p.stem().element(),
            branch: p.branch().element(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartElements {
    pub year: PillarElements,
    pub month: PillarElements,
    pub day: PillarElements,
    pub hour: Option<PillarElements>,
    pub tally: BTreeMap<Element, usize>,
}

impl From<&FourPillars> for ChartElements {
    fn from(p: &FourPillars) -> Self {
        let mut tally: BTreeMap<Element, usize> = Element::ALL.iter().map(|e| (*e, 0)).collect();
        let limbs = [Some(p.year), Some(p.month), Some(p.day), p.hour];
        for pillar in limbs.into_iter().flatten() {
            *tally.entry(pillar.stem().element()).or_default() += 1;
            *tally.entry(pillar.branch().element()).or_default() += 1;
        }
        Self {
            year: p.year.into(),
            month: p.month.into(),
            day: p.day.into(),
            hour: p.hour.map(Into::into),
            tally,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chart {
    pub input: BirthInput,
    pub solar_date: NaiveDate,
    pub lunar_date: Option<LunarDate>,
    /// Instant used for term comparisons; noon local time when the birth time is unknown.
    pub moment: DateTime<Utc>,
    pub pillars: FourPillars,
    pub elements: ChartElements,
    /// Precision of the term set that placed the year/month boundaries.
    pub term_precision: Precision,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaeunPeriod {
    pub index: usize,
    pub start_age: u32,
    pub end_age: u32,
    pub pillar: Pillar,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaeunTable {
    pub direction: Direction,
    pub starting_number: u32,
    pub boundary_term: SolarTerm,
    pub boundary_at: DateTime<Utc>,
    pub days_to_boundary: i64,
    pub boundary_precision: Precision,
    pub periods: Vec<DaeunPeriod>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaeunEntry {
    pub age: i32,
    pub year: i32,
    pub pillar: Pillar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WolunEntry {
    pub month_ordinal: usize,
    /// Sexagenary year the month belongs to (ordinal 12 spills into the next one).
    pub year: i32,
    pub pillar: Pillar,
}
