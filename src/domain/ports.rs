use crate::domain::model::{LunarDate, LunarSolarMapping, Precision, SolarTermRecord};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Persisted solar-term table keyed by `(year, term)`.
#[async_trait]
pub trait SolarTermStore: Send + Sync {
    async fn load_terms(&self, year: i32) -> Result<Vec<SolarTermRecord>>;

    /// Returns the number of rows written. Implementations must apply
    /// [`SolarTermRecord::supersedes`] per row.
    async fn upsert_terms(&self, records: &[SolarTermRecord]) -> Result<usize>;
}

/// Persisted lunar/solar mapping table, addressable from either side.
#[async_trait]
pub trait LunarSolarStore: Send + Sync {
    async fn find_by_solar(&self, date: NaiveDate) -> Result<Option<LunarSolarMapping>>;
    async fn find_by_lunar(&self, date: LunarDate) -> Result<Option<LunarSolarMapping>>;
    async fn upsert_mappings(&self, mappings: &[LunarSolarMapping]) -> Result<usize>;
}

/// Remote source of one year's 24 terms.
#[async_trait]
pub trait SolarTermProvider: Send + Sync {
    fn name(&self) -> &str;
    async fn fetch_terms(&self, year: i32) -> Result<Vec<SolarTermRecord>>;
}

/// Remote lunar/solar conversion service. `Ok(None)` means the provider
/// answered but has no such date.
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    fn name(&self) -> &str;
    async fn lunar_to_solar(&self, date: LunarDate) -> Result<Option<LunarSolarMapping>>;
    async fn solar_to_lunar(&self, date: NaiveDate) -> Result<Option<LunarSolarMapping>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DaeunBoundary {
    /// Only the 12 month-opening terms count as the adjacent term.
    #[default]
    MonthOpening,
    AllTerms,
}

pub trait ConfigProvider: Send + Sync {
    fn min_year(&self) -> i32;
    fn max_year(&self) -> i32;
    /// Offset of birth wall-clock times from UTC.
    fn utc_offset_minutes(&self) -> i32;
    fn hour_shift_minutes(&self) -> i32;
    fn provider_timeout_ms(&self) -> u64;
    fn daeun_boundary(&self) -> DaeunBoundary;
}

impl SolarTermRecord {
    /// Whether this record may overwrite `existing` for the same `(year, term)`.
    /// Precision only moves upward; equal precision rewrites in place.
    pub fn supersedes(&self, existing: &SolarTermRecord) -> bool {
        self.precision >= existing.precision
    }

    pub fn is_interpolated(&self) -> bool {
        self.precision == Precision::Interpolated
    }
}
