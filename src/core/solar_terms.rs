//! Tiered solar-term resolution.
//!
//! A year's 24 terms come from the first tier that answers, in order:
//! stored table, curated corrections, remote provider, interpolation. The
//! winning set is persisted unless it already came from the store, cached in
//! memory, and guarded by a per-year lock so concurrent misses fetch once.

use crate::domain::model::{Direction, Precision, SolarTermRecord, SolarTermSet};
use crate::domain::ports::{DaeunBoundary, SolarTermProvider, SolarTermStore};
use crate::domain::solar_term::SolarTerm;
use crate::utils::error::{Result, SajuError};
use crate::utils::single_flight::KeyedLocks;
use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Korean Standard Time, the wall clock of every embedded table.
pub const KST_OFFSET_MINUTES: i32 = 9 * 60;

/// Mean tropical year in seconds (365.2422 days).
const TROPICAL_YEAR_SECS: f64 = 365.2422 * 86_400.0;

const REFERENCE_YEAR: i32 = 2024;

/// 2024 terms, KST, 소한 first: (month, day, hour, minute).
const REFERENCE_TERMS: [(u32, u32, u32, u32); 24] = [
    (1, 5, 23, 49),
    (1, 20, 10, 7),
    (2, 4, 16, 27),
    (2, 19, 6, 13),
    (3, 5, 10, 23),
    (3, 20, 9, 6),
    (4, 4, 15, 2),
    (4, 20, 4, 27),
    (5, 5, 8, 10),
    (5, 20, 20, 59),
    (6, 5, 12, 10),
    (6, 21, 4, 51),
    (7, 6, 22, 20),
    (7, 22, 15, 44),
    (8, 7, 9, 11),
    (8, 23, 2, 55),
    (9, 7, 11, 11),
    (9, 22, 20, 44),
    (10, 8, 3, 56),
    (10, 23, 14, 15),
    (11, 7, 12, 20),
    (11, 22, 9, 56),
    (12, 7, 0, 17),
    (12, 21, 15, 21),
];

/// Hand-verified sets for years the provider gets wrong or lacks. KST, 소한 first.
const CURATED_TERMS: [(i32, [(u32, u32, u32, u32); 24]); 3] = [
    (
        1944,
        [
            (1, 6, 12, 0),
            (1, 21, 6, 0),
            (2, 5, 6, 0),
            (2, 20, 0, 0),
            (3, 6, 0, 0),
            (3, 21, 0, 0),
            (4, 5, 6, 0),
            (4, 20, 6, 0),
            (5, 5, 18, 0),
            (5, 21, 12, 0),
            (6, 6, 0, 0),
            (6, 21, 18, 0),
            (7, 7, 6, 0),
            (7, 23, 0, 0),
            (8, 7, 18, 0),
            (8, 23, 12, 0),
            (9, 8, 0, 0),
            (9, 23, 6, 0),
            (10, 8, 12, 0),
            (10, 24, 0, 0),
            (11, 8, 0, 0),
            (11, 22, 18, 0),
            (12, 7, 6, 0),
            (12, 22, 0, 0),
        ],
    ),
    (
        1957,
        [
            (1, 6, 5, 0),
            (1, 21, 0, 0),
            (2, 5, 0, 0),
            (2, 19, 18, 0),
            (3, 6, 18, 0),
            (3, 21, 18, 0),
            (4, 5, 23, 0),
            (4, 21, 0, 0),
            (5, 6, 12, 0),
            (5, 22, 6, 0),
            (6, 6, 18, 0),
            (6, 22, 12, 0),
            (7, 8, 0, 0),
            (7, 23, 18, 0),
            (8, 8, 12, 0),
            (8, 24, 6, 0),
            (9, 8, 18, 0),
            (9, 24, 0, 0),
            (10, 9, 6, 0),
            (10, 24, 18, 0),
            (11, 8, 18, 0),
            (11, 23, 12, 0),
            (12, 8, 0, 0),
            (12, 22, 18, 0),
        ],
    ),
    (
        1958,
        [
            (1, 6, 12, 0),
            (1, 20, 18, 0),
            (2, 4, 18, 0),
            (2, 19, 12, 0),
            (3, 6, 12, 0),
            (3, 21, 12, 0),
            (4, 5, 17, 0),
            (4, 20, 6, 0),
            (5, 5, 6, 0),
            (5, 20, 0, 0),
            (6, 5, 12, 0),
            (6, 21, 6, 0),
            (7, 7, 6, 0),
            (7, 23, 12, 0),
            (8, 8, 6, 0),
            (8, 23, 0, 0),
            (9, 8, 12, 0),
            (9, 23, 18, 0),
            (10, 9, 0, 0),
            (10, 24, 12, 0),
            (11, 8, 6, 0),
            (11, 22, 6, 0),
            (12, 7, 18, 0),
            (12, 22, 12, 0),
        ],
    ),
];

/// Converts a local wall-clock reading to UTC.
pub fn wall_clock_to_utc(local: NaiveDateTime, offset_minutes: i32) -> DateTime<Utc> {
    Utc.from_utc_datetime(&(local - Duration::minutes(offset_minutes as i64)))
}

pub fn utc_to_wall_clock(instant: DateTime<Utc>, offset_minutes: i32) -> NaiveDateTime {
    instant.naive_utc() + Duration::minutes(offset_minutes as i64)
}

fn kst_table_to_set(
    year: i32,
    table: &[(u32, u32, u32, u32); 24],
    precision: Precision,
) -> Result<SolarTermSet> {
    let mut records = Vec::with_capacity(24);
    for (term, &(month, day, hour, minute)) in SolarTerm::ALL.iter().zip(table.iter()) {
        let local = NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|d| d.and_hms_opt(hour, minute, 0))
            .ok_or_else(|| {
                SajuError::validation("term date", format!("{}-{}-{}", year, month, day), "not a calendar date")
            })?;
        records.push(SolarTermRecord {
            year,
            term: *term,
            timestamp: wall_clock_to_utc(local, KST_OFFSET_MINUTES),
            precision,
        });
    }
    SolarTermSet::new(year, records)
}

/// Projects the 2024 reference set by whole tropical years.
pub fn interpolate_terms(year: i32) -> Result<SolarTermSet> {
    let reference = kst_table_to_set(REFERENCE_YEAR, &REFERENCE_TERMS, Precision::Interpolated)?;
    let shift = Duration::seconds(((year - REFERENCE_YEAR) as f64 * TROPICAL_YEAR_SECS).round() as i64);
    let records = reference
        .into_records()
        .into_iter()
        .map(|r| SolarTermRecord {
            year,
            timestamp: r.timestamp + shift,
            ..r
        })
        .collect();
    SolarTermSet::new(year, records)
}

pub fn curated_terms(year: i32) -> Option<Result<SolarTermSet>> {
    CURATED_TERMS
        .iter()
        .find(|(y, _)| *y == year)
        .map(|(y, table)| kst_table_to_set(*y, table, Precision::Curated))
}

/// One resolution strategy. `Ok(None)` passes to the next tier; errors are
/// logged and also pass.
#[async_trait]
pub trait TermTier: Send + Sync {
    fn name(&self) -> &str;

    /// Whether a hit from this tier is written back to the store.
    fn persists(&self) -> bool {
        true
    }

    async fn resolve(&self, year: i32) -> Result<Option<SolarTermSet>>;
}

pub struct StoredTier {
    store: Arc<dyn SolarTermStore>,
}

impl StoredTier {
    pub fn new(store: Arc<dyn SolarTermStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl TermTier for StoredTier {
    fn name(&self) -> &str {
        "stored"
    }

    fn persists(&self) -> bool {
        false
    }

    async fn resolve(&self, year: i32) -> Result<Option<SolarTermSet>> {
        let records = self.store.load_terms(year).await?;
        if records.is_empty() {
            return Ok(None);
        }
        match SolarTermSet::new(year, records) {
            // A stored projection must not shadow the curated or fetched tiers.
            Ok(set) if set.precision() == Precision::Interpolated => Ok(None),
            Ok(set) => Ok(Some(set)),
            Err(e) => {
                tracing::debug!("Stored terms for {} unusable: {}", year, e);
                Ok(None)
            }
        }
    }
}

pub struct CuratedTier;

#[async_trait]
impl TermTier for CuratedTier {
    fn name(&self) -> &str {
        "curated"
    }

    async fn resolve(&self, year: i32) -> Result<Option<SolarTermSet>> {
        curated_terms(year).transpose()
    }
}

pub struct FetchedTier {
    provider: Arc<dyn SolarTermProvider>,
    timeout: std::time::Duration,
}

impl FetchedTier {
    pub fn new(provider: Arc<dyn SolarTermProvider>, timeout: std::time::Duration) -> Self {
        Self { provider, timeout }
    }
}

#[async_trait]
impl TermTier for FetchedTier {
    fn name(&self) -> &str {
        self.provider.name()
    }

    async fn resolve(&self, year: i32) -> Result<Option<SolarTermSet>> {
        let records = tokio::time::timeout(self.timeout, self.provider.fetch_terms(year))
            .await
            .map_err(|_| SajuError::Timeout {
                operation: format!("{} terms for {}", self.provider.name(), year),
                millis: self.timeout.as_millis() as u64,
            })??;
        let set = SolarTermSet::new(year, records)?.with_precision(Precision::Fetched);
        Ok(Some(set))
    }
}

pub struct InterpolatedTier;

#[async_trait]
impl TermTier for InterpolatedTier {
    fn name(&self) -> &str {
        "interpolated"
    }

    async fn resolve(&self, year: i32) -> Result<Option<SolarTermSet>> {
        interpolate_terms(year).map(Some)
    }
}

pub struct SolarTermResolver {
    tiers: Vec<Box<dyn TermTier>>,
    store: Option<Arc<dyn SolarTermStore>>,
    cache: RwLock<HashMap<i32, Arc<SolarTermSet>>>,
    locks: KeyedLocks<i32>,
    utc_offset_minutes: i32,
    min_year: i32,
    max_year: i32,
}

impl SolarTermResolver {
    /// `min_year..=max_year` is the supported birth range; one year either
    /// side is resolvable so boundary births can see neighbouring terms.
    pub fn new(
        tiers: Vec<Box<dyn TermTier>>,
        store: Option<Arc<dyn SolarTermStore>>,
        utc_offset_minutes: i32,
        min_year: i32,
        max_year: i32,
    ) -> Self {
        Self {
            tiers,
            store,
            cache: RwLock::new(HashMap::new()),
            locks: KeyedLocks::new(),
            utc_offset_minutes,
            min_year,
            max_year,
        }
    }

    /// Stored → curated → fetched (when a provider is given) → interpolated.
    pub fn standard(
        store: Option<Arc<dyn SolarTermStore>>,
        provider: Option<Arc<dyn SolarTermProvider>>,
        timeout: std::time::Duration,
        utc_offset_minutes: i32,
        min_year: i32,
        max_year: i32,
    ) -> Self {
        let mut tiers: Vec<Box<dyn TermTier>> = Vec::new();
        if let Some(store) = &store {
            tiers.push(Box::new(StoredTier::new(store.clone())));
        }
        tiers.push(Box::new(CuratedTier));
        if let Some(provider) = provider {
            tiers.push(Box::new(FetchedTier::new(provider, timeout)));
        }
        tiers.push(Box::new(InterpolatedTier));
        Self::new(tiers, store, utc_offset_minutes, min_year, max_year)
    }

    pub fn utc_offset_minutes(&self) -> i32 {
        self.utc_offset_minutes
    }

    pub async fn terms_for(&self, year: i32) -> Result<Arc<SolarTermSet>> {
        if year < self.min_year - 1 || year > self.max_year + 1 {
            return Err(SajuError::UnsupportedYear {
                year,
                min: self.min_year,
                max: self.max_year,
            });
        }
        if let Some(set) = self.cache.read().await.get(&year) {
            return Ok(set.clone());
        }

        let _guard = self.locks.acquire(&year).await;
        if let Some(set) = self.cache.read().await.get(&year) {
            return Ok(set.clone());
        }

        for tier in &self.tiers {
            match tier.resolve(year).await {
                Ok(Some(set)) => {
                    tracing::debug!(
                        "Terms for {} resolved by {} tier ({:?})",
                        year,
                        tier.name(),
                        set.precision()
                    );
                    if set.precision() == Precision::Interpolated {
                        tracing::info!("Using interpolated solar terms for {}", year);
                    }
                    if tier.persists() {
                        self.persist(&set).await;
                    }
                    let set = Arc::new(set);
                    self.cache.write().await.insert(year, set.clone());
                    return Ok(set);
                }
                Ok(None) => tracing::debug!("{} tier has no terms for {}", tier.name(), year),
                Err(e) => tracing::warn!("{} tier failed for {}: {}", tier.name(), year, e),
            }
        }

        Err(SajuError::IncompleteTermSet { year, found: 0 })
    }

    async fn persist(&self, set: &SolarTermSet) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(e) = store.upsert_terms(set.records()).await {
            tracing::warn!("Failed to persist terms for {}: {}", set.year(), e);
        }
    }

    /// Drops the cached set so the next lookup consults the tiers again.
    pub async fn invalidate(&self, year: i32) {
        self.cache.write().await.remove(&year);
    }

    fn local_year(&self, instant: DateTime<Utc>) -> i32 {
        utc_to_wall_clock(instant, self.utc_offset_minutes).year()
    }

    /// First match in the local year of `instant`, then in `neighbour`. Terms
    /// of one year all precede those of the next, so the neighbour is only
    /// loaded when the own year has nothing.
    async fn find_near<F>(&self, instant: DateTime<Utc>, neighbour: i32, pick: F) -> Result<SolarTermRecord>
    where
        F: Fn(&[SolarTermRecord]) -> Option<SolarTermRecord>,
    {
        let year = self.local_year(instant);
        if let Some(found) = pick(self.terms_for(year).await?.records()) {
            return Ok(found);
        }
        pick(self.terms_for(neighbour).await?.records()).ok_or(SajuError::IncompleteTermSet { year, found: 0 })
    }

    /// Nearest term strictly after (`Forward`) or strictly before
    /// (`Backward`) the instant, looking into the neighbouring year if needed.
    pub async fn adjacent_term(
        &self,
        instant: DateTime<Utc>,
        direction: Direction,
        boundary: DaeunBoundary,
    ) -> Result<SolarTermRecord> {
        let year = self.local_year(instant);
        let eligible = |r: &SolarTermRecord| match boundary {
            DaeunBoundary::MonthOpening => r.term.is_month_opening(),
            DaeunBoundary::AllTerms => true,
        };
        match direction {
            Direction::Forward => {
                self.find_near(instant, year + 1, |records| {
                    records
                        .iter()
                        .filter(|r| eligible(r) && r.timestamp > instant)
                        .min_by_key(|r| r.timestamp)
                        .copied()
                })
                .await
            }
            Direction::Backward => {
                self.find_near(instant, year - 1, |records| {
                    records
                        .iter()
                        .filter(|r| eligible(r) && r.timestamp < instant)
                        .max_by_key(|r| r.timestamp)
                        .copied()
                })
                .await
            }
        }
    }

    pub async fn adjacent_month_opening(
        &self,
        instant: DateTime<Utc>,
        direction: Direction,
    ) -> Result<SolarTermRecord> {
        self.adjacent_term(instant, direction, DaeunBoundary::MonthOpening)
            .await
    }

    /// Sexagenary month ordinal (寅 = 0) of an instant, with the term that
    /// opened that month. A birth exactly at a term belongs to the new month.
    pub async fn month_ordinal_at(&self, instant: DateTime<Utc>) -> Result<(usize, SolarTermRecord)> {
        let year = self.local_year(instant);
        let opening = self
            .find_near(instant, year - 1, |records| {
                records
                    .iter()
                    .filter(|r| r.term.is_month_opening() && r.timestamp <= instant)
                    .max_by_key(|r| r.timestamp)
                    .copied()
            })
            .await?;
        let ordinal = opening.term.month_ordinal().unwrap_or_default();
        Ok((ordinal, opening))
    }

    pub async fn start_of_spring(&self, year: i32) -> Result<SolarTermRecord> {
        Ok(*self.terms_for(year).await?.get(SolarTerm::StartOfSpring))
    }

    /// Year whose 입춘 most recently passed at `instant`.
    pub async fn sexagenary_year_at(&self, instant: DateTime<Utc>) -> Result<i32> {
        let year = self.local_year(instant);
        let spring = self.start_of_spring(year).await?;
        Ok(if instant < spring.timestamp { year - 1 } else { year })
    }

    /// Terms whose local date falls in the given civil month.
    pub async fn terms_in_month(&self, year: i32, month: u32) -> Result<Vec<SolarTermRecord>> {
        crate::utils::validation::validate_input_range("month", month, 1, 12)?;
        let set = self.terms_for(year).await?;
        Ok(set
            .records()
            .iter()
            .filter(|r| {
                let local = utc_to_wall_clock(r.timestamp, self.utc_offset_minutes);
                local.year() == year && local.month() == month
            })
            .copied()
            .collect())
    }
}
