use crate::domain::model::{LunarDate, LunarSolarMapping, SolarTermRecord};
use crate::domain::ports::{LunarSolarStore, SolarTermStore};
use crate::domain::solar_term::SolarTerm;
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// In-process store for both tables. Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    terms: Arc<Mutex<HashMap<(i32, SolarTerm), SolarTermRecord>>>,
    by_solar: Arc<Mutex<HashMap<NaiveDate, LunarSolarMapping>>>,
    by_lunar: Arc<Mutex<HashMap<LunarDate, LunarSolarMapping>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn term_count(&self) -> usize {
        self.terms.lock().await.len()
    }

    pub async fn mapping_count(&self) -> usize {
        self.by_solar.lock().await.len()
    }
}

/// Shared upsert rule for term tables: insert when absent, replace only when
/// the incoming record does not lower the precision.
pub(crate) fn upsert_term_rows(
    table: &mut HashMap<(i32, SolarTerm), SolarTermRecord>,
    records: &[SolarTermRecord],
) -> usize {
    let mut written = 0;
    for record in records {
        let key = (record.year, record.term);
        let replace = table
            .get(&key)
            .map_or(true, |existing| record.supersedes(existing));
        if replace {
            table.insert(key, *record);
            written += 1;
        }
    }
    written
}

#[async_trait]
impl SolarTermStore for MemoryStore {
    async fn load_terms(&self, year: i32) -> Result<Vec<SolarTermRecord>> {
        let terms = self.terms.lock().await;
        let mut records: Vec<_> = terms
            .values()
            .filter(|r| r.year == year)
            .copied()
            .collect();
        records.sort_by_key(|r| r.term);
        Ok(records)
    }

    async fn upsert_terms(&self, records: &[SolarTermRecord]) -> Result<usize> {
        let mut terms = self.terms.lock().await;
        Ok(upsert_term_rows(&mut terms, records))
    }
}

#[async_trait]
impl LunarSolarStore for MemoryStore {
    async fn find_by_solar(&self, date: NaiveDate) -> Result<Option<LunarSolarMapping>> {
        Ok(self.by_solar.lock().await.get(&date).copied())
    }

    async fn find_by_lunar(&self, date: LunarDate) -> Result<Option<LunarSolarMapping>> {
        Ok(self.by_lunar.lock().await.get(&date).copied())
    }

    async fn upsert_mappings(&self, mappings: &[LunarSolarMapping]) -> Result<usize> {
        let mut by_solar = self.by_solar.lock().await;
        let mut by_lunar = self.by_lunar.lock().await;
        for m in mappings {
            by_solar.insert(m.solar, *m);
            by_lunar.insert(m.lunar, *m);
        }
        Ok(mappings.len())
    }
}
