use crate::domain::model::{LunarDate, LunarSolarMapping};
use crate::domain::ports::{CalendarProvider, LunarSolarStore};
use crate::utils::error::{Result, SajuError};
use crate::utils::single_flight::KeyedLocks;
use chrono::NaiveDate;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ConversionKey {
    Solar(NaiveDate),
    Lunar(LunarDate),
}

/// Lunar/solar conversion: mapping table first, then each provider in order.
/// Provider answers are written back so the table fills in over time.
pub struct LunarSolarMapper {
    store: Arc<dyn LunarSolarStore>,
    providers: Vec<Arc<dyn CalendarProvider>>,
    timeout: Duration,
    locks: KeyedLocks<ConversionKey>,
}

impl LunarSolarMapper {
    pub fn new(
        store: Arc<dyn LunarSolarStore>,
        providers: Vec<Arc<dyn CalendarProvider>>,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            providers,
            timeout,
            locks: KeyedLocks::new(),
        }
    }

    pub async fn lunar_to_solar(&self, date: LunarDate) -> Result<LunarSolarMapping> {
        if let Some(hit) = self.store.find_by_lunar(date).await? {
            return Ok(hit);
        }
        let _guard = self.locks.acquire(&ConversionKey::Lunar(date)).await;
        if let Some(hit) = self.store.find_by_lunar(date).await? {
            return Ok(hit);
        }
        self.ask_providers(&date.to_string(), |p| p.lunar_to_solar(date))
            .await
    }

    pub async fn solar_to_lunar(&self, date: NaiveDate) -> Result<LunarSolarMapping> {
        if let Some(hit) = self.store.find_by_solar(date).await? {
            return Ok(hit);
        }
        let _guard = self.locks.acquire(&ConversionKey::Solar(date)).await;
        if let Some(hit) = self.store.find_by_solar(date).await? {
            return Ok(hit);
        }
        self.ask_providers(&date.to_string(), |p| p.solar_to_lunar(date))
            .await
    }

    /// Bulk-loads rows from an astronomical table.
    pub async fn import(&self, mappings: &[LunarSolarMapping]) -> Result<usize> {
        let written = self.store.upsert_mappings(mappings).await?;
        tracing::info!("Imported {} lunar/solar mappings", written);
        Ok(written)
    }

    async fn ask_providers<'a, F, Fut>(&'a self, label: &str, call: F) -> Result<LunarSolarMapping>
    where
        F: Fn(&'a Arc<dyn CalendarProvider>) -> Fut,
        Fut: Future<Output = Result<Option<LunarSolarMapping>>> + 'a,
    {
        for provider in &self.providers {
            match tokio::time::timeout(self.timeout, call(provider)).await {
                Ok(Ok(Some(mapping))) => {
                    tracing::debug!("{} converted {}", provider.name(), label);
                    if let Err(e) = self.store.upsert_mappings(&[mapping]).await {
                        tracing::warn!("Failed to cache mapping for {}: {}", label, e);
                    }
                    return Ok(mapping);
                }
                Ok(Ok(None)) => tracing::debug!("{} has no mapping for {}", provider.name(), label),
                Ok(Err(e)) => tracing::warn!("{} failed for {}: {}", provider.name(), label, e),
                Err(_) => tracing::warn!(
                    "{} timed out after {}ms for {}",
                    provider.name(),
                    self.timeout.as_millis(),
                    label
                ),
            }
        }
        Err(SajuError::ConversionUnavailable {
            date: label.to_string(),
        })
    }
}
