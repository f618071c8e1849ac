use crate::domain::model::{Precision, SolarTermSet};
use crate::domain::ports::{SolarTermProvider, SolarTermStore};
use crate::utils::error::{Result, SajuError};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    pub succeeded: Vec<i32>,
    pub failed: Vec<(i32, String)>,
}

impl BackfillReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Collects fetched term sets for a span of years into the store, a few
/// years at a time with a pause between groups.
pub struct BackfillJob {
    provider: Arc<dyn SolarTermProvider>,
    store: Arc<dyn SolarTermStore>,
    concurrent_requests: usize,
    inter_batch_delay: Duration,
    timeout: Duration,
}

impl BackfillJob {
    pub fn new(provider: Arc<dyn SolarTermProvider>, store: Arc<dyn SolarTermStore>) -> Self {
        Self {
            provider,
            store,
            concurrent_requests: 4,
            inter_batch_delay: Duration::from_millis(1000),
            timeout: Duration::from_millis(2000),
        }
    }

    pub fn with_concurrency(mut self, concurrent_requests: usize) -> Self {
        self.concurrent_requests = concurrent_requests.max(1);
        self
    }

    pub fn with_inter_batch_delay(mut self, delay: Duration) -> Self {
        self.inter_batch_delay = delay;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn collect_year(
        provider: Arc<dyn SolarTermProvider>,
        store: Arc<dyn SolarTermStore>,
        timeout: Duration,
        year: i32,
    ) -> Result<usize> {
        let records = tokio::time::timeout(timeout, provider.fetch_terms(year))
            .await
            .map_err(|_| SajuError::Timeout {
                operation: format!("{} terms for {}", provider.name(), year),
                millis: timeout.as_millis() as u64,
            })??;
        let set = SolarTermSet::new(year, records)?.with_precision(Precision::Fetched);
        store.upsert_terms(set.records()).await
    }

    /// A failing year is recorded and the rest of its group still runs.
    pub async fn run<I>(&self, years: I) -> BackfillReport
    where
        I: IntoIterator<Item = i32>,
    {
        let years: Vec<i32> = years.into_iter().collect();
        let mut report = BackfillReport::default();
        let batches: Vec<&[i32]> = years.chunks(self.concurrent_requests.max(1)).collect();

        for (index, batch) in batches.iter().enumerate() {
            let mut set = tokio::task::JoinSet::new();
            let mut task_years = HashMap::with_capacity(batch.len());
            for &year in batch.iter() {
                let provider = self.provider.clone();
                let store = self.store.clone();
                let timeout = self.timeout;
                let handle = set.spawn(async move {
                    (year, Self::collect_year(provider, store, timeout, year).await)
                });
                task_years.insert(handle.id(), year);
            }

            while let Some(joined) = set.join_next().await {
                match joined {
                    Ok((year, Ok(written))) => {
                        tracing::info!(year, written, "Backfilled solar terms");
                        report.succeeded.push(year);
                    }
                    Ok((year, Err(e))) => {
                        tracing::warn!(year, error = %e, "Backfill failed");
                        report.failed.push((year, e.to_string()));
                    }
                    Err(e) => match task_years.get(&e.id()) {
                        Some(&year) => {
                            tracing::error!(year, error = %e, "Backfill task panicked");
                            report.failed.push((year, format!("task failed: {}", e)));
                        }
                        None => tracing::error!(%e, "Backfill task panicked"),
                    },
                }
            }

            if index + 1 < batches.len() && !self.inter_batch_delay.is_zero() {
                tokio::time::sleep(self.inter_batch_delay).await;
            }
        }

        report.succeeded.sort_unstable();
        report.failed.sort_by_key(|(year, _)| *year);
        tracing::info!(
            "Backfill finished: {} succeeded, {} failed",
            report.succeeded.len(),
            report.failed.len()
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryStore;
    use crate::core::solar_terms::interpolate_terms;
    use crate::domain::model::SolarTermRecord;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakyProvider {
        fail_on: i32,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl SolarTermProvider for FlakyProvider {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn fetch_terms(&self, year: i32) -> Result<Vec<SolarTermRecord>> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if year == self.fail_on {
                return Err(SajuError::provider("flaky", "HTTP 503"));
            }
            Ok(interpolate_terms(year)?.into_records())
        }
    }

    #[tokio::test]
    async fn test_failed_year_does_not_abort_batch() {
        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(FlakyProvider {
            fail_on: 2001,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let job = BackfillJob::new(provider.clone(), store.clone())
            .with_concurrency(2)
            .with_inter_batch_delay(Duration::from_millis(1));

        let report = job.run(2000..=2004).await;
        assert_eq!(report.succeeded, vec![2000, 2002, 2003, 2004]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, 2001);
        assert!(!report.is_complete());
        assert!(provider.peak.load(Ordering::SeqCst) <= 2);

        assert_eq!(store.term_count().await, 4 * 24);
        let stored = store.load_terms(2003).await.unwrap();
        assert!(stored.iter().all(|r| r.precision == Precision::Fetched));
    }

    #[tokio::test]
    async fn test_panicking_year_is_reported_as_failed() {
        struct Panicky;

        #[async_trait]
        impl SolarTermProvider for Panicky {
            fn name(&self) -> &str {
                "panicky"
            }

            async fn fetch_terms(&self, year: i32) -> Result<Vec<SolarTermRecord>> {
                if year == 2011 {
                    panic!("malformed payload for {}", year);
                }
                Ok(interpolate_terms(year)?.into_records())
            }
        }

        let store = Arc::new(MemoryStore::new());
        let report = BackfillJob::new(Arc::new(Panicky), store.clone())
            .with_concurrency(3)
            .with_inter_batch_delay(Duration::ZERO)
            .run(2010..=2012)
            .await;
        assert_eq!(report.succeeded, vec![2010, 2012]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, 2011);
        assert!(report.failed[0].1.contains("panic"));
    }

    #[tokio::test]
    async fn test_incomplete_answer_is_a_failure() {
        struct Partial;

        #[async_trait]
        impl SolarTermProvider for Partial {
            fn name(&self) -> &str {
                "partial"
            }

            async fn fetch_terms(&self, year: i32) -> Result<Vec<SolarTermRecord>> {
                Ok(interpolate_terms(year)?.into_records().into_iter().take(10).collect())
            }
        }

        let store = Arc::new(MemoryStore::new());
        let report = BackfillJob::new(Arc::new(Partial), store.clone())
            .with_inter_batch_delay(Duration::ZERO)
            .run([1999])
            .await;
        assert!(report.succeeded.is_empty());
        assert!(report.failed[0].1.contains("incomplete"));
        assert_eq!(store.term_count().await, 0);
    }
}
