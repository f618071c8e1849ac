use crate::adapters::memory::upsert_term_rows;
use crate::domain::model::{LunarDate, LunarSolarMapping, SolarTermRecord};
use crate::domain::ports::{LunarSolarStore, SolarTermStore};
use crate::domain::solar_term::SolarTerm;
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    solar_terms: Vec<SolarTermRecord>,
    #[serde(default)]
    lunar_solar: Vec<LunarSolarMapping>,
}

#[derive(Debug, Default, Clone)]
struct Tables {
    terms: HashMap<(i32, SolarTerm), SolarTermRecord>,
    mappings: HashMap<NaiveDate, LunarSolarMapping>,
}

/// Both tables in one JSON document, loaded on open and rewritten after
/// every upsert that changes something. Memory only takes the change once
/// the file has been written.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    tables: RwLock<Tables>,
}

impl FileStore {
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let snapshot = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => Snapshot::default(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Snapshot::default(),
            Err(e) => return Err(e.into()),
        };

        let mut tables = Tables::default();
        upsert_term_rows(&mut tables.terms, &snapshot.solar_terms);
        for m in snapshot.lunar_solar {
            tables.mappings.insert(m.solar, m);
        }
        tracing::debug!(
            "Opened {} ({} terms, {} mappings)",
            path.display(),
            tables.terms.len(),
            tables.mappings.len()
        );

        Ok(Self {
            path,
            tables: RwLock::new(tables),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn flush(&self, tables: &Tables) -> Result<()> {
        let mut solar_terms: Vec<_> = tables.terms.values().copied().collect();
        solar_terms.sort_by_key(|r| (r.year, r.term));
        let mut lunar_solar: Vec<_> = tables.mappings.values().copied().collect();
        lunar_solar.sort_by_key(|m| m.solar);
        let data = serde_json::to_vec_pretty(&Snapshot {
            solar_terms,
            lunar_solar,
        })?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, data).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl SolarTermStore for FileStore {
    async fn load_terms(&self, year: i32) -> Result<Vec<SolarTermRecord>> {
        let tables = self.tables.read().await;
        let mut records: Vec<_> = tables
            .terms
            .values()
            .filter(|r| r.year == year)
            .copied()
            .collect();
        records.sort_by_key(|r| r.term);
        Ok(records)
    }

    async fn upsert_terms(&self, records: &[SolarTermRecord]) -> Result<usize> {
        let mut tables = self.tables.write().await;
        let mut next = tables.clone();
        let written = upsert_term_rows(&mut next.terms, records);
        if written > 0 {
            self.flush(&next).await?;
            *tables = next;
        }
        Ok(written)
    }
}

#[async_trait]
impl LunarSolarStore for FileStore {
    async fn find_by_solar(&self, date: NaiveDate) -> Result<Option<LunarSolarMapping>> {
        Ok(self.tables.read().await.mappings.get(&date).copied())
    }

    async fn find_by_lunar(&self, date: LunarDate) -> Result<Option<LunarSolarMapping>> {
        Ok(self
            .tables
            .read()
            .await
            .mappings
            .values()
            .find(|m| m.lunar == date)
            .copied())
    }

    async fn upsert_mappings(&self, mappings: &[LunarSolarMapping]) -> Result<usize> {
        let mut tables = self.tables.write().await;
        let mut next = tables.clone();
        let mut written = 0;
        for m in mappings {
            if next.mappings.insert(m.solar, *m) != Some(*m) {
                written += 1;
            }
        }
        if written > 0 {
            self.flush(&next).await?;
            *tables = next;
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Precision;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_rows_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tables").join("saju.json");

        let store = FileStore::open(&path).await.unwrap();
        let record = SolarTermRecord {
            year: 1988,
            term: SolarTerm::StartOfSpring,
            timestamp: Utc.with_ymd_and_hms(1988, 2, 4, 14, 43, 0).unwrap(),
            precision: Precision::Exact,
        };
        assert_eq!(store.upsert_terms(&[record]).await.unwrap(), 1);
        let mapping = LunarSolarMapping {
            solar: NaiveDate::from_ymd_opt(1988, 2, 17).unwrap(),
            lunar: LunarDate {
                year: 1988,
                month: 1,
                day: 1,
                is_leap_month: false,
            },
        };
        store.upsert_mappings(&[mapping]).await.unwrap();
        drop(store);

        let reopened = FileStore::open(&path).await.unwrap();
        assert_eq!(reopened.load_terms(1988).await.unwrap(), vec![record]);
        assert_eq!(
            reopened.find_by_lunar(mapping.lunar).await.unwrap(),
            Some(mapping)
        );
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_store() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path().join("absent.json")).await.unwrap();
        assert!(store.load_terms(2000).await.unwrap().is_empty());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_repeated_mapping_is_not_rewritten() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path().join("m.json")).await.unwrap();
        let mapping = LunarSolarMapping {
            solar: NaiveDate::from_ymd_opt(2000, 2, 5).unwrap(),
            lunar: LunarDate {
                year: 2000,
                month: 1,
                day: 1,
                is_leap_month: false,
            },
        };
        assert_eq!(store.upsert_mappings(&[mapping]).await.unwrap(), 1);
        assert_eq!(store.upsert_mappings(&[mapping]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_tables_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tables.json");
        let store = FileStore::open(&path).await.unwrap();

        // A non-empty directory where the file should go makes the rename fail.
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), b"x").unwrap();

        let record = SolarTermRecord {
            year: 1988,
            term: SolarTerm::StartOfSpring,
            timestamp: Utc.with_ymd_and_hms(1988, 2, 4, 14, 43, 0).unwrap(),
            precision: Precision::Exact,
        };
        assert!(store.upsert_terms(&[record]).await.is_err());
        assert!(store.load_terms(1988).await.unwrap().is_empty());

        let mapping = LunarSolarMapping {
            solar: NaiveDate::from_ymd_opt(1988, 2, 17).unwrap(),
            lunar: LunarDate {
                year: 1988,
                month: 1,
                day: 1,
                is_leap_month: false,
            },
        };
        assert!(store.upsert_mappings(&[mapping]).await.is_err());
        assert_eq!(store.find_by_solar(mapping.solar).await.unwrap(), None);

        std::fs::remove_dir_all(&path).unwrap();
        assert_eq!(store.upsert_terms(&[record]).await.unwrap(), 1);
        assert_eq!(store.load_terms(1988).await.unwrap(), vec![record]);
    }
}
