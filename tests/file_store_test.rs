use saju_engine::adapters::file_store::FileStore;
use saju_engine::core::ingest::{self, MeridianCorrection};
use saju_engine::core::solar_terms::{interpolate_terms, utc_to_wall_clock, KST_OFFSET_MINUTES};
use saju_engine::domain::model::Precision;
use saju_engine::domain::ports::SolarTermStore;
use saju_engine::{BirthInput, BirthTime, EngineConfig, Gender, SajuEngine};
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

/// A complete 24-row CSV for `year` in the import format, one minute off the
/// projected table so imported rows are distinguishable.
fn term_csv(year: i32) -> String {
    let mut csv = String::from("year,term_index,term_name_kr,term_name_zh,ecliptic_longitude_deg,utc_time,local_time\n");
    for r in interpolate_terms(year).unwrap().records() {
        let local = utc_to_wall_clock(r.timestamp + chrono::Duration::minutes(1), KST_OFFSET_MINUTES);
        csv.push_str(&format!(
            "{},{},{},{},{},,{}\n",
            year,
            r.term.index(),
            r.term.hangul(),
            r.term.hanja(),
            (285 + 15 * r.term.index()) % 360,
            local.format("%Y-%m-%d %H:%M:%S")
        ));
    }
    csv
}

#[tokio::test]
async fn test_imported_terms_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("tables.json");

    let store = FileStore::open(&path).await.unwrap();
    let report = ingest::import_solar_terms_csv(term_csv(1988).as_bytes(), &store, MeridianCorrection::default())
        .await
        .unwrap();
    assert_eq!(report.written, 24);
    assert!(report.skipped.is_empty());
    drop(store);

    let reopened = FileStore::open(&path).await.unwrap();
    let rows = reopened.load_terms(1988).await.unwrap();
    assert_eq!(rows.len(), 24);
    assert!(rows.iter().all(|r| r.precision == Precision::Exact));
}

#[tokio::test]
async fn test_lower_precision_never_overwrites_imported_rows() {
    let dir = TempDir::new().unwrap();
    let store = FileStore::open(dir.path().join("tables.json")).await.unwrap();
    ingest::import_solar_terms_csv(term_csv(1988).as_bytes(), &store, MeridianCorrection::default())
        .await
        .unwrap();

    let projected = interpolate_terms(1988).unwrap();
    assert_eq!(store.upsert_terms(projected.records()).await.unwrap(), 0);
    let rows = store.load_terms(1988).await.unwrap();
    assert!(rows.iter().all(|r| r.precision == Precision::Exact));
}

#[tokio::test]
async fn test_engine_from_config_reads_table_file() {
    let dir = TempDir::new().unwrap();
    let table = dir.path().join("tables.json");
    {
        let store = FileStore::open(&table).await.unwrap();
        ingest::import_solar_terms_csv(term_csv(1988).as_bytes(), &store, MeridianCorrection::default())
            .await
            .unwrap();
    }

    let mut config_file = NamedTempFile::new().unwrap();
    writeln!(
        config_file,
        "[storage]\npath = \"{}\"\n\n[daeun]\nboundary = \"all_terms\"",
        table.display().to_string().replace('\\', "/")
    )
    .unwrap();
    let config = EngineConfig::from_file(config_file.path()).unwrap();

    let engine = SajuEngine::from_config(&config).await.unwrap();
    let chart = engine
        .chart(&BirthInput::solar(1988, 7, 15, BirthTime::Clock { hour: 14, minute: 0 }, Gender::Male))
        .await
        .unwrap();
    assert_eq!(chart.pillars.year.hanja(), "戊辰");
    assert_eq!(chart.pillars.month.hanja(), "己未");
    assert_eq!(chart.term_precision, Precision::Exact);

    let table = engine.daeun(&chart).await.unwrap();
    assert_eq!(table.boundary_precision, Precision::Exact);
}
