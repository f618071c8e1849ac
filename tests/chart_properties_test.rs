use chrono::{Datelike, Duration, NaiveDate};
use saju_engine::adapters::memory::MemoryStore;
use saju_engine::core::daeun;
use saju_engine::core::ingest;
use saju_engine::core::lunar::LunarSolarMapper;
use saju_engine::core::pillars::{day_pillar, year_pillar};
use saju_engine::core::relations::void_pair;
use saju_engine::domain::model::Direction;
use saju_engine::{BirthInput, BirthTime, EngineConfig, Gender, Pillar, SajuEngine, Stem};
use std::sync::Arc;

fn engine() -> SajuEngine {
    SajuEngine::offline(&EngineConfig::default())
}

#[test]
fn test_sixty_year_recurrence() {
    for year in 1900..=2040 {
        assert_eq!(year_pillar(year), year_pillar(year + 60));
    }
    assert_eq!(year_pillar(1984).cycle_index(), 0);
    assert_eq!(year_pillar(2044).hanja(), "甲子");
}

#[test]
fn test_every_pillar_keeps_parity() {
    for i in 0..60 {
        let p = Pillar::from_cycle_index(i);
        assert_eq!(p.stem().index() % 2, p.branch().index() % 2);
    }
}

#[test]
fn test_day_pillars_continue_across_year_boundaries() {
    for year in [1899, 1969, 1999, 2023, 2099] {
        let eve = NaiveDate::from_ymd_opt(year, 12, 31).unwrap();
        assert_eq!(day_pillar(eve + Duration::days(1)), day_pillar(eve).next());
    }
}

#[test]
fn test_void_groups_share_one_pair() {
    for group in 0..6 {
        let first = void_pair(Pillar::from_cycle_index(group * 10));
        for member in 1..10 {
            assert_eq!(void_pair(Pillar::from_cycle_index(group * 10 + member)), first);
        }
    }
}

#[test]
fn test_direction_examples() {
    assert_eq!(daeun::direction(Stem::Gyeong, Gender::Male), Direction::Forward);
    assert_eq!(daeun::direction(Stem::Gyeong, Gender::Female), Direction::Backward);
}

#[tokio::test]
async fn test_same_year_sixty_years_apart() {
    let engine = engine();
    let a = engine
        .chart(&BirthInput::solar(1964, 6, 1, BirthTime::Unknown, Gender::Female))
        .await
        .unwrap();
    let b = engine
        .chart(&BirthInput::solar(2024, 6, 1, BirthTime::Unknown, Gender::Female))
        .await
        .unwrap();
    assert_eq!(a.pillars.year, b.pillars.year);
    assert_eq!(a.pillars.month, b.pillars.month);
}

#[tokio::test]
async fn test_starting_number_always_in_range() {
    let engine = engine();
    let mut date = NaiveDate::from_ymd_opt(1995, 1, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(1997, 1, 1).unwrap();
    while date < end {
        for gender in [Gender::Male, Gender::Female] {
            let input = BirthInput::solar(
                date.year(),
                date.month(),
                date.day(),
                BirthTime::Clock { hour: 6, minute: 15 },
                gender,
            );
            let chart = engine.chart(&input).await.unwrap();
            let table = engine.daeun(&chart).await.unwrap();
            assert!((1..=10).contains(&table.starting_number), "{} {:?}", date, gender);
            assert_eq!(table.periods.len(), 10);
        }
        date += Duration::days(5);
    }
}

#[tokio::test]
async fn test_lunar_round_trip_over_imported_table() {
    let csv = "greg_year,greg_month,greg_day,lunar_year,lunar_month,lunar_day,is_leap_month\n\
               2023,3,21,2023,2,30,0\n\
               2023,3,22,2023,2,1,1\n\
               2023,3,23,2023,2,2,1\n\
               2024,2,10,2024,1,1,0\n";
    let store = Arc::new(MemoryStore::new());
    ingest::import_lunar_solar_csv(csv.as_bytes(), store.as_ref())
        .await
        .unwrap();

    let mapper = LunarSolarMapper::new(store, Vec::new(), std::time::Duration::from_millis(50));
    for solar in ["2023-03-21", "2023-03-22", "2023-03-23", "2024-02-10"] {
        let solar: NaiveDate = solar.parse().unwrap();
        let lunar = mapper.solar_to_lunar(solar).await.unwrap().lunar;
        assert_eq!(mapper.lunar_to_solar(lunar).await.unwrap().solar, solar);
    }
}

#[test]
fn test_chart_outside_async_runtime() {
    let chart = tokio_test::block_on(
        engine().chart(&BirthInput::solar(2000, 1, 1, BirthTime::Clock { hour: 0, minute: 30 }, Gender::Male)),
    )
    .unwrap();
    // Before 입춘 2000: still the 己卯 year, 丙子 month.
    assert_eq!(chart.pillars.year.hanja(), "己卯");
    assert_eq!(chart.pillars.month.hanja(), "丙子");
    assert_eq!(chart.pillars.day.hanja(), "戊午");
    assert_eq!(chart.pillars.hour.unwrap().hanja(), "壬子");
}
