use httpmock::prelude::*;
use saju_engine::adapters::data_gov::DataGovClient;
use saju_engine::adapters::memory::MemoryStore;
use saju_engine::core::lunar::LunarSolarMapper;
use saju_engine::core::solar_terms::{interpolate_terms, utc_to_wall_clock, KST_OFFSET_MINUTES};
use saju_engine::domain::model::{LunarDate, Precision};
use saju_engine::domain::ports::{CalendarProvider, SolarTermProvider, SolarTermStore};
use saju_engine::{SajuError, SolarTermResolver};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

fn envelope(items: Value) -> Value {
    json!({
        "response": {
            "header": { "resultCode": "00", "resultMsg": "NORMAL SERVICE." },
            "body": { "items": { "item": items }, "numOfRows": 100, "pageNo": 1, "totalCount": 24 }
        }
    })
}

/// 24 items in the service's shape, built from the projected table of `year`.
fn term_items(year: i32) -> Value {
    let items: Vec<Value> = interpolate_terms(year)
        .unwrap()
        .records()
        .iter()
        .map(|r| {
            let local = utc_to_wall_clock(r.timestamp, KST_OFFSET_MINUTES);
            json!({
                "dateKind": "02",
                "dateName": r.term.hangul(),
                "isHoliday": "N",
                "kst": local.format("%H%M ").to_string(),
                "locdate": local.format("%Y%m%d").to_string().parse::<i64>().unwrap(),
                "sunLongitude": 0
            })
        })
        .collect();
    Value::Array(items)
}

fn client(server: &MockServer) -> DataGovClient {
    DataGovClient::new(&server.base_url(), "test-key", Duration::from_secs(2)).unwrap()
}

#[tokio::test]
async fn test_fetch_terms_for_year() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/SpcdeInfoService/get24DivisionsInfo")
            .query_param("solYear", "2031")
            .query_param("serviceKey", "test-key")
            .query_param("_type", "json");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(envelope(term_items(2031)));
    });

    let records = client(&server).fetch_terms(2031).await.unwrap();
    mock.assert();
    assert_eq!(records.len(), 24);
    assert!(records.iter().all(|r| r.precision == Precision::Fetched && r.year == 2031));
}

#[tokio::test]
async fn test_resolver_persists_fetched_terms_once() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/SpcdeInfoService/get24DivisionsInfo");
        then.status(200).json_body(envelope(term_items(2031)));
    });

    let store = Arc::new(MemoryStore::new());
    let resolver = Arc::new(SolarTermResolver::standard(
        Some(store.clone() as Arc<dyn SolarTermStore>),
        Some(Arc::new(client(&server)) as Arc<dyn SolarTermProvider>),
        Duration::from_secs(2),
        KST_OFFSET_MINUTES,
        1900,
        2100,
    ));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let resolver = resolver.clone();
        handles.push(tokio::spawn(async move { resolver.terms_for(2031).await }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap().precision(), Precision::Fetched);
    }

    mock.assert_hits(1);
    assert_eq!(store.term_count().await, 24);
    assert!(store
        .load_terms(2031)
        .await
        .unwrap()
        .iter()
        .all(|r| r.precision == Precision::Fetched));
}

#[tokio::test]
async fn test_failing_provider_falls_back_to_interpolation() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/SpcdeInfoService/get24DivisionsInfo");
        then.status(500).body("upstream down");
    });

    let resolver = SolarTermResolver::standard(
        None,
        Some(Arc::new(client(&server)) as Arc<dyn SolarTermProvider>),
        Duration::from_secs(2),
        KST_OFFSET_MINUTES,
        1900,
        2100,
    );
    let set = resolver.terms_for(2032).await.unwrap();
    assert_eq!(set.precision(), Precision::Interpolated);
}

#[tokio::test]
async fn test_error_result_code_is_provider_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/SpcdeInfoService/get24DivisionsInfo");
        then.status(200).json_body(json!({
            "response": { "header": { "resultCode": "30", "resultMsg": "SERVICE KEY IS NOT REGISTERED ERROR." } }
        }));
    });

    let err = client(&server).fetch_terms(2031).await.unwrap_err();
    assert!(matches!(err, SajuError::Provider { .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_lunar_conversion_through_provider_is_cached() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/LrsrCldInfoService/getSolCalInfo")
            .query_param("lunYear", "2023")
            .query_param("lunMonth", "02")
            .query_param("lunDay", "01");
        then.status(200).json_body(envelope(json!({
            "lunYear": 2023, "lunMonth": "02", "lunDay": "01", "lunLeapmonth": "윤",
            "solYear": 2023, "solMonth": "03", "solDay": "22", "solWeek": "수"
        })));
    });

    let store = Arc::new(MemoryStore::new());
    let mapper = LunarSolarMapper::new(
        store.clone(),
        vec![Arc::new(client(&server)) as Arc<dyn CalendarProvider>],
        Duration::from_secs(2),
    );
    let leap = LunarDate {
        year: 2023,
        month: 2,
        day: 1,
        is_leap_month: true,
    };

    let first = mapper.lunar_to_solar(leap).await.unwrap();
    let second = mapper.lunar_to_solar(leap).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.solar.to_string(), "2023-03-22");
    mock.assert_hits(1);
    assert_eq!(store.mapping_count().await, 1);
}

#[tokio::test]
async fn test_empty_items_mean_no_mapping() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/LrsrCldInfoService/getLunCalInfo");
        then.status(200).json_body(json!({
            "response": {
                "header": { "resultCode": "00", "resultMsg": "NORMAL SERVICE." },
                "body": { "items": "", "totalCount": 0 }
            }
        }));
    });

    let answer = client(&server)
        .solar_to_lunar(chrono::NaiveDate::from_ymd_opt(2023, 3, 22).unwrap())
        .await
        .unwrap();
    assert!(answer.is_none());
}
