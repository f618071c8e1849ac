//! Client for the Korea Astronomy and Space Science Institute open APIs on
//! data.go.kr: `LrsrCldInfoService` (lunar/solar conversion) and
//! `SpcdeInfoService/get24DivisionsInfo` (solar terms).

use crate::core::solar_terms::{wall_clock_to_utc, KST_OFFSET_MINUTES};
use crate::domain::model::{LunarDate, LunarSolarMapping, Precision, SolarTermRecord};
use crate::domain::ports::{CalendarProvider, SolarTermProvider};
use crate::domain::solar_term::SolarTerm;
use crate::utils::error::{Result, SajuError};
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, NaiveTime};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "http://apis.data.go.kr/B090041/openapi/service";
const PROVIDER_NAME: &str = "data.go.kr";

#[derive(Debug, Clone)]
pub struct DataGovClient {
    client: Client,
    endpoint: String,
    service_key: String,
}

impl DataGovClient {
    pub fn new(endpoint: &str, service_key: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
        })
    }

    async fn call(&self, path: &str, params: &[(&str, String)]) -> Result<Vec<Value>> {
        let url = format!("{}{}", self.endpoint, path);
        tracing::debug!("Calling {} with {:?}", url, params);

        let response = self
            .client
            .get(&url)
            .query(&[("serviceKey", self.service_key.as_str()), ("_type", "json")])
            .query(params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SajuError::provider(
                PROVIDER_NAME,
                format!("HTTP {} from {}", response.status(), path),
            ));
        }

        let body: Value = response.json().await?;
        let header = &body["response"]["header"];
        let code = header["resultCode"].as_str().unwrap_or_default();
        if code != "00" {
            return Err(SajuError::provider(
                PROVIDER_NAME,
                format!(
                    "result {} ({})",
                    code,
                    header["resultMsg"].as_str().unwrap_or("no message")
                ),
            ));
        }

        // `item` is an object for single hits, an array otherwise, and the
        // whole `items` node degrades to "" when there are none.
        Ok(match &body["response"]["body"]["items"]["item"] {
            Value::Array(items) => items.clone(),
            Value::Object(_) => vec![body["response"]["body"]["items"]["item"].clone()],
            _ => Vec::new(),
        })
    }
}

/// Reads a field the service sends as either a number or a zero-padded string.
fn int_field(item: &Value, key: &str) -> Result<i64> {
    let value = &item[key];
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
        .ok_or_else(|| SajuError::provider(PROVIDER_NAME, format!("missing or malformed {}", key)))
}

fn str_field(item: &Value, key: &str) -> String {
    match &item[key] {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

fn parse_mapping(item: &Value) -> Result<LunarSolarMapping> {
    let solar = NaiveDate::from_ymd_opt(
        int_field(item, "solYear")? as i32,
        int_field(item, "solMonth")? as u32,
        int_field(item, "solDay")? as u32,
    )
    .ok_or_else(|| SajuError::provider(PROVIDER_NAME, "invalid solar date in response"))?;
    Ok(LunarSolarMapping {
        solar,
        lunar: LunarDate {
            year: int_field(item, "lunYear")? as i32,
            month: int_field(item, "lunMonth")? as u32,
            day: int_field(item, "lunDay")? as u32,
            is_leap_month: str_field(item, "lunLeapmonth") == "윤",
        },
    })
}

/// `locdate` is `YYYYMMDD`; `kst` is `HHMM`, sometimes padded with spaces.
fn parse_term(item: &Value) -> Result<SolarTermRecord> {
    let term = SolarTerm::from_name(&str_field(item, "dateName"))?;
    let locdate = str_field(item, "locdate");
    let date = NaiveDate::parse_from_str(&locdate, "%Y%m%d")
        .map_err(|e| SajuError::provider(PROVIDER_NAME, format!("locdate {:?}: {}", locdate, e)))?;
    let kst = str_field(item, "kst");
    let digits: String = kst.chars().filter(|c| c.is_ascii_digit()).take(4).collect();
    let time = NaiveTime::parse_from_str(&format!("{:0>4}", digits), "%H%M")
        .map_err(|e| SajuError::provider(PROVIDER_NAME, format!("kst {:?}: {}", kst, e)))?;
    Ok(SolarTermRecord {
        year: date.year(),
        term,
        timestamp: wall_clock_to_utc(date.and_time(time), KST_OFFSET_MINUTES),
        precision: Precision::Fetched,
    })
}

#[async_trait]
impl SolarTermProvider for DataGovClient {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn fetch_terms(&self, year: i32) -> Result<Vec<SolarTermRecord>> {
        let items = self
            .call(
                "/SpcdeInfoService/get24DivisionsInfo",
                &[("solYear", year.to_string()), ("numOfRows", "100".to_string())],
            )
            .await?;
        let records = items.iter().map(parse_term).collect::<Result<Vec<_>>>()?;
        tracing::debug!("{} returned {} terms for {}", PROVIDER_NAME, records.len(), year);
        Ok(records)
    }
}

#[async_trait]
impl CalendarProvider for DataGovClient {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn lunar_to_solar(&self, date: LunarDate) -> Result<Option<LunarSolarMapping>> {
        let items = self
            .call(
                "/LrsrCldInfoService/getSolCalInfo",
                &[
                    ("lunYear", date.year.to_string()),
                    ("lunMonth", format!("{:02}", date.month)),
                    ("lunDay", format!("{:02}", date.day)),
                    ("lunLeapMonth", if date.is_leap_month { "윤" } else { "평" }.to_string()),
                ],
            )
            .await?;
        // The service answers with the common month when a leap month is absent.
        Ok(items
            .iter()
            .map(parse_mapping)
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .find(|m| m.lunar == date))
    }

    async fn solar_to_lunar(&self, date: NaiveDate) -> Result<Option<LunarSolarMapping>> {
        let items = self
            .call(
                "/LrsrCldInfoService/getLunCalInfo",
                &[
                    ("solYear", date.year().to_string()),
                    ("solMonth", format!("{:02}", date.month())),
                    ("solDay", format!("{:02}", date.day())),
                ],
            )
            .await?;
        Ok(items
            .iter()
            .map(parse_mapping)
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .find(|m| m.solar == date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_term_item_with_padded_kst() {
        let item = json!({
            "dateKind": "02",
            "dateName": "입춘",
            "kst": "1627  ",
            "locdate": 20240204,
            "sunLongitude": 315
        });
        let record = parse_term(&item).unwrap();
        assert_eq!(record.term, SolarTerm::StartOfSpring);
        assert_eq!(record.year, 2024);
        assert_eq!(
            record.timestamp.format("%Y-%m-%d %H:%M").to_string(),
            "2024-02-04 07:27"
        );
    }

    #[test]
    fn test_parse_mapping_with_string_fields() {
        let item = json!({
            "lunYear": 2023, "lunMonth": "02", "lunDay": "01", "lunLeapmonth": "윤",
            "solYear": "2023", "solMonth": "03", "solDay": "22"
        });
        let mapping = parse_mapping(&item).unwrap();
        assert!(mapping.lunar.is_leap_month);
        assert_eq!(mapping.solar, NaiveDate::from_ymd_opt(2023, 3, 22).unwrap());
    }

    #[test]
    fn test_malformed_item_is_a_provider_error() {
        let item = json!({ "dateName": "입춘", "locdate": "2024-02-04", "kst": "1627" });
        assert!(matches!(parse_term(&item), Err(SajuError::Provider { .. })));
    }
}
