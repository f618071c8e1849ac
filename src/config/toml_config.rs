use crate::adapters::data_gov::DEFAULT_ENDPOINT;
use crate::core::ingest::MeridianCorrection;
use crate::core::solar_terms::KST_OFFSET_MINUTES;
use crate::domain::ports::{ConfigProvider, DaeunBoundary};
use crate::utils::error::{Result, SajuError};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Engine configuration file. Every section is optional; an empty document
/// gives an offline engine covering 1900–2100 in Korean Standard Time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub engine: EngineSection,
    pub provider: ProviderSection,
    pub storage: StorageSection,
    pub daeun: DaeunSection,
    pub backfill: BackfillSection,
    pub ingest: IngestSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    pub min_year: i32,
    pub max_year: i32,
    pub utc_offset_minutes: i32,
    /// Moves every two-hour boundary later, e.g. 30 for 23:30/01:30/….
    pub hour_shift_minutes: i32,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            min_year: 1900,
            max_year: 2100,
            utc_offset_minutes: KST_OFFSET_MINUTES,
            hour_shift_minutes: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSection {
    pub enabled: bool,
    pub endpoint: String,
    pub service_key: String,
    pub timeout_ms: u64,
}

impl Default for ProviderSection {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            service_key: String::new(),
            timeout_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// JSON table file; in-memory tables when unset.
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DaeunSection {
    pub boundary: DaeunBoundary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackfillSection {
    pub concurrent_requests: usize,
    pub inter_batch_delay_ms: u64,
}

impl Default for BackfillSection {
    fn default() -> Self {
        Self {
            concurrent_requests: 4,
            inter_batch_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSection {
    pub meridian_correction: MeridianCorrection,
}

impl EngineConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| SajuError::Config {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables are
    /// left as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| SajuError::Config {
            message: format!("env pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_range("engine.min_year", self.engine.min_year, 1, 9998)?;
        validation::validate_range("engine.max_year", self.engine.max_year, 2, 9999)?;
        if self.engine.min_year >= self.engine.max_year {
            return Err(SajuError::InvalidConfigValue {
                field: "engine.max_year".to_string(),
                value: self.engine.max_year.to_string(),
                reason: format!("must be greater than min_year {}", self.engine.min_year),
            });
        }
        validation::validate_range("engine.utc_offset_minutes", self.engine.utc_offset_minutes, -720, 840)?;
        validation::validate_range("engine.hour_shift_minutes", self.engine.hour_shift_minutes, -119, 119)?;

        if self.provider.enabled {
            validation::validate_url("provider.endpoint", &self.provider.endpoint)?;
            if self.provider.service_key.is_empty() || self.provider.service_key.starts_with("${") {
                return Err(SajuError::MissingConfig {
                    field: "provider.service_key".to_string(),
                });
            }
        }
        validation::validate_positive_number("provider.timeout_ms", self.provider.timeout_ms as usize, 1)?;

        if let Some(path) = &self.storage.path {
            validation::validate_path("storage.path", path)?;
            validation::validate_file_extension("storage.path", path, &["json"])?;
        }

        validation::validate_positive_number("backfill.concurrent_requests", self.backfill.concurrent_requests, 1)?;

        let correction = &self.ingest.meridian_correction;
        if correction.from_year > correction.to_year {
            return Err(SajuError::InvalidConfigValue {
                field: "ingest.meridian_correction".to_string(),
                value: format!("{}-{}", correction.from_year, correction.to_year),
                reason: "from_year must not be after to_year".to_string(),
            });
        }

        Ok(())
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider.timeout_ms)
    }

    pub fn inter_batch_delay(&self) -> Duration {
        Duration::from_millis(self.backfill.inter_batch_delay_ms)
    }
}

impl ConfigProvider for EngineConfig {
    fn min_year(&self) -> i32 {
        self.engine.min_year
    }

    fn max_year(&self) -> i32 {
        self.engine.max_year
    }

    fn utc_offset_minutes(&self) -> i32 {
        self.engine.utc_offset_minutes
    }

    fn hour_shift_minutes(&self) -> i32 {
        self.engine.hour_shift_minutes
    }

    fn provider_timeout_ms(&self) -> u64 {
        self.provider.timeout_ms
    }

    fn daeun_boundary(&self) -> DaeunBoundary {
        self.daeun.boundary
    }
}

impl Validate for EngineConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_document_is_valid_offline_config() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config.min_year(), 1900);
        assert_eq!(config.max_year(), 2100);
        assert_eq!(config.utc_offset_minutes(), 540);
        assert_eq!(config.daeun_boundary(), DaeunBoundary::MonthOpening);
        assert!(!config.provider.enabled);
        assert_eq!(config.ingest.meridian_correction, MeridianCorrection::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[engine]
min_year = 1920
max_year = 2080
hour_shift_minutes = 30

[provider]
enabled = true
endpoint = "https://apis.example.com/B090041/openapi/service"
service_key = "abc123"
timeout_ms = 500

[storage]
path = "./data/tables.json"

[daeun]
boundary = "all_terms"

[backfill]
concurrent_requests = 2
inter_batch_delay_ms = 250

[ingest.meridian_correction]
from_year = 1954
to_year = 1961
minutes = 30
"#;

        let config = EngineConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.min_year(), 1920);
        assert_eq!(config.hour_shift_minutes(), 30);
        assert_eq!(config.daeun_boundary(), DaeunBoundary::AllTerms);
        assert_eq!(config.provider_timeout(), Duration::from_millis(500));
        assert_eq!(config.backfill.concurrent_requests, 2);
        assert_eq!(config.inter_batch_delay(), Duration::from_millis(250));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("SAJU_TEST_SERVICE_KEY", "from-env");

        let toml_content = r#"
[provider]
enabled = true
service_key = "${SAJU_TEST_SERVICE_KEY}"
"#;

        let config = EngineConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.provider.service_key, "from-env");
        assert!(config.validate().is_ok());

        std::env::remove_var("SAJU_TEST_SERVICE_KEY");
    }

    #[test]
    fn test_unset_key_fails_validation_when_provider_enabled() {
        let toml_content = r#"
[provider]
enabled = true
service_key = "${SAJU_TEST_KEY_THAT_IS_NEVER_SET}"
"#;
        let config = EngineConfig::from_toml_str(toml_content).unwrap();
        assert!(matches!(config.validate(), Err(SajuError::MissingConfig { .. })));
    }

    #[test]
    fn test_config_validation() {
        let bad_years = EngineConfig::from_toml_str("[engine]\nmin_year = 2000\nmax_year = 1990\n").unwrap();
        assert!(bad_years.validate().is_err());

        let bad_path = EngineConfig::from_toml_str("[storage]\npath = \"tables.csv\"\n").unwrap();
        assert!(bad_path.validate().is_err());

        let bad_url = EngineConfig::from_toml_str(
            "[provider]\nenabled = true\nendpoint = \"invalid-url\"\nservice_key = \"k\"\n",
        )
        .unwrap();
        assert!(bad_url.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[engine]\nutc_offset_minutes = 480\n\n[daeun]\nboundary = \"month_opening\"").unwrap();

        let config = EngineConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.utc_offset_minutes(), 480);
        assert_eq!(config.max_year(), 2100);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let result = EngineConfig::from_toml_str("[engine\nmin_year = ");
        assert!(matches!(result, Err(SajuError::Config { .. })));
    }
}
