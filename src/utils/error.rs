use thiserror::Error;

#[derive(Error, Debug)]
pub enum SajuError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing configuration field: {field}")]
    MissingConfig { field: String },

    #[error("Invalid configuration value for {field}: {value} ({reason})")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Invalid {field}: {value} ({reason})")]
    Validation {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Year {year} is outside the supported range {min}-{max}")]
    UnsupportedYear { year: i32, min: i32, max: i32 },

    #[error("Unrecognized {kind} token: {token:?}")]
    InvalidToken { kind: &'static str, token: String },

    #[error("Invalid pillar: stem {stem} and branch {branch} differ in parity")]
    InvalidPillar { stem: usize, branch: usize },

    #[error("Provider {provider} failed: {message}")]
    Provider { provider: String, message: String },

    #[error("{operation} timed out after {millis}ms")]
    Timeout { operation: String, millis: u64 },

    #[error("No calendar conversion available for {date}")]
    ConversionUnavailable { date: String },

    #[error("Solar term set for {year} is incomplete ({found} of 24 terms)")]
    IncompleteTermSet { year: i32, found: usize },
}

pub type Result<T> = std::result::Result<T, SajuError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Configuration,
    External,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl SajuError {
    pub fn validation(field: &str, value: impl ToString, reason: impl Into<String>) -> Self {
        SajuError::Validation {
            field: field.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub fn provider(provider: &str, message: impl Into<String>) -> Self {
        SajuError::Provider {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            SajuError::Validation { .. }
            | SajuError::UnsupportedYear { .. }
            | SajuError::InvalidToken { .. }
            | SajuError::InvalidPillar { .. } => ErrorCategory::Input,
            SajuError::Config { .. }
            | SajuError::MissingConfig { .. }
            | SajuError::InvalidConfigValue { .. } => ErrorCategory::Configuration,
            SajuError::Http(_)
            | SajuError::Provider { .. }
            | SajuError::Timeout { .. }
            | SajuError::ConversionUnavailable { .. } => ErrorCategory::External,
            SajuError::Csv(_) | SajuError::Serialization(_) | SajuError::IncompleteTermSet { .. } => {
                ErrorCategory::Data
            }
            SajuError::Io(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Input => ErrorSeverity::High,
            ErrorCategory::External => ErrorSeverity::Medium,
            ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::Configuration | ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// Whether a tier or batch step may fall through to the next source.
    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::External
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            SajuError::Validation { field, reason, .. } => {
                format!("The {} you entered is not valid: {}", field, reason)
            }
            SajuError::UnsupportedYear { min, max, .. } => {
                format!("Only years between {} and {} are supported", min, max)
            }
            SajuError::InvalidToken { kind, token } => {
                format!("'{}' is not a recognized {}", token, kind)
            }
            SajuError::ConversionUnavailable { date } => {
                format!("Could not convert the date {} between calendars", date)
            }
            SajuError::Timeout { .. } | SajuError::Http(_) | SajuError::Provider { .. } => {
                "An external calendar service did not respond".to_string()
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Input => "Check the birth date, time and calendar fields",
            ErrorCategory::Configuration => "Check the configuration file and environment variables",
            ErrorCategory::External => "Retry later or import the calendar tables locally",
            ErrorCategory::Data => "Check the imported table for missing or malformed rows",
            ErrorCategory::System => "Check file permissions and available disk space",
        }
    }
}
