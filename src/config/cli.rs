use crate::config::toml_config::EngineConfig;
use crate::domain::ganji::Branch;
use crate::domain::model::{BirthInput, BirthTime, CalendarSystem, Gender, PillarOverrides};
use crate::utils::error::{Result, SajuError};
use crate::utils::validation::{self, Validate};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum CalendarArg {
    Solar,
    Lunar,
    LunarLeap,
}

impl From<CalendarArg> for CalendarSystem {
    fn from(arg: CalendarArg) -> Self {
        match arg {
            CalendarArg::Solar => CalendarSystem::Solar,
            CalendarArg::Lunar => CalendarSystem::Lunar,
            CalendarArg::LunarLeap => CalendarSystem::LunarLeap,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum GenderArg {
    Male,
    Female,
}

impl From<GenderArg> for Gender {
    fn from(arg: GenderArg) -> Self {
        match arg {
            GenderArg::Male => Gender::Male,
            GenderArg::Female => Gender::Female,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "saju")]
#[command(about = "Four Pillars chart with decade, annual and monthly fortunes")]
pub struct CliConfig {
    #[arg(long)]
    pub year: i32,

    #[arg(long)]
    pub month: u32,

    #[arg(long)]
    pub day: u32,

    /// Birth time as HH:MM
    #[arg(long, conflicts_with = "period")]
    pub time: Option<String>,

    /// Two-hour period instead of a clock time (子, 자시, ja, …)
    #[arg(long)]
    pub period: Option<String>,

    #[arg(long, value_enum, default_value = "solar")]
    pub calendar: CalendarArg,

    #[arg(long, value_enum)]
    pub gender: GenderArg,

    #[arg(long)]
    pub year_pillar: Option<String>,

    #[arg(long)]
    pub month_pillar: Option<String>,

    #[arg(long)]
    pub day_pillar: Option<String>,

    #[arg(long)]
    pub hour_pillar: Option<String>,

    /// Engine configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Overrides engine.hour_shift_minutes
    #[arg(long)]
    pub hour_shift: Option<i32>,

    /// First annual fortune, in years after the birth year
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    pub saeun_offset: i32,

    #[arg(long, default_value = "10")]
    pub saeun_years: usize,

    /// Year for the monthly fortunes; the birth year when omitted
    #[arg(long)]
    pub wolun_year: Option<i32>,

    #[arg(long, help = "Print the result as JSON")]
    pub json: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

fn parse_clock(raw: &str) -> Result<BirthTime> {
    let invalid = || SajuError::validation("time", raw, "expected HH:MM");
    let (h, m) = raw.trim().split_once(':').ok_or_else(invalid)?;
    let hour = h.parse::<u32>().map_err(|_| invalid())?;
    let minute = m.parse::<u32>().map_err(|_| invalid())?;
    Ok(BirthTime::Clock { hour, minute })
}

impl CliConfig {
    pub fn to_birth_input(&self) -> Result<BirthInput> {
        let time = match (&self.time, &self.period) {
            (Some(clock), _) => parse_clock(clock)?,
            (None, Some(period)) => BirthTime::Period(Branch::from_token(period)?),
            (None, None) => BirthTime::Unknown,
        };
        Ok(BirthInput {
            year: self.year,
            month: self.month,
            day: self.day,
            time,
            calendar: self.calendar.into(),
            gender: self.gender.into(),
            overrides: PillarOverrides {
                year: self.year_pillar.clone(),
                month: self.month_pillar.clone(),
                day: self.day_pillar.clone(),
                hour: self.hour_pillar.clone(),
            },
        })
    }

    /// Loads the engine configuration, then applies command-line overrides.
    pub fn engine_config(&self) -> Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::from_file(path)?,
            None => EngineConfig::default(),
        };
        if let Some(shift) = self.hour_shift {
            config.engine.hour_shift_minutes = shift;
        }
        Ok(config)
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        if let Some(path) = &self.config {
            validation::validate_path("config", path)?;
            validation::validate_file_extension("config", path, &["toml"])?;
        }
        validation::validate_positive_number("saeun_years", self.saeun_years, 1)?;
        self.to_birth_input().map(|_| ())
    }
}
