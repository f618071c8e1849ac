use crate::adapters::data_gov::DataGovClient;
use crate::adapters::file_store::FileStore;
use crate::adapters::memory::MemoryStore;
use crate::config::toml_config::EngineConfig;
use crate::core::cycles::{self, SaeunWindow, WolunWindow};
use crate::core::daeun;
use crate::core::lunar::LunarSolarMapper;
use crate::core::pillars::{
    day_pillar, hour_branch_for_clock, hour_pillar, month_pillar, rolls_over_to_next_day,
    validate_clock, validate_lunar_fields, validate_solar_date, year_pillar,
};
use crate::core::relations::{self, Classification};
use crate::core::solar_terms::{utc_to_wall_clock, wall_clock_to_utc, SolarTermResolver};
use crate::domain::ganji::{Branch, Pillar};
use crate::domain::model::{
    BirthInput, BirthTime, CalendarSystem, Chart, ChartElements, DaeunTable, Direction,
    FourPillars, Gender, LunarDate, PillarOverrides,
};
use crate::domain::ports::{
    CalendarProvider, ConfigProvider, DaeunBoundary, LunarSolarStore, SolarTermProvider,
    SolarTermStore,
};
use crate::domain::solar_term::SolarTerm;
use crate::utils::error::{Result, SajuError};
use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use std::sync::Arc;

/// Parsed direct-entry pillars. Parsing happens before any lookup so a bad
/// token never reaches a cache.
#[derive(Debug, Default)]
struct ParsedOverrides {
    year: Option<Pillar>,
    month: Option<Pillar>,
    day: Option<Pillar>,
    hour: Option<Pillar>,
}

impl ParsedOverrides {
    fn parse(raw: &PillarOverrides) -> Result<Self> {
        let parse = |token: &Option<String>| token.as_deref().map(Pillar::from_token).transpose();
        Ok(Self {
            year: parse(&raw.year)?,
            month: parse(&raw.month)?,
            day: parse(&raw.day)?,
            hour: parse(&raw.hour)?,
        })
    }
}

/// Entry point for callers: resolves charts and derives fortunes and
/// classifications from them.
pub struct SajuEngine {
    resolver: Arc<SolarTermResolver>,
    mapper: Arc<LunarSolarMapper>,
    min_year: i32,
    max_year: i32,
    utc_offset_minutes: i32,
    hour_shift_minutes: i32,
    boundary: DaeunBoundary,
}

impl SajuEngine {
    pub fn new(
        config: &dyn ConfigProvider,
        resolver: Arc<SolarTermResolver>,
        mapper: Arc<LunarSolarMapper>,
    ) -> Self {
        Self {
            resolver,
            mapper,
            min_year: config.min_year(),
            max_year: config.max_year(),
            utc_offset_minutes: config.utc_offset_minutes(),
            hour_shift_minutes: config.hour_shift_minutes(),
            boundary: config.daeun_boundary(),
        }
    }

    /// In-memory tables and no remote providers.
    pub fn offline(config: &dyn ConfigProvider) -> Self {
        let store = Arc::new(MemoryStore::new());
        let timeout = std::time::Duration::from_millis(config.provider_timeout_ms());
        let resolver = SolarTermResolver::standard(
            Some(store.clone() as Arc<dyn SolarTermStore>),
            None,
            timeout,
            config.utc_offset_minutes(),
            config.min_year(),
            config.max_year(),
        );
        let mapper = LunarSolarMapper::new(store, Vec::new(), timeout);
        Self::new(config, Arc::new(resolver), Arc::new(mapper))
    }

    /// Wires the stores and the data.go.kr client named in the config.
    pub async fn from_config(config: &EngineConfig) -> Result<Self> {
        let (terms, mappings) = match &config.storage.path {
            Some(path) => {
                let store = Arc::new(FileStore::open(path).await?);
                tracing::info!("Using table file {}", store.path().display());
                (
                    store.clone() as Arc<dyn SolarTermStore>,
                    store as Arc<dyn LunarSolarStore>,
                )
            }
            None => {
                let store = Arc::new(MemoryStore::new());
                (
                    store.clone() as Arc<dyn SolarTermStore>,
                    store as Arc<dyn LunarSolarStore>,
                )
            }
        };

        let client = if config.provider.enabled {
            Some(Arc::new(DataGovClient::new(
                &config.provider.endpoint,
                &config.provider.service_key,
                config.provider_timeout(),
            )?))
        } else {
            None
        };
        let term_provider = client.clone().map(|c| c as Arc<dyn SolarTermProvider>);
        let calendar_providers: Vec<Arc<dyn CalendarProvider>> = client
            .map(|c| c as Arc<dyn CalendarProvider>)
            .into_iter()
            .collect();

        let resolver = SolarTermResolver::standard(
            Some(terms),
            term_provider,
            config.provider_timeout(),
            config.utc_offset_minutes(),
            config.min_year(),
            config.max_year(),
        );
        let mapper = LunarSolarMapper::new(mappings, calendar_providers, config.provider_timeout());
        Ok(Self::new(config, Arc::new(resolver), Arc::new(mapper)))
    }

    pub fn resolver(&self) -> &SolarTermResolver {
        &self.resolver
    }

    pub fn mapper(&self) -> &LunarSolarMapper {
        &self.mapper
    }

    async fn solar_date_of(&self, input: &BirthInput) -> Result<(NaiveDate, Option<LunarDate>)> {
        match input.calendar {
            CalendarSystem::Solar => {
                let date = validate_solar_date(input.year, input.month, input.day, self.min_year, self.max_year)?;
                let lunar = match self.mapper.solar_to_lunar(date).await {
                    Ok(mapping) => Some(mapping.lunar),
                    Err(e) => {
                        tracing::debug!("No lunar date for {}: {}", date, e);
                        None
                    }
                };
                Ok((date, lunar))
            }
            CalendarSystem::Lunar | CalendarSystem::LunarLeap => {
                validate_lunar_fields(input.year, input.month, input.day, self.min_year, self.max_year)?;
                let lunar = LunarDate {
                    year: input.year,
                    month: input.month,
                    day: input.day,
                    is_leap_month: input.calendar == CalendarSystem::LunarLeap,
                };
                let mapping = self.mapper.lunar_to_solar(lunar).await?;
                Ok((mapping.solar, Some(lunar)))
            }
        }
    }

    /// Wall-clock time used for term comparisons, the date whose day pillar
    /// applies, and the hour branch.
    fn birth_clock(&self, date: NaiveDate, time: BirthTime) -> Result<(NaiveTime, NaiveDate, Option<Branch>)> {
        let shift = self.hour_shift_minutes;
        match time {
            BirthTime::Clock { hour, minute } => {
                validate_clock(hour, minute)?;
                let clock = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default();
                let day = if rolls_over_to_next_day(hour, minute, shift) {
                    date + Duration::days(1)
                } else {
                    date
                };
                Ok((clock, day, Some(hour_branch_for_clock(hour, minute, shift))))
            }
            BirthTime::Period(branch) => {
                // Middle of the period; 子 is taken at midnight of the given day.
                let minutes = (branch.index() as i32 * 120 + shift).rem_euclid(24 * 60) as u32;
                let clock = NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0).unwrap_or_default();
                Ok((clock, date, Some(branch)))
            }
            BirthTime::Unknown => Ok((NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default(), date, None)),
        }
    }

    pub async fn chart(&self, input: &BirthInput) -> Result<Chart> {
        let overrides = ParsedOverrides::parse(&input.overrides)?;
        let (solar_date, lunar_date) = self.solar_date_of(input).await?;
        let (clock, day_date, hour_branch) = self.birth_clock(solar_date, input.time)?;
        let moment = wall_clock_to_utc(solar_date.and_time(clock), self.utc_offset_minutes);

        let sexagenary_year = self.resolver.sexagenary_year_at(moment).await?;
        let spring = self.resolver.start_of_spring(sexagenary_year).await?;
        let (ordinal, opening) = self.resolver.month_ordinal_at(moment).await?;

        let year = year_pillar(sexagenary_year);
        let month = month_pillar(year.stem(), ordinal);
        let day = day_pillar(day_date);
        let hour = hour_branch.map(|b| hour_pillar(day.stem(), b));

        let pillars = FourPillars {
            year: overrides.year.unwrap_or(year),
            month: overrides.month.unwrap_or(month),
            day: overrides.day.unwrap_or(day),
            hour: overrides.hour.or(hour),
        };
        tracing::debug!(
            "Chart for {} {}: {} {} {} {:?}",
            solar_date,
            clock,
            pillars.year,
            pillars.month,
            pillars.day,
            pillars.hour.map(|h| h.to_string())
        );

        Ok(Chart {
            input: input.clone(),
            solar_date,
            lunar_date,
            moment,
            elements: ChartElements::from(&pillars),
            pillars,
            term_precision: spring.precision.min(opening.precision),
        })
    }

    /// Civil date whose day pillar is `pillars.day` inside the solar month
    /// named by `pillars.month` of the given sexagenary year (the year that
    /// starts at its 입춘). The month window is under sixty days, so there is
    /// at most one such date. Year and month pillars that contradict the year
    /// are rejected.
    pub async fn solar_date_for(&self, pillars: &FourPillars, sexagenary_year: i32) -> Result<Option<NaiveDate>> {
        if sexagenary_year < self.min_year || sexagenary_year > self.max_year {
            return Err(SajuError::UnsupportedYear {
                year: sexagenary_year,
                min: self.min_year,
                max: self.max_year,
            });
        }
        let year = year_pillar(sexagenary_year);
        if pillars.year != year {
            return Err(SajuError::validation(
                "year pillar",
                pillars.year,
                format!("{} is a {} year", sexagenary_year, year),
            ));
        }
        let ordinal = (pillars.month.branch().index() + 12 - Branch::In.index()) % 12;
        let month = month_pillar(year.stem(), ordinal);
        if pillars.month != month {
            return Err(SajuError::validation(
                "month pillar",
                pillars.month,
                format!("the {} month of {} is {}", pillars.month.branch(), sexagenary_year, month),
            ));
        }

        // 소한 opens the last month and falls in the following civil year.
        let opening_year = if ordinal == 11 { sexagenary_year + 1 } else { sexagenary_year };
        let opening_term = SolarTerm::from_index((ordinal + 1) % 12 * 2);
        let start = self.resolver.terms_for(opening_year).await?.get(opening_term).timestamp;
        let end = self
            .resolver
            .adjacent_month_opening(start, Direction::Forward)
            .await?
            .timestamp;

        let first = utc_to_wall_clock(start, self.utc_offset_minutes).date();
        let last = utc_to_wall_clock(end, self.utc_offset_minutes).date();
        let found = first
            .iter_days()
            .take_while(|d| *d <= last)
            .find(|d| day_pillar(*d) == pillars.day);
        tracing::debug!(
            "{} {} {} in {}: {:?} (window {}..={})",
            pillars.year,
            pillars.month,
            pillars.day,
            sexagenary_year,
            found,
            first,
            last
        );
        Ok(found)
    }

    /// Chart for someone who knows their pillars but not their birth date.
    /// The date comes from [`Self::solar_date_for`], the hour from the hour
    /// pillar's period, and every given pillar is kept as an override.
    pub async fn chart_for_pillars(&self, pillars: &FourPillars, sexagenary_year: i32, gender: Gender) -> Result<Chart> {
        let date = self
            .solar_date_for(pillars, sexagenary_year)
            .await?
            .ok_or_else(|| {
                SajuError::validation(
                    "day pillar",
                    pillars.day,
                    format!("no such day in the {} month of {}", pillars.month, sexagenary_year),
                )
            })?;
        let time = pillars
            .hour
            .map(|h| BirthTime::Period(h.branch()))
            .unwrap_or(BirthTime::Unknown);
        let mut input = BirthInput::solar(date.year(), date.month(), date.day(), time, gender);
        input.overrides = PillarOverrides {
            year: Some(pillars.year.hanja()),
            month: Some(pillars.month.hanja()),
            day: Some(pillars.day.hanja()),
            hour: pillars.hour.map(|h| h.hanja()),
        };
        self.chart(&input).await
    }

    pub async fn daeun(&self, chart: &Chart) -> Result<DaeunTable> {
        daeun::compute(
            &self.resolver,
            &chart.pillars,
            chart.moment,
            chart.input.gender,
            self.boundary,
        )
        .await
    }

    /// Annual pillars from `offset` years after the birth year.
    pub fn saeun(&self, chart: &Chart, offset: i32, len: usize) -> SaeunWindow {
        cycles::saeun(chart.solar_date.year(), offset, len)
    }

    pub fn wolun(&self, year: i32, len: usize) -> Result<WolunWindow> {
        cycles::wolun(year, len)
    }

    pub fn classify(&self, chart: &Chart) -> Classification {
        relations::classify(&chart.pillars)
    }
}
