pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use config::EngineConfig;
pub use core::backfill::{BackfillJob, BackfillReport};
pub use core::engine::SajuEngine;
pub use core::solar_terms::SolarTermResolver;
pub use domain::ganji::{Branch, Element, Pillar, Stem};
pub use domain::model::{BirthInput, BirthTime, CalendarSystem, Chart, FourPillars, Gender};
pub use utils::error::{Result, SajuError};
