pub mod backfill;
pub mod cycles;
pub mod daeun;
pub mod engine;
pub mod ingest;
pub mod lunar;
pub mod pillars;
pub mod relations;
pub mod shinsal;
pub mod solar_terms;

pub use crate::domain::model::{Chart, FourPillars};
pub use crate::domain::ports::ConfigProvider;
pub use crate::utils::error::Result;
