// Domain layer: canonical tables, models and ports. No I/O here.

pub mod ganji;
pub mod model;
pub mod ports;
pub mod solar_term;
