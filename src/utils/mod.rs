pub mod error;
pub mod logger;
pub mod single_flight;
pub mod validation;
