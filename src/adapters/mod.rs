// Adapters layer: concrete stores and remote providers behind the domain ports.

pub mod data_gov;
pub mod file_store;
pub mod memory;
