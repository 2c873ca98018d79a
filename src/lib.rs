pub mod config;
pub mod errors;
pub mod polls;
pub mod telemetry;
