pub mod compare;
pub mod config;
pub mod energy;
pub mod errors;
pub mod parse;
pub mod report;
pub mod telemetry;
pub mod timing;
pub mod types;
