pub mod config;
pub mod connectors;
pub mod errors;
pub mod interval;
pub mod service;
pub mod supervisor;
pub mod telemetry;
pub mod utils;

pub use errors::Error;
