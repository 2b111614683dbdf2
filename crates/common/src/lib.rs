//! Shared building blocks for sheetlink crates:
//! - **Configuration**: Strongly typed application configuration (`config`).
//! - **Telemetry**: Diagnostic tracing setup (`telemetry`).
pub mod config;
pub mod telemetry;
