//! Telemetry and logging infrastructure

pub mod logging;

pub use logging::{init_logging, LogConfig, LOG_ENV, LOG_FORMAT_ENV};
pub use tracing_appender::non_blocking::WorkerGuard as LogGuard;
