//! Logging setup for the openclaw gateway daemon.
//!
//! # Example
//!
//! ```rust,no_run
//! use openclaw_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), openclaw_telemetry::TelemetryError> {
//! let config = LogConfig::new("info").with_format(LogFormat::Json);
//! setup_logging(&config)?;
//! tracing::info!("daemon starting");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, LogFormat, setup_default_logging, setup_logging};
