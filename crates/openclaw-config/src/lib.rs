//! Backend and gateway configuration.
//!
//! Owns the declarative [`BackendSpec`] type, the layered config loader, and
//! the C1 backend resolver ([`resolve_backend`]).

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod env;
mod error;
mod loader;
mod resolver;
mod types;

pub use env::{claude_cli_log_output_enabled, gateway_token};
pub use error::{ConfigError, ConfigResult};
pub use loader::{load, load_file};
pub use resolver::resolve_backend;
pub use types::{
    BackendSpec, GatewayConfig, ImageMode, LimitsConfig, ModelCost, OutputMode, PromptInput,
    QueueMode, SandboxMode, SessionMode, SystemPromptWhen,
};
