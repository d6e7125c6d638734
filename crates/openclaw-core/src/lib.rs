//! Shared identifiers and small value types for the openclaw gateway core.
//!
//! Kept deliberately thin: every other crate in the workspace depends on
//! this one, so it carries no async runtime, no I/O, and no business logic.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod ids;
pub mod time;

pub use ids::{AgentId, RunId, SessionKey};
pub use time::now;
