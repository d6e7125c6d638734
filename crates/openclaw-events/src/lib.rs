//! In-process event bus for the subagent orchestration core.
//!
//! Three event kinds cross this bus: a subagent being registered
//! (`spawned`), a subagent's run finishing (`completed`), and a session
//! transcript being appended to (`sessionTranscriptUpdate`). Nothing else in
//! the workspace publishes events here — the announce flow reacts to
//! `completed` by itself, outside of this crate.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod bus;
mod event;

pub use bus::{EventBus, EventReceiver};
pub use event::OpenclawEvent;
