//! The subagent orchestration core: admission control, durable registry,
//! the completion-announce flow, the interaction manager, the session
//! transcript writer, and the typing controller (C5–C8).

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod announce;
pub mod error;
pub mod interaction;
pub mod subagent;
pub mod transcript;
pub mod typing;
pub mod types;

pub use announce::{AnnounceDispatcher, AnnounceInput, AnnounceSessionContext, NullDispatcher, extract_summary, format_stats_line};
pub use error::{RuntimeError, RuntimeResult};
pub use interaction::{InteractionManager, parse_user_answer};
pub use subagent::{HeartbeatCoalescer, SubagentManager, SubagentStats};
pub use transcript::{StopReason, ToolCallRecord, TranscriptRecord, TranscriptWriter, read_transcript};
pub use typing::{TypingCallbacks, TypingController, TypingIntervals};
pub use types::{
    AdmissionDenied, AnnounceOrigin, Limits, Outcome, OutcomeStatus, PendingInteraction, PendingInteractionKind,
    PendingInteractionOption, ReserveOutcome, SubagentContext, SubagentReservation, SubagentResult, SubagentRunRecord,
    SubagentSummary,
};
