//! Atomic JSON-file persistence.
//!
//! A single generic building block: [`JsonFileStore<T>`] rewrites a JSON
//! array of `T` to disk atomically (temp file, fsync, rename). The subagent
//! registry in `openclaw-runtime` is its only consumer today, but the type
//! carries no registry-specific knowledge.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod store;

pub use error::{StorageError, StorageResult};
pub use store::JsonFileStore;
