//! C2 — per-backend run queue.
//!
//! Runs for a `serialize: true` backend share one queue key and are
//! chained tail-to-tail: each run waits for the previous one to finish
//! (successfully or not) before starting. Runs for a non-serialized
//! backend each get their own key and so never wait on one another.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use openclaw_config::BackendSpec;
use openclaw_core::RunId;
use tokio::sync::Mutex as AsyncMutex;

/// Per-backend run serialization.
#[derive(Default)]
pub struct RunQueue {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl RunQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the queue key for a run: the backend id itself when
    /// `serialize` is set (so every run for that backend chains behind the
    /// last), or a run-unique key otherwise (so it never waits on anyone).
    #[must_use]
    pub fn queue_key(backend_id: &str, backend: &BackendSpec, run_id: &RunId) -> String {
        if backend.serialize {
            backend_id.to_owned()
        } else {
            format!("{backend_id}:{run_id}")
        }
    }

    /// Run `task` under `key`'s chain: waits for any run currently holding
    /// `key` to finish, then runs, then yields the key back. A prior run's
    /// failure never blocks or is reported to the next one in the chain —
    /// only its completion (this function takes no `Result`, so a failing
    /// `task` must encode its own failure in `T`).
    pub async fn run<F, Fut, T>(&self, key: String, task: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let lock = self.lock_for(&key);
        let result = {
            let _guard = lock.lock().await;
            task().await
        };
        self.maybe_erase(&key, &lock);
        result
    }

    fn lock_for(&self, key: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().expect("run queue lock poisoned");
        locks.entry(key.to_owned()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
    }

    /// Drop the map entry for `key` once this call is the only remaining
    /// reference to it (our own local clone plus the map's own), so the
    /// queue doesn't grow unboundedly with one-shot keys. If another
    /// waiter queued up behind us in the meantime, its clone keeps the
    /// count above the threshold and the entry is left in place.
    fn maybe_erase(&self, key: &str, lock: &Arc<AsyncMutex<()>>) {
        let mut locks = self.locks.lock().expect("run queue lock poisoned");
        if let Some(current) = locks.get(key) {
            if Arc::ptr_eq(current, lock) && Arc::strong_count(current) <= 2 {
                locks.remove(key);
            }
        }
    }
}
