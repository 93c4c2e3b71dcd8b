//! Fire-and-forget background task registry.
//!
//! Mirrors the upstream Python sidecar's `ABANDONED_TASKS` set
//! (`create_task_safely`): a task is spawned, its handle kept alive in a
//! shared registry, and the handle is dropped once the task completes so the
//! runtime never garbage-collects a task mid-flight. There is no bounded
//! capacity and no ordering guarantee between tasks; operators are expected
//! to constrain upstream request rates instead.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;

/// Owns handles to in-flight background tasks until they complete.
///
/// Cheap to clone: the registry itself lives behind an `Arc`.
#[derive(Clone, Default)]
pub struct TaskSupervisor {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    handles: Mutex<HashMap<u64, JoinHandle<()>>>,
    next_id: AtomicU64,
}

impl TaskSupervisor {
    /// Creates an empty supervisor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns `future`, registering its handle until completion.
    ///
    /// `future` should swallow its own errors before returning (e.g. log them)
    /// if it needs to report failure — see [`TaskSupervisor::submit_fallible`]
    /// for a variant that logs on `Err` for you.
    pub fn submit<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let registry = Arc::clone(&self.inner);

        let handle = tokio::spawn(async move {
            future.await;
            registry.handles.lock().unwrap().remove(&id);
        });

        self.inner.handles.lock().unwrap().insert(id, handle);
    }

    /// Spawns a fallible `future`, logging `Err` results at `warn` level
    /// under the given `label` (e.g. `"cache write"`, `"peer broadcast"`).
    ///
    /// This is the shape every background write in the sidecar uses: a cache
    /// `SETEX`, a TTL `EXPIRE` refresh, or an outbound peer-sync POST must
    /// never surface its failure to the client, but the failure should still
    /// be observable.
    pub fn submit_fallible<F, E>(&self, label: &'static str, future: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: std::fmt::Display + Send + 'static,
    {
        self.submit(async move {
            if let Err(_err) = future.await {
                #[cfg(feature = "tracing")]
                tracing::warn!(task = label, error = %_err, "background task failed");
                #[cfg(not(feature = "tracing"))]
                let _ = (label, _err);
            }
        });
    }

    /// Number of tasks currently in flight. Mostly useful for tests.
    pub fn outstanding(&self) -> usize {
        self.inner.handles.lock().unwrap().len()
    }
}
