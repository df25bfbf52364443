//! Manages the lifecycle of the relay's long-running server tasks.
use anyhow::{anyhow, Result};
use futures::future::join_all;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

type NamedHandle = (&'static str, JoinHandle<Result<()>>);

/// Tracks spawned server tasks so they can be awaited on shutdown.
///
/// Every task is expected to watch the shared shutdown receiver and return
/// once it flips. A task that fails or panics is reported by name.
#[derive(Clone, Debug)]
pub struct TaskManager {
    handles: Arc<Mutex<Vec<NamedHandle>>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl TaskManager {
    pub fn new(shutdown_rx: watch::Receiver<bool>) -> Self {
        Self {
            handles: Arc::new(Mutex::new(Vec::new())),
            shutdown_rx,
        }
    }

    /// Spawns a named task and keeps its handle.
    pub fn spawn<F>(&self, name: &'static str, future: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        debug!(task_name = name, "Spawning task");
        let handle = tokio::spawn(future);
        self.lock_handles().push((name, handle));
    }

    pub fn get_shutdown_rx(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    pub fn task_count(&self) -> usize {
        self.lock_handles().len()
    }

    /// Waits for every managed task to finish.
    ///
    /// Returns an error naming each task that failed or panicked.
    pub async fn shutdown(self) -> Result<()> {
        let handles: Vec<NamedHandle> = self.lock_handles().drain(..).collect();
        info!(
            "TaskManager shutting down. Waiting for {} tasks to complete...",
            handles.len()
        );

        let (names, handles): (Vec<&'static str>, Vec<_>) = handles.into_iter().unzip();
        let results = join_all(handles).await;

        let mut failures = Vec::new();
        for (task_name, result) in names.into_iter().zip(results) {
            match result {
                Ok(Ok(())) => debug!(task_name, "Task shut down gracefully."),
                Ok(Err(e)) => {
                    error!(task_name, error = %e, "Task failed.");
                    failures.push(format!("{task_name}: {e}"));
                }
                Err(e) => {
                    error!(task_name, "Task panicked during shutdown.");
                    failures.push(format!("{task_name}: {e}"));
                }
            }
        }

        if failures.is_empty() {
            info!("All tasks shut down gracefully.");
            Ok(())
        } else {
            Err(anyhow!("{} task(s) failed: {}", failures.len(), failures.join("; ")))
        }
    }

    fn lock_handles(&self) -> std::sync::MutexGuard<'_, Vec<NamedHandle>> {
        // A poisoned lock only means a spawn call panicked mid-push.
        self.handles.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
