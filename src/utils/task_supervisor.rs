use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use crate::error::{Error, Result};
use tracing::{info, error, warn};

/// Task Supervisor - Owns the long-lived background tasks of the proxy
///
/// ## Purpose
/// Every background activity (rate-limit compaction, the metrics listener)
/// is spawned through the supervisor so it has an explicit start and stop.
/// Tasks receive a shutdown receiver and are expected to return once it
/// flips to `true`.
///
/// ## Usage
/// ```rust,ignore
/// let mut supervisor = TaskSupervisor::new();
/// let shutdown = supervisor.shutdown_receiver();
/// supervisor.spawn("rate_limit_compaction", limiter.run_compaction(shutdown));
///
/// // on exit
/// supervisor.shutdown(Duration::from_secs(5)).await;
/// ```
pub struct TaskSupervisor {
    tasks: HashMap<String, JoinHandle<()>>,
    shutdown_tx: watch::Sender<bool>,
}

impl TaskSupervisor {
    pub fn new() -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        TaskSupervisor {
            tasks: HashMap::new(),
            shutdown_tx,
        }
    }

    /// Receiver that observes `true` once shutdown has been requested.
    pub fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// Spawn a new background task and register it for monitoring
    pub fn spawn<F>(&mut self, name: impl Into<String>, future: F) -> &mut Self
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        let handle = tokio::spawn(future);

        info!("Spawned background task: {}", name);
        if let Some(previous) = self.tasks.insert(name.clone(), handle) {
            warn!("Replaced running background task: {}", name);
            previous.abort();
        }
        self
    }

    /// Returns an error naming every task that stopped before shutdown was
    /// requested. Finished tasks are dropped from tracking.
    pub fn check_health(&mut self) -> Result<()> {
        let failed_tasks: Vec<String> = self.tasks.iter()
            .filter(|(_, handle)| handle.is_finished())
            .map(|(name, _)| name.clone())
            .collect();

        if failed_tasks.is_empty() {
            return Ok(());
        }

        for name in &failed_tasks {
            self.tasks.remove(name);
        }

        let error_msg = format!("Tasks terminated unexpectedly: {:?}", failed_tasks);
        error!("{}", error_msg);
        Err(Error::Internal(error_msg))
    }

    pub fn active_task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Signal shutdown and wait up to `grace` per task; stragglers are aborted.
    pub async fn shutdown(&mut self, grace: Duration) {
        info!("Shutting down {} background tasks", self.tasks.len());
        self.shutdown_tx.send_replace(true);

        for (name, mut handle) in self.tasks.drain() {
            match tokio::time::timeout(grace, &mut handle).await {
                Ok(Ok(())) => info!("Task {} stopped", name),
                Ok(Err(e)) => error!("Task {} failed: {:?}", name, e),
                Err(_) => {
                    warn!("Task {} did not stop within {:?}, aborting", name, grace);
                    handle.abort();
                }
            }
        }
    }
}

impl Default for TaskSupervisor {
    fn default() -> Self {
        Self::new()
    }
}
