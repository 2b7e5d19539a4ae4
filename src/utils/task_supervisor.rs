use std::collections::HashMap;

use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::error::{Error, Result};

/// Task Supervisor - Monitors background tasks and detects failures
///
/// Tracks spawned background tasks (the snapshot refresher, primarily) and
/// reports unexpected terminations. Shutdown aborts everything still
/// running.
pub struct TaskSupervisor {
    tasks: HashMap<String, JoinHandle<()>>,
}

impl TaskSupervisor {
    pub fn new() -> Self {
        TaskSupervisor {
            tasks: HashMap::new(),
        }
    }

    /// Spawn a new background task and register it for monitoring
    pub fn spawn<F>(&mut self, name: impl Into<String>, future: F) -> &mut Self
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        let handle = tokio::spawn(future);

        info!("Spawned background task: {}", name);
        self.tasks.insert(name, handle);
        self
    }

    /// Check health of all registered tasks
    /// Returns error if any task has terminated unexpectedly
    pub fn check_health(&mut self) -> Result<()> {
        let failed_tasks: Vec<String> = self
            .tasks
            .iter()
            .filter(|(_, handle)| handle.is_finished())
            .map(|(name, _)| name.clone())
            .collect();

        if !failed_tasks.is_empty() {
            error!("Tasks terminated unexpectedly: {:?}", failed_tasks);

            for name in &failed_tasks {
                self.tasks.remove(name);
            }

            return Err(Error::TasksTerminated(failed_tasks));
        }

        Ok(())
    }

    pub fn active_task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Gracefully shutdown all tasks
    pub fn shutdown_all(&mut self) {
        info!("Shutting down {} background tasks", self.tasks.len());

        for (name, handle) in self.tasks.drain() {
            handle.abort();
            info!("Aborted task: {}", name);
        }
    }
}

impl Default for TaskSupervisor {
    fn default() -> Self {
        Self::new()
    }
}
