use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;

use super::monitor::{MonitorStatus, TaskExecutor, TaskMonitor, TaskMonitorConfig, TaskOperation};
use crate::api::TaskReader;
use crate::models::TaskStatus;

/// Consecutive status read failures tolerated before a task is reported as failed
pub const MAX_POLL_FAILURES: u32 = 3;

/// Creates monitors that poll the task endpoint until the task settles
#[derive(Clone)]
pub struct PollingTaskExecutor {
    reader: Arc<dyn TaskReader>,
    interval: Duration,
}

impl PollingTaskExecutor {
    pub fn new(reader: Arc<dyn TaskReader>, interval: Duration) -> Self {
        Self { reader, interval }
    }
}

impl TaskExecutor for PollingTaskExecutor {
    fn create_monitor(&self, config: TaskMonitorConfig) -> Arc<dyn TaskMonitor> {
        Arc::new(PollingTaskMonitor::new(config, self.reader.clone(), self.interval))
    }
}

pub struct PollingTaskMonitor {
    inner: Arc<Inner>,
}

struct Inner {
    config: TaskMonitorConfig,
    reader: Arc<dyn TaskReader>,
    interval: Duration,
    status: watch::Sender<MonitorStatus>,
    cancelled: watch::Sender<bool>,
    operation: Mutex<Option<TaskOperation>>,
}

impl PollingTaskMonitor {
    pub fn new(config: TaskMonitorConfig, reader: Arc<dyn TaskReader>, interval: Duration) -> Self {
        let (status, _) = watch::channel(MonitorStatus::Idle);
        let (cancelled, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                config,
                reader,
                interval,
                status,
                cancelled,
                operation: Mutex::new(None),
            }),
        }
    }

    fn start(&self, operation: TaskOperation) {
        self.inner.set_status(MonitorStatus::Submitting);
        tokio::spawn(run(self.inner.clone(), operation));
    }
}

impl Inner {
    /// Publish a new status. A cancelled monitor stays cancelled.
    fn set_status(&self, status: MonitorStatus) -> bool {
        let label = status.to_string();
        let applied = self.status.send_if_modified(move |current| {
            if *current == MonitorStatus::Cancelled {
                return false;
            }
            *current = status;
            true
        });
        if applied {
            tracing::info!(title = %self.config.title, status = %label, "Task monitor status changed");
        } else {
            tracing::debug!(title = %self.config.title, status = %label, "Ignoring status update for cancelled task");
        }
        applied
    }

    /// Move to `Cancelled` unless the task already settled
    fn cancel(&self) {
        self.cancelled.send_replace(true);
        let cancelled = self.status.send_if_modified(|current| {
            if current.is_settled() {
                return false;
            }
            *current = MonitorStatus::Cancelled;
            true
        });
        if cancelled {
            tracing::info!(title = %self.config.title, "Task monitor cancelled");
        }
    }

    fn is_cancelled(&self) -> bool {
        *self.cancelled.borrow()
    }
}

async fn wait_cancelled(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|c| *c).await;
}

async fn run(inner: Arc<Inner>, operation: TaskOperation) {
    let mut cancelled = inner.cancelled.subscribe();
    if inner.is_cancelled() {
        return;
    }

    let submitted = tokio::select! {
        _ = wait_cancelled(&mut cancelled) => return,
        result = operation() => result,
    };
    if inner.is_cancelled() {
        return;
    }
    let task = match submitted {
        Ok(task) => task,
        Err(e) => {
            tracing::error!(%e, "Task submission failed");
            inner.set_status(MonitorStatus::Failed {
                task_id: None,
                message: e.to_string(),
            });
            return;
        }
    };
    if !inner.set_status(MonitorStatus::Running {
        task_id: task.id.clone(),
        status: TaskStatus::NotStarted,
    }) {
        return;
    }

    let mut failures = 0;
    loop {
        tokio::select! {
            biased;
            _ = wait_cancelled(&mut cancelled) => return,
            _ = tokio::time::sleep(inner.interval) => {}
        }
        if inner.is_cancelled() {
            return;
        }
        let polled = tokio::select! {
            _ = wait_cancelled(&mut cancelled) => return,
            result = inner.reader.get_task(&task.id) => result,
        };
        match polled {
            Ok(current) if current.status.is_success() => {
                (inner.config.on_task_complete)().await;
                inner.set_status(MonitorStatus::Succeeded { task_id: task.id.clone() });
                return;
            }
            Ok(current) if current.status.is_terminal() => {
                inner.set_status(MonitorStatus::Failed {
                    task_id: Some(task.id.clone()),
                    message: format!("Task {} ended with status {}", task.id, current.status.as_str()),
                });
                return;
            }
            Ok(current) => {
                failures = 0;
                let changed = !matches!(
                    &*inner.status.borrow(),
                    MonitorStatus::Running { status, .. } if *status == current.status
                );
                if changed {
                    inner.set_status(MonitorStatus::Running {
                        task_id: task.id.clone(),
                        status: current.status,
                    });
                }
            }
            Err(e) => {
                failures += 1;
                tracing::warn!(%e, task_id = %task.id, failures, "Failed to read task status");
                if failures >= MAX_POLL_FAILURES {
                    inner.set_status(MonitorStatus::Failed {
                        task_id: Some(task.id.clone()),
                        message: e.to_string(),
                    });
                    return;
                }
            }
        }
    }
}

impl TaskMonitor for PollingTaskMonitor {
    fn title(&self) -> &str {
        &self.inner.config.title
    }

    fn submit(&self, operation: TaskOperation) {
        *self
            .inner
            .operation
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(operation.clone());
        self.start(operation);
    }

    fn status(&self) -> MonitorStatus {
        self.inner.status.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<MonitorStatus> {
        self.inner.status.subscribe()
    }

    fn retry(&self) -> bool {
        if self.inner.is_cancelled() || !matches!(self.status(), MonitorStatus::Failed { .. }) {
            return false;
        }
        let operation = self
            .inner
            .operation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match operation {
            Some(operation) => {
                tracing::info!(title = %self.inner.config.title, "Retrying task");
                (self.inner.config.on_task_retry)();
                self.start(operation);
                true
            }
            None => false,
        }
    }

    fn cancel(&self) {
        self.inner.cancel();
    }

    fn close(&self) {
        self.cancel();
        (self.inner.config.on_close)();
    }
}

impl fmt::Debug for PollingTaskMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollingTaskMonitor")
            .field("title", &self.inner.config.title)
            .field("status", &*self.inner.status.borrow())
            .finish_non_exhaustive()
    }
}
