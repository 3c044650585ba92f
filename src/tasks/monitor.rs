use futures_util::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

use crate::error::ApiError;
use crate::models::{Application, TaskRef, TaskStatus};

/// Re-runnable operation that submits a task and returns its reference
pub type TaskOperation = Arc<dyn Fn() -> BoxFuture<'static, Result<TaskRef, ApiError>> + Send + Sync>;
/// Hook awaited once a task succeeds
pub type CompletionHook = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;
pub type Hook = Arc<dyn Fn() + Send + Sync>;

/// Everything a monitor is bound to when it is created
#[derive(Clone)]
pub struct TaskMonitorConfig {
    pub application: Application,
    pub title: String,
    pub on_task_complete: CompletionHook,
    pub on_task_retry: Hook,
    /// Invoked when the monitor is closed by the user; dismisses the owning modal
    pub on_close: Hook,
}

impl fmt::Debug for TaskMonitorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskMonitorConfig")
            .field("application", &self.application.name())
            .field("title", &self.title)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MonitorStatus {
    Idle,
    Submitting,
    Running { task_id: String, status: TaskStatus },
    Succeeded { task_id: String },
    Failed { task_id: Option<String>, message: String },
    Cancelled,
}

impl MonitorStatus {
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            MonitorStatus::Succeeded { .. } | MonitorStatus::Failed { .. } | MonitorStatus::Cancelled
        )
    }
}

impl fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorStatus::Idle => write!(f, "idle"),
            MonitorStatus::Submitting => write!(f, "submitting"),
            MonitorStatus::Running { task_id, status } => write!(f, "task {} {}", task_id, status.as_str()),
            MonitorStatus::Succeeded { task_id } => write!(f, "task {} succeeded", task_id),
            MonitorStatus::Failed { message, .. } => write!(f, "failed: {}", message),
            MonitorStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Submits a long-running operation and reports its progress
pub trait TaskMonitor: Send + Sync + fmt::Debug {
    fn title(&self) -> &str;

    fn submit(&self, operation: TaskOperation);

    fn status(&self) -> MonitorStatus;

    fn subscribe(&self) -> watch::Receiver<MonitorStatus>;

    /// Re-run the last operation after a failure. Returns false when there is nothing to retry.
    fn retry(&self) -> bool;

    /// Stop following the task without touching the modal
    fn cancel(&self);

    /// Stop following the task and dismiss the owning modal
    fn close(&self);
}

/// Injected capability that creates task monitors
pub trait TaskExecutor: Send + Sync {
    fn create_monitor(&self, config: TaskMonitorConfig) -> Arc<dyn TaskMonitor>;
}

/// Wait until the monitor reaches a settled status and return it
pub async fn wait_until_settled(monitor: &dyn TaskMonitor) -> MonitorStatus {
    let mut rx = monitor.subscribe();
    let settled = match rx.wait_for(MonitorStatus::is_settled).await {
        Ok(status) => status.clone(),
        Err(_) => monitor.status(),
    };
    settled
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settled_states() {
        assert!(!MonitorStatus::Submitting.is_settled());
        assert!(!MonitorStatus::Running { task_id: "1".into(), status: TaskStatus::Running }.is_settled());
        assert!(MonitorStatus::Succeeded { task_id: "1".into() }.is_settled());
        assert!(MonitorStatus::Cancelled.is_settled());
    }

    #[test]
    fn test_display() {
        let s = MonitorStatus::Running { task_id: "01HX".into(), status: TaskStatus::Running };
        assert_eq!(s.to_string(), "task 01HX RUNNING");
    }
}
