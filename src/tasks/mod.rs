//! Task monitoring for long-running create/clone operations
mod executor;
mod monitor;

pub use executor::{PollingTaskExecutor, PollingTaskMonitor, MAX_POLL_FAILURES};
pub use monitor::{
    wait_until_settled, CompletionHook, Hook, MonitorStatus, TaskExecutor, TaskMonitor,
    TaskMonitorConfig, TaskOperation,
};
