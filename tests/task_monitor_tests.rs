mod common;

use futures_util::future::FutureExt;
use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::{FakeServerGroups, ScriptedTasks};
use sgwiz::models::{Application, TaskRef, TaskStatus};
use sgwiz::tasks::{
    wait_until_settled, MonitorStatus, PollingTaskExecutor, TaskExecutor, TaskMonitor, TaskMonitorConfig,
    TaskOperation, MAX_POLL_FAILURES,
};
use sgwiz::ApiError;

const INTERVAL: Duration = Duration::from_millis(5);

struct Counters {
    retries: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

fn config(application: Application) -> (TaskMonitorConfig, Counters) {
    let retries = Arc::new(AtomicUsize::new(0));
    let closes = Arc::new(AtomicUsize::new(0));
    let (r, c) = (retries.clone(), closes.clone());
    let app = application.clone();
    let config = TaskMonitorConfig {
        application,
        title: "Creating your server group".into(),
        on_task_complete: Arc::new(move || {
            let app = app.clone();
            async move {
                let _ = app.refresh_server_groups().await;
            }
            .boxed()
        }),
        on_task_retry: Arc::new(move || {
            r.fetch_add(1, Ordering::SeqCst);
        }),
        on_close: Arc::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }),
    };
    (config, Counters { retries, closes })
}

/// Operation that fails for the first `failures` calls and then returns `t-9`
fn operation(failures: usize) -> (TaskOperation, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let op: TaskOperation = Arc::new(move || {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        async move {
            if n < failures {
                Err(ApiError::Status {
                    status: 400,
                    body: "invalid instance template".into(),
                })
            } else {
                Ok(TaskRef { id: "t-9".into() })
            }
        }
        .boxed()
    });
    (op, calls)
}

async fn settle(monitor: &dyn TaskMonitor) -> MonitorStatus {
    tokio::time::timeout(Duration::from_secs(5), wait_until_settled(monitor))
        .await
        .expect("task never settled")
}

#[tokio::test]
async fn test_successful_task_refreshes_server_groups() {
    let groups = FakeServerGroups::new(&["shop-web-v000", "shop-web-v001"]);
    let application = Application::new("shop", groups.clone());
    let tasks = ScriptedTasks::new(vec![Ok(TaskStatus::Running), Ok(TaskStatus::Succeeded)]);
    let executor = PollingTaskExecutor::new(tasks.clone(), INTERVAL);
    let (config, _) = config(application.clone());

    let monitor = executor.create_monitor(config);
    assert_eq!(monitor.status(), MonitorStatus::Idle);
    let (op, calls) = operation(0);
    monitor.submit(op);

    let status = settle(monitor.as_ref()).await;
    assert_eq!(status, MonitorStatus::Succeeded { task_id: "t-9".into() });
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(tasks.reads.load(Ordering::SeqCst) >= 2);
    assert_eq!(groups.calls.load(Ordering::SeqCst), 1);
    assert_eq!(application.server_groups().len(), 2);
}

#[tokio::test]
async fn test_terminal_task_fails_and_retry_resubmits() {
    let groups = FakeServerGroups::new(&[]);
    let tasks = ScriptedTasks::new(vec![Ok(TaskStatus::Terminal), Ok(TaskStatus::Succeeded)]);
    let executor = PollingTaskExecutor::new(tasks, INTERVAL);
    let (config, counters) = config(Application::new("shop", groups));

    let monitor = executor.create_monitor(config);
    let (op, calls) = operation(0);
    monitor.submit(op);

    match settle(monitor.as_ref()).await {
        MonitorStatus::Failed { task_id, message } => {
            assert_eq!(task_id.as_deref(), Some("t-9"));
            assert_eq!(message, "Task t-9 ended with status TERMINAL");
        }
        other => panic!("unexpected status {:?}", other),
    }

    assert!(monitor.retry());
    assert_eq!(counters.retries.load(Ordering::SeqCst), 1);
    let status = settle(monitor.as_ref()).await;
    assert_eq!(status, MonitorStatus::Succeeded { task_id: "t-9".into() });
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_submission_error_is_reported_without_polling() {
    let tasks = ScriptedTasks::new(vec![Ok(TaskStatus::Succeeded)]);
    let executor = PollingTaskExecutor::new(tasks.clone(), INTERVAL);
    let (config, _) = config(Application::new("shop", FakeServerGroups::new(&[])));

    let monitor = executor.create_monitor(config);
    let (op, _) = operation(1);
    monitor.submit(op);

    let status = settle(monitor.as_ref()).await;
    assert_eq!(
        status,
        MonitorStatus::Failed {
            task_id: None,
            message: "HTTP 400: invalid instance template".into()
        }
    );
    assert_eq!(tasks.reads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_repeated_poll_errors_fail_the_task() {
    let tasks = ScriptedTasks::new(vec![Err(ApiError::Network("connection reset".into()))]);
    let executor = PollingTaskExecutor::new(tasks.clone(), INTERVAL);
    let (config, _) = config(Application::new("shop", FakeServerGroups::new(&[])));

    let monitor = executor.create_monitor(config);
    let (op, _) = operation(0);
    monitor.submit(op);

    let status = settle(monitor.as_ref()).await;
    assert!(matches!(status, MonitorStatus::Failed { task_id: Some(_), .. }));
    assert_eq!(tasks.reads.load(Ordering::SeqCst), MAX_POLL_FAILURES as usize);
}

#[tokio::test]
async fn test_cancel_stops_polling_and_blocks_retry() {
    let tasks = ScriptedTasks::new(vec![Ok(TaskStatus::Running)]);
    let executor = PollingTaskExecutor::new(tasks.clone(), INTERVAL);
    let (config, counters) = config(Application::new("shop", FakeServerGroups::new(&[])));

    let monitor = executor.create_monitor(config);
    let (op, _) = operation(0);
    monitor.submit(op);

    let mut rx = monitor.subscribe();
    tokio::time::timeout(
        Duration::from_secs(5),
        rx.wait_for(|s| matches!(s, MonitorStatus::Running { status: TaskStatus::Running, .. })),
    )
    .await
    .expect("task never started running")
    .unwrap();
    drop(rx);

    monitor.cancel();
    assert_eq!(monitor.status(), MonitorStatus::Cancelled);
    let reads = tasks.reads.load(Ordering::SeqCst);
    tokio::time::sleep(INTERVAL * 5).await;
    assert_eq!(tasks.reads.load(Ordering::SeqCst), reads);

    assert!(!monitor.retry());
    assert_eq!(counters.retries.load(Ordering::SeqCst), 0);
    assert_eq!(counters.closes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_close_cancels_and_runs_close_hook() {
    let tasks = ScriptedTasks::new(vec![Ok(TaskStatus::Running)]);
    let executor = PollingTaskExecutor::new(tasks, INTERVAL);
    let (config, counters) = config(Application::new("shop", FakeServerGroups::new(&[])));

    let monitor = executor.create_monitor(config);
    let (op, _) = operation(0);
    monitor.submit(op);
    monitor.close();

    assert_eq!(monitor.status(), MonitorStatus::Cancelled);
    assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cancel_during_submission_stays_cancelled() {
    let tasks = ScriptedTasks::new(vec![Ok(TaskStatus::Running)]);
    let executor = PollingTaskExecutor::new(tasks.clone(), INTERVAL);
    let (config, _) = config(Application::new("shop", FakeServerGroups::new(&[])));
    let monitor = executor.create_monitor(config);

    // The user dismisses the wizard while the create request is still in flight
    let slot: Arc<OnceCell<Arc<dyn TaskMonitor>>> = Arc::new(OnceCell::new());
    let _ = slot.set(monitor.clone());
    let handle = slot.clone();
    let op: TaskOperation = Arc::new(move || {
        let handle = handle.clone();
        async move {
            if let Some(monitor) = handle.get() {
                monitor.cancel();
            }
            Ok(TaskRef { id: "t-1".into() })
        }
        .boxed()
    });
    monitor.submit(op);

    assert_eq!(settle(monitor.as_ref()).await, MonitorStatus::Cancelled);
    tokio::time::sleep(INTERVAL * 5).await;
    assert_eq!(monitor.status(), MonitorStatus::Cancelled);
    assert!(monitor.status().is_settled());
    assert_eq!(tasks.reads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_cancel_during_completion_hook_is_not_overwritten() {
    let groups = FakeServerGroups::new(&["shop-web-v000"]);
    let tasks = ScriptedTasks::new(vec![Ok(TaskStatus::Succeeded)]);
    let executor = PollingTaskExecutor::new(tasks, INTERVAL);
    let (mut config, _) = config(Application::new("shop", groups.clone()));

    let slot: Arc<OnceCell<Arc<dyn TaskMonitor>>> = Arc::new(OnceCell::new());
    let handle = slot.clone();
    config.on_task_complete = Arc::new(move || {
        let handle = handle.clone();
        async move {
            if let Some(monitor) = handle.get() {
                monitor.cancel();
            }
        }
        .boxed()
    });
    let monitor = executor.create_monitor(config);
    let _ = slot.set(monitor.clone());
    let (op, _) = operation(0);
    monitor.submit(op);

    assert_eq!(settle(monitor.as_ref()).await, MonitorStatus::Cancelled);
    tokio::time::sleep(INTERVAL * 5).await;
    assert_eq!(monitor.status(), MonitorStatus::Cancelled);
}
