//! Fakes for the wizard's collaborators
#![allow(dead_code)]

use futures_util::future::{BoxFuture, FutureExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{oneshot, watch};

use sgwiz::api::{
    ImageProvider, ImageQuery, ServerGroupCloner, ServerGroupReader, ServiceAccountProvider, TaskReader,
};
use sgwiz::models::{
    Application, Image, ServerGroupCommand, ServerGroupSummary, ServiceAccount, Task, TaskRef, TaskStatus,
};
use sgwiz::tasks::{MonitorStatus, TaskExecutor, TaskMonitor, TaskMonitorConfig, TaskOperation};
use sgwiz::wizard::{StateListener, WizardState};
use sgwiz::{ApiError, WizardServices};

type Reply<T> = Result<Vec<T>, ApiError>;

/// Counts futures dropped before they resolved
struct DropProbe {
    done: bool,
    dropped: Arc<AtomicUsize>,
}

impl Drop for DropProbe {
    fn drop(&mut self) {
        if !self.done {
            self.dropped.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Fetches that stay pending until the test resolves them
pub struct Gate<T> {
    pending: Mutex<Vec<(String, oneshot::Sender<Reply<T>>)>>,
    calls: Mutex<Vec<String>>,
    dropped: Arc<AtomicUsize>,
}

impl<T: Send + 'static> Gate<T> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            pending: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            dropped: Arc::new(AtomicUsize::new(0)),
        })
    }

    fn open(&self, key: &str) -> BoxFuture<'static, Reply<T>> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().push((key.to_string(), tx));
        self.calls.lock().unwrap().push(key.to_string());
        let mut probe = DropProbe {
            done: false,
            dropped: self.dropped.clone(),
        };
        async move {
            let reply = rx
                .await
                .unwrap_or_else(|_| Err(ApiError::Network("gate closed".into())));
            probe.done = true;
            reply
        }
        .boxed()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::SeqCst)
    }

    /// Let spawned fetches run until `n` calls have been made
    pub async fn wait_for_calls(&self, n: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.calls.lock().unwrap().len() < n {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("fetch was never started");
    }

    /// Resolve the oldest pending fetch for `key`
    pub fn resolve(&self, key: &str, reply: Reply<T>) -> bool {
        let mut pending = self.pending.lock().unwrap();
        match pending.iter().position(|(k, _)| k == key) {
            Some(idx) => {
                let (_, tx) = pending.remove(idx);
                tx.send(reply).is_ok()
            }
            None => false,
        }
    }
}

pub struct FakeServiceAccounts(pub Arc<Gate<ServiceAccount>>);

impl ServiceAccountProvider for FakeServiceAccounts {
    fn fetch<'a>(&'a self, account: &'a str) -> BoxFuture<'a, Result<Vec<ServiceAccount>, ApiError>> {
        self.0.open(account)
    }
}

pub struct FakeImages {
    pub gate: Arc<Gate<Image>>,
    pub queries: Mutex<Vec<ImageQuery>>,
}

impl ImageProvider for FakeImages {
    fn find<'a>(&'a self, query: &'a ImageQuery) -> BoxFuture<'a, Result<Vec<Image>, ApiError>> {
        self.queries.lock().unwrap().push(query.clone());
        self.gate.open(&query.account)
    }
}

pub struct RecordingCloner {
    pub calls: Mutex<Vec<(ServerGroupCommand, String)>>,
    pub reply: Mutex<Vec<Result<TaskRef, ApiError>>>,
}

impl RecordingCloner {
    pub fn succeeding() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            reply: Mutex::new(Vec::new()),
        })
    }

    /// Queue replies; once exhausted every call succeeds with task `t-1`
    pub fn with_replies(replies: Vec<Result<TaskRef, ApiError>>) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            reply: Mutex::new(replies),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl ServerGroupCloner for RecordingCloner {
    fn clone_server_group<'a>(
        &'a self,
        command: &'a ServerGroupCommand,
        application: &'a str,
    ) -> BoxFuture<'a, Result<TaskRef, ApiError>> {
        self.calls
            .lock()
            .unwrap()
            .push((command.clone(), application.to_string()));
        let mut replies = self.reply.lock().unwrap();
        let reply = if replies.is_empty() {
            Ok(TaskRef { id: "t-1".into() })
        } else {
            replies.remove(0)
        };
        async move { reply }.boxed()
    }
}

/// Monitor that just runs the operation once per submit
#[derive(Debug)]
pub struct RecordingMonitor {
    pub title: String,
    pub submits: AtomicUsize,
    status: watch::Sender<MonitorStatus>,
}

impl TaskMonitor for RecordingMonitor {
    fn title(&self) -> &str {
        &self.title
    }

    fn submit(&self, operation: TaskOperation) {
        self.submits.fetch_add(1, Ordering::SeqCst);
        self.status.send_replace(MonitorStatus::Submitting);
        let status = self.status.clone();
        tokio::spawn(async move {
            match operation().await {
                Ok(task) => status.send_replace(MonitorStatus::Succeeded { task_id: task.id }),
                Err(e) => status.send_replace(MonitorStatus::Failed {
                    task_id: None,
                    message: e.to_string(),
                }),
            };
        });
    }

    fn status(&self) -> MonitorStatus {
        self.status.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<MonitorStatus> {
        self.status.subscribe()
    }

    fn retry(&self) -> bool {
        false
    }

    fn cancel(&self) {
        self.status.send_replace(MonitorStatus::Cancelled);
    }

    fn close(&self) {
        self.cancel();
    }
}

#[derive(Default)]
pub struct RecordingExecutor {
    pub configs: Mutex<Vec<TaskMonitorConfig>>,
    pub monitors: Mutex<Vec<Arc<RecordingMonitor>>>,
}

impl RecordingExecutor {
    pub fn monitor_count(&self) -> usize {
        self.monitors.lock().unwrap().len()
    }
}

impl TaskExecutor for RecordingExecutor {
    fn create_monitor(&self, config: TaskMonitorConfig) -> Arc<dyn TaskMonitor> {
        let (status, _) = watch::channel(MonitorStatus::Idle);
        let monitor = Arc::new(RecordingMonitor {
            title: config.title.clone(),
            submits: AtomicUsize::new(0),
            status,
        });
        self.configs.lock().unwrap().push(config);
        self.monitors.lock().unwrap().push(monitor.clone());
        monitor
    }
}

/// Task endpoint replaying a scripted sequence of statuses
pub struct ScriptedTasks {
    script: Mutex<Vec<Result<TaskStatus, ApiError>>>,
    pub reads: AtomicUsize,
}

impl ScriptedTasks {
    pub fn new(script: Vec<Result<TaskStatus, ApiError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script),
            reads: AtomicUsize::new(0),
        })
    }
}

impl TaskReader for ScriptedTasks {
    fn get_task<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Task, ApiError>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        // The last entry repeats forever
        let next = if script.len() > 1 {
            script.remove(0)
        } else {
            script.first().cloned().unwrap_or(Ok(TaskStatus::Running))
        };
        let id = id.to_string();
        async move {
            next.map(|status| Task {
                id,
                name: "createServerGroup".into(),
                status,
                start_time: None,
                end_time: None,
            })
        }
        .boxed()
    }
}

pub struct FakeServerGroups {
    pub groups: Vec<ServerGroupSummary>,
    pub calls: AtomicUsize,
}

impl FakeServerGroups {
    pub fn new(names: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            groups: names
                .iter()
                .map(|n| ServerGroupSummary {
                    name: n.to_string(),
                    account: "yc-prod".into(),
                    region: "ru-central1".into(),
                    cloud_provider: "yandex".into(),
                    is_disabled: false,
                })
                .collect(),
            calls: AtomicUsize::new(0),
        })
    }
}

impl ServerGroupReader for FakeServerGroups {
    fn list_server_groups<'a>(
        &'a self,
        _application: &'a str,
    ) -> BoxFuture<'a, Result<Vec<ServerGroupSummary>, ApiError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let groups = self.groups.clone();
        async move { Ok(groups) }.boxed()
    }
}

#[derive(Default)]
pub struct SpyListener {
    pub changes: AtomicUsize,
    pub force_updates: AtomicUsize,
    pub last_sa_loading: Mutex<Option<bool>>,
}

impl SpyListener {
    pub fn changes(&self) -> usize {
        self.changes.load(Ordering::SeqCst)
    }
}

impl StateListener for SpyListener {
    fn state_changed(&self, state: &WizardState) {
        self.changes.fetch_add(1, Ordering::SeqCst);
        *self.last_sa_loading.lock().unwrap() = Some(state.service_accounts_loading());
    }

    fn force_update(&self) {
        self.force_updates.fetch_add(1, Ordering::SeqCst);
    }
}

/// Everything a wizard test needs, with handles kept for assertions
pub struct Harness {
    pub service_accounts: Arc<Gate<ServiceAccount>>,
    pub images: Arc<FakeImages>,
    pub cloner: Arc<RecordingCloner>,
    pub executor: Arc<RecordingExecutor>,
    pub server_groups: Arc<FakeServerGroups>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            service_accounts: Gate::new(),
            images: Arc::new(FakeImages {
                gate: Gate::new(),
                queries: Mutex::new(Vec::new()),
            }),
            cloner: RecordingCloner::succeeding(),
            executor: Arc::new(RecordingExecutor::default()),
            server_groups: FakeServerGroups::new(&["shop-web-v001"]),
        }
    }

    pub fn services(&self) -> WizardServices {
        WizardServices {
            service_accounts: Arc::new(FakeServiceAccounts(self.service_accounts.clone())),
            images: self.images.clone(),
            cloner: self.cloner.clone(),
            executor: self.executor.clone(),
        }
    }

    pub fn application(&self) -> Application {
        Application::new("shop", self.server_groups.clone())
    }
}

pub fn service_accounts(n: usize) -> Vec<ServiceAccount> {
    (0..n)
        .map(|i| ServiceAccount {
            id: format!("sa-{}", i),
            name: format!("deployer-{}", i),
            folder_id: None,
            description: None,
        })
        .collect()
}

pub fn images(n: usize) -> Vec<Image> {
    (0..n)
        .map(|i| Image {
            id: format!("img-{}", i),
            name: format!("ubuntu-{}", i),
            description: None,
            family: Some("ubuntu".into()),
            account: None,
            created_at: None,
        })
        .collect()
}

pub fn command(mode: &str) -> ServerGroupCommand {
    serde_json::from_value(serde_json::json!({
        "application": "shop",
        "credentials": "acct-1",
        "stack": "web",
        "viewState": {"mode": mode}
    }))
    .unwrap()
}
