use serde_json::Value;
use std::sync::Arc;

use crate::models::{Image, ServerGroupCommand, ServiceAccount};
use crate::tasks::TaskMonitor;

#[derive(Debug, Clone, PartialEq)]
pub enum LoadStatus {
    Idle,
    Loading,
    Loaded,
    Failed(String),
}

/// Reference data fetched for the selected account.
///
/// `data` stays absent until the first successful fetch and keeps the last
/// loaded list while a newer fetch is in flight.
#[derive(Debug, Clone)]
pub struct Resource<T> {
    status: LoadStatus,
    data: Option<Vec<T>>,
    epoch: u64,
    account: Option<String>,
}

impl<T> Default for Resource<T> {
    fn default() -> Self {
        Self {
            status: LoadStatus::Idle,
            data: None,
            epoch: 0,
            account: None,
        }
    }
}

impl<T> Resource<T> {
    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    pub fn is_loading(&self) -> bool {
        self.status == LoadStatus::Loading
    }

    pub fn data(&self) -> Option<&[T]> {
        self.data.as_deref()
    }

    /// Account the latest fetch was started for
    pub fn account(&self) -> Option<&str> {
        self.account.as_deref()
    }

    /// Account the current data was loaded for; `None` while loading or after a failure
    pub fn loaded_account(&self) -> Option<&str> {
        match self.status {
            LoadStatus::Loaded => self.account.as_deref(),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            LoadStatus::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// Mark a new fetch as started and return its epoch
    pub(crate) fn begin(&mut self, account: &str) -> u64 {
        self.epoch += 1;
        self.status = LoadStatus::Loading;
        self.account = Some(account.to_string());
        self.epoch
    }

    /// Apply a fetch result. Results from superseded fetches are ignored.
    pub(crate) fn commit(&mut self, epoch: u64, result: Result<Vec<T>, String>) -> bool {
        if epoch != self.epoch {
            return false;
        }
        match result {
            Ok(items) => {
                self.status = LoadStatus::Loaded;
                self.data = Some(items);
            }
            Err(message) => {
                self.status = LoadStatus::Failed(message);
            }
        }
        true
    }
}

/// Wizard-owned state, seeded from the caller's command at mount
#[derive(Debug, Clone)]
pub struct WizardState {
    pub loading: bool,
    pub requires_template_selection: bool,
    pub pipeline: Option<Value>,
    pub stage: Option<Value>,
    pub service_accounts: Resource<ServiceAccount>,
    pub images: Resource<Image>,
    pub task_monitor: Option<Arc<dyn TaskMonitor>>,
}

impl WizardState {
    pub fn from_command(command: &ServerGroupCommand) -> Self {
        Self {
            loading: false,
            requires_template_selection: command.view_state.requires_template_selection,
            pipeline: command.view_state.pipeline.clone(),
            stage: command.view_state.stage.clone(),
            service_accounts: Resource::default(),
            images: Resource::default(),
            task_monitor: None,
        }
    }

    pub fn service_accounts_loading(&self) -> bool {
        self.service_accounts.is_loading()
    }

    pub fn service_accounts(&self) -> Option<&[ServiceAccount]> {
        self.service_accounts.data()
    }

    pub fn image_loading(&self) -> bool {
        self.images.is_loading()
    }

    pub fn all_images(&self) -> Option<&[Image]> {
        self.images.data()
    }
}
