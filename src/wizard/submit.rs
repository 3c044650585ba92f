use futures_util::future::FutureExt;
use std::sync::Arc;

use super::pages::pages;
use super::ServerGroupWizard;
use crate::api::ServerGroupCloner;
use crate::config;
use crate::error::{Result, WizardError};
use crate::models::{Application, ServerGroupCommand, WizardMode};
use crate::tasks::{CompletionHook, Hook, TaskMonitor, TaskMonitorConfig, TaskOperation};

/// How a finished command leaves the wizard, decided once when it opens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitMode {
    /// Editing a pipeline stage: the command goes back to the caller
    PipelineAuthoring,
    /// Acting on the cloud directly: a create/clone task is started
    DirectAction,
}

impl SubmitMode {
    pub fn from_mode(mode: &WizardMode) -> Self {
        if mode.is_pipeline() {
            SubmitMode::PipelineAuthoring
        } else {
            SubmitMode::DirectAction
        }
    }
}

pub enum Submission {
    ReturnedToCaller,
    TaskStarted(Arc<dyn TaskMonitor>),
}

fn clone_operation(
    cloner: Arc<dyn ServerGroupCloner>,
    command: ServerGroupCommand,
    application: String,
) -> TaskOperation {
    Arc::new(move || {
        let cloner = cloner.clone();
        let command = command.clone();
        let application = application.clone();
        async move { cloner.clone_server_group(&command, &application).await }.boxed()
    })
}

fn refresh_hook(application: Application) -> CompletionHook {
    Arc::new(move || {
        let application = application.clone();
        async move {
            if let Err(e) = application.refresh_server_groups().await {
                tracing::warn!(%e, application = application.name(), "Failed to refresh server groups");
            }
        }
        .boxed()
    })
}

impl ServerGroupWizard {
    /// Validate every page, stamp the provider and hand the command off
    pub fn submit(&mut self, mut command: ServerGroupCommand) -> Result<Submission> {
        if self.state.requires_template_selection {
            return Err(WizardError::TemplateSelectionPending);
        }
        if let Some(monitor) = &self.state.task_monitor {
            if !monitor.status().is_settled() {
                return Err(WizardError::TaskInFlight);
            }
        }

        let refs = self.reference_data();
        for page in pages(command.view_state.show_image_source_selector) {
            let errors = page.section.validate(&command, &refs);
            if !errors.is_empty() {
                tracing::info!(page = page.label(), ?errors, "Submission blocked by validation");
                return Err(WizardError::Validation {
                    page: page.label(),
                    errors,
                });
            }
        }

        command.selected_provider = Some(config::PROVIDER.to_string());
        self.command = command.clone();

        match self.mode {
            SubmitMode::PipelineAuthoring => {
                tracing::info!(mode = command.view_state.mode.as_str(), "Returning command to pipeline editor");
                (self.close_modal)(command);
                Ok(Submission::ReturnedToCaller)
            }
            SubmitMode::DirectAction => {
                let listener = self.listener.clone();
                let on_task_retry: Hook = Arc::new(move || {
                    if let Some(listener) = &listener {
                        listener.force_update();
                    }
                });
                let monitor = self.services.executor.create_monitor(TaskMonitorConfig {
                    application: self.application.clone(),
                    title: config::TASK_TITLE.to_string(),
                    on_task_complete: refresh_hook(self.application.clone()),
                    on_task_retry,
                    on_close: self.dismiss_modal.clone(),
                });
                self.state.task_monitor = Some(monitor.clone());
                self.notify();

                tracing::info!(
                    application = self.application.name(),
                    cluster = %command.cluster_name(),
                    "Submitting server group task"
                );
                let application = self.application.name().to_string();
                monitor.submit(clone_operation(self.services.cloner.clone(), command, application));
                Ok(Submission::TaskStarted(monitor))
            }
        }
    }
}
