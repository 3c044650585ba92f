//! Server group creation wizard.
//!
//! The wizard owns its state and is driven from a single task: user events
//! (`account_changed`, `template_selected`, `submit`) mutate it directly, and
//! reference-data fetches run in the background and are committed when the
//! owner drains them with [`ServerGroupWizard::apply_ready`] or
//! [`ServerGroupWizard::wait_for_load`]. Dropping the wizard cancels every
//! fetch still in flight.
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

mod loader;
mod modal;
mod pages;
mod state;
mod submit;

pub use loader::{Lifetime, LifetimeToken};
pub use modal::{noop_close, noop_dismiss, CloseModal, DismissModal, ModalResult};
pub use pages::{
    pages, AdvancedSettings, BasicSettings, DeployPolicySettings, HealthChecks,
    InstanceTemplateSettings, LoadBalancer, PageInputs, ReferenceData, Section, WizardPage,
    MAX_SERVER_GROUP_NAME_LEN,
};
pub use state::{LoadStatus, Resource, WizardState};
pub use submit::{SubmitMode, Submission};

use crate::api::{GateClient, ImageProvider, ServerGroupCloner, ServiceAccountProvider};
use crate::models::{Application, ServerGroupCommand};
use crate::tasks::{PollingTaskExecutor, TaskExecutor, TaskMonitor};
use loader::{DataLoader, LoadEvent};
use modal::ModalSession;

/// Observer notified whenever the wizard commits a state change
pub trait StateListener: Send + Sync {
    fn state_changed(&self, state: &WizardState);

    /// Re-render without a state change (used after a task retry)
    fn force_update(&self) {}
}

/// Collaborators the wizard calls out to
#[derive(Clone)]
pub struct WizardServices {
    pub service_accounts: Arc<dyn ServiceAccountProvider>,
    pub images: Arc<dyn ImageProvider>,
    pub cloner: Arc<dyn ServerGroupCloner>,
    pub executor: Arc<dyn TaskExecutor>,
}

impl WizardServices {
    /// Wire every collaborator to the gate API
    pub fn gate(client: GateClient, poll_interval: Duration) -> Self {
        let client = Arc::new(client);
        Self {
            service_accounts: client.clone(),
            images: client.clone(),
            cloner: client.clone(),
            executor: Arc::new(PollingTaskExecutor::new(client, poll_interval)),
        }
    }
}

pub struct WizardProps {
    pub application: Application,
    pub command: ServerGroupCommand,
    pub title: String,
    pub close_modal: Option<CloseModal>,
    pub dismiss_modal: Option<DismissModal>,
    pub listener: Option<Arc<dyn StateListener>>,
}

impl WizardProps {
    pub fn new(application: Application, command: ServerGroupCommand, title: impl Into<String>) -> Self {
        Self {
            application,
            command,
            title: title.into(),
            close_modal: None,
            dismiss_modal: None,
            listener: None,
        }
    }

    pub fn with_close_modal(mut self, close: CloseModal) -> Self {
        self.close_modal = Some(close);
        self
    }

    pub fn with_dismiss_modal(mut self, dismiss: DismissModal) -> Self {
        self.dismiss_modal = Some(dismiss);
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn StateListener>) -> Self {
        self.listener = Some(listener);
        self
    }
}

/// What the host should display
pub enum Screen<'a> {
    TemplateSelection {
        application: &'a str,
        command: &'a ServerGroupCommand,
    },
    Wizard {
        heading: &'a str,
        loading: bool,
        submit_label: &'a str,
        pages: Vec<WizardPage>,
        task_monitor: Option<&'a Arc<dyn TaskMonitor>>,
    },
}

pub struct ServerGroupWizard {
    application: Application,
    command: ServerGroupCommand,
    title: String,
    mode: SubmitMode,
    close_modal: CloseModal,
    dismiss_modal: DismissModal,
    listener: Option<Arc<dyn StateListener>>,
    state: WizardState,
    services: WizardServices,
    lifetime: Lifetime,
    loader: DataLoader,
    events: mpsc::UnboundedReceiver<LoadEvent>,
    pending: usize,
}

impl ServerGroupWizard {
    /// Mount the wizard. State is seeded from the command's view state.
    pub fn new(props: WizardProps, services: WizardServices) -> Self {
        let (loader, events) = DataLoader::new(services.service_accounts.clone(), services.images.clone());
        let state = WizardState::from_command(&props.command);
        let mode = SubmitMode::from_mode(&props.command.view_state.mode);
        tracing::debug!(
            application = props.application.name(),
            mode = props.command.view_state.mode.as_str(),
            requires_template_selection = state.requires_template_selection,
            "Mounting server group wizard"
        );
        Self {
            application: props.application,
            command: props.command,
            title: props.title,
            mode,
            close_modal: props.close_modal.unwrap_or_else(noop_close),
            dismiss_modal: props.dismiss_modal.unwrap_or_else(noop_dismiss),
            listener: props.listener,
            state,
            services,
            lifetime: Lifetime::new(),
            loader,
            events,
            pending: 0,
        }
    }

    /// Mount the wizard in a modal session. The returned result resolves when
    /// the wizard is closed with a command or dismissed.
    pub fn show(mut props: WizardProps, services: WizardServices) -> (Self, ModalResult) {
        let (session, result) = ModalSession::new();
        props.close_modal = Some(session.wrap_close(props.close_modal.take().unwrap_or_else(noop_close)));
        props.dismiss_modal = Some(session.wrap_dismiss(props.dismiss_modal.take().unwrap_or_else(noop_dismiss)));
        (Self::new(props, services), result)
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    /// Live form binding
    pub fn command(&self) -> &ServerGroupCommand {
        &self.command
    }

    pub fn command_mut(&mut self) -> &mut ServerGroupCommand {
        &mut self.command
    }

    pub fn mode(&self) -> SubmitMode {
        self.mode
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn application(&self) -> &Application {
        &self.application
    }

    /// Number of fetches whose results have not been committed yet
    pub fn pending_loads(&self) -> usize {
        self.pending
    }

    pub fn reference_data(&self) -> ReferenceData<'_> {
        ReferenceData {
            service_accounts: self.state.service_accounts(),
            service_accounts_owner: self.state.service_accounts.loaded_account(),
            service_accounts_loading: self.state.service_accounts_loading(),
            images: self.state.all_images(),
            images_owner: self.state.images.loaded_account(),
            image_loading: self.state.image_loading(),
        }
    }

    pub fn screen(&self) -> Screen<'_> {
        if self.state.requires_template_selection {
            return Screen::TemplateSelection {
                application: self.application.name(),
                command: &self.command,
            };
        }
        Screen::Wizard {
            heading: &self.title,
            loading: self.state.loading,
            submit_label: self.command.submit_button_label(),
            pages: pages(self.command.view_state.show_image_source_selector),
            task_monitor: self.state.task_monitor.as_ref(),
        }
    }

    /// Template chooser finished: leave the gate and start the wizard
    pub fn template_selected(&mut self) {
        self.state.requires_template_selection = false;
        self.command.view_state.requires_template_selection = false;
        self.initialize();
    }

    fn initialize(&mut self) {
        self.state.loading = false;
        self.notify();
    }

    /// Selected account changed: reload service accounts and images for it
    pub fn account_changed(&mut self, account: &str) {
        let account = account.trim();
        if account.is_empty() {
            tracing::debug!("Account cleared; keeping reference data");
            return;
        }
        self.command.account = Some(account.to_string());

        let sa_epoch = self.state.service_accounts.begin(account);
        let image_epoch = self.state.images.begin(account);
        self.notify();

        tracing::info!(account, "Loading service accounts and images");
        self.loader
            .load_service_accounts(account, sa_epoch, self.lifetime.token());
        self.loader.load_images(account, image_epoch, self.lifetime.token());
        self.pending += 2;
    }

    /// Commit every fetch result that has already arrived
    pub fn apply_ready(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events.try_recv() {
            self.commit(event);
            applied += 1;
        }
        applied
    }

    /// Wait for the next fetch result and commit it. Returns false when nothing is in flight.
    pub async fn wait_for_load(&mut self) -> bool {
        if self.pending == 0 {
            return false;
        }
        match self.events.recv().await {
            Some(event) => {
                self.commit(event);
                true
            }
            None => false,
        }
    }

    /// Commit results until no fetch is in flight
    pub async fn settle(&mut self) {
        while self.wait_for_load().await {}
    }

    fn commit(&mut self, event: LoadEvent) {
        self.pending = self.pending.saturating_sub(1);
        let applied = match event {
            LoadEvent::ServiceAccounts { epoch, account, result } => {
                if let Err(e) = &result {
                    tracing::warn!(%e, account = %account, "Failed to load service accounts");
                }
                let applied = self
                    .state
                    .service_accounts
                    .commit(epoch, result.map_err(|e| e.to_string()));
                tracing::debug!(account = %account, applied, "Service accounts fetch resolved");
                applied
            }
            LoadEvent::Images { epoch, account, result } => {
                if let Err(e) = &result {
                    tracing::warn!(%e, account = %account, "Failed to load images");
                }
                let applied = self.state.images.commit(epoch, result.map_err(|e| e.to_string()));
                tracing::debug!(account = %account, applied, "Images fetch resolved");
                applied
            }
        };
        if applied {
            self.notify();
        }
    }

    fn notify(&self) {
        if let Some(listener) = &self.listener {
            listener.state_changed(&self.state);
        }
    }

    /// User dismissed the modal: stop following any task and tear down
    pub fn dismiss(self) {
        if let Some(monitor) = &self.state.task_monitor {
            monitor.cancel();
        }
        (self.dismiss_modal)();
        self.unmount();
    }

    /// Tear down the wizard, cancelling every outstanding fetch
    pub fn unmount(self) {
        tracing::debug!(application = self.application.name(), "Unmounting server group wizard");
        self.lifetime.destroy();
    }
}
