use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::oneshot;

use crate::error::WizardError;
use crate::models::ServerGroupCommand;

pub type CloseModal = Arc<dyn Fn(ServerGroupCommand) + Send + Sync>;
pub type DismissModal = Arc<dyn Fn() + Send + Sync>;

pub fn noop_close() -> CloseModal {
    Arc::new(|_| {})
}

pub fn noop_dismiss() -> DismissModal {
    Arc::new(|| {})
}

type Outcome = Result<ServerGroupCommand, WizardError>;

/// Resolves with the finished command when the wizard is closed, or with
/// [`WizardError::Dismissed`] when it is dismissed.
#[derive(Debug)]
pub struct ModalResult {
    rx: oneshot::Receiver<Outcome>,
}

impl ModalResult {
    pub async fn wait(self) -> Outcome {
        // Host dropped without settling
        self.rx.await.unwrap_or(Err(WizardError::Dismissed))
    }
}

/// Settles the [`ModalResult`] at most once
#[derive(Clone)]
pub(crate) struct ModalSession {
    tx: Arc<Mutex<Option<oneshot::Sender<Outcome>>>>,
}

impl ModalSession {
    pub(crate) fn new() -> (Self, ModalResult) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                tx: Arc::new(Mutex::new(Some(tx))),
            },
            ModalResult { rx },
        )
    }

    /// Returns true when the outcome reached a waiting [`ModalResult`]
    fn settle(&self, outcome: Outcome) -> bool {
        let sender = self.tx.lock().unwrap_or_else(PoisonError::into_inner).take();
        match sender {
            Some(tx) => {
                let delivered = tx.send(outcome).is_ok();
                if !delivered {
                    tracing::debug!("Modal result dropped before the wizard settled");
                }
                delivered
            }
            None => {
                tracing::debug!("Modal already settled");
                false
            }
        }
    }

    pub(crate) fn wrap_close(&self, inner: CloseModal) -> CloseModal {
        let session = self.clone();
        Arc::new(move |command: ServerGroupCommand| {
            inner(command.clone());
            session.settle(Ok(command));
        })
    }

    pub(crate) fn wrap_dismiss(&self, inner: DismissModal) -> DismissModal {
        let session = self.clone();
        Arc::new(move || {
            inner();
            session.settle(Err(WizardError::Dismissed));
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_close_resolves_with_command() {
        let (session, result) = ModalSession::new();
        let close = session.wrap_close(noop_close());
        let dismiss = session.wrap_dismiss(noop_dismiss());
        close(ServerGroupCommand {
            application: "shop".into(),
            ..Default::default()
        });
        // Later dismissal does not override the first outcome
        dismiss();
        let command = result.wait().await.unwrap();
        assert_eq!(command.application, "shop");
    }

    #[tokio::test]
    async fn test_dismiss_rejects() {
        let (session, result) = ModalSession::new();
        session.wrap_dismiss(noop_dismiss())();
        assert!(matches!(result.wait().await, Err(WizardError::Dismissed)));
    }

    #[tokio::test]
    async fn test_dropped_session_rejects() {
        let (session, result) = ModalSession::new();
        drop(session);
        assert!(matches!(result.wait().await, Err(WizardError::Dismissed)));
    }

    #[test]
    fn test_settle_after_result_dropped_still_runs_host_hook() {
        let (session, result) = ModalSession::new();
        drop(result);
        let closed = Arc::new(Mutex::new(Vec::new()));
        let seen = closed.clone();
        let close = session.wrap_close(Arc::new(move |command: ServerGroupCommand| {
            seen.lock().unwrap().push(command.application);
        }));
        close(ServerGroupCommand {
            application: "shop".into(),
            ..Default::default()
        });
        assert_eq!(*closed.lock().unwrap(), vec!["shop".to_string()]);
        assert!(!session.settle(Err(WizardError::Dismissed)));
    }

    #[test]
    fn test_settle_reports_delivery() {
        let (session, _result) = ModalSession::new();
        assert!(session.settle(Err(WizardError::Dismissed)));
        assert!(!session.settle(Err(WizardError::Dismissed)));
    }
}
