use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

use crate::api::{ImageProvider, ImageQuery, ServiceAccountProvider};
use crate::error::ApiError;
use crate::models::{Image, ServiceAccount};

/// Owner side of the wizard's lifetime. Raising it cancels every fetch
/// holding a [`LifetimeToken`].
#[derive(Debug)]
pub struct Lifetime {
    tx: watch::Sender<bool>,
}

/// Cancellation token cloned into each fetch
#[derive(Debug, Clone)]
pub struct LifetimeToken {
    rx: watch::Receiver<bool>,
}

impl Lifetime {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    pub fn token(&self) -> LifetimeToken {
        LifetimeToken { rx: self.tx.subscribe() }
    }

    pub fn destroy(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_destroyed(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for Lifetime {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Lifetime {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl LifetimeToken {
    pub fn is_destroyed(&self) -> bool {
        // A dropped owner counts as destroyed
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Resolves once the owner is destroyed
    pub async fn destroyed(&mut self) {
        let _ = self.rx.wait_for(|d| *d).await;
    }
}

/// Result of one reference-data fetch, tagged with the epoch it was started under
#[derive(Debug)]
pub(crate) enum LoadEvent {
    ServiceAccounts {
        epoch: u64,
        account: String,
        result: Result<Vec<ServiceAccount>, ApiError>,
    },
    Images {
        epoch: u64,
        account: String,
        result: Result<Vec<Image>, ApiError>,
    },
}

/// Starts cancellable fetches and delivers their results to the wizard
pub(crate) struct DataLoader {
    service_accounts: Arc<dyn ServiceAccountProvider>,
    images: Arc<dyn ImageProvider>,
    events: mpsc::UnboundedSender<LoadEvent>,
}

impl DataLoader {
    pub(crate) fn new(
        service_accounts: Arc<dyn ServiceAccountProvider>,
        images: Arc<dyn ImageProvider>,
    ) -> (Self, mpsc::UnboundedReceiver<LoadEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        (
            Self {
                service_accounts,
                images,
                events,
            },
            rx,
        )
    }

    pub(crate) fn load_service_accounts(&self, account: &str, epoch: u64, token: LifetimeToken) {
        let provider = self.service_accounts.clone();
        let account = account.to_string();
        let fetch_account = account.clone();
        spawn_guarded(
            token,
            self.events.clone(),
            async move { provider.fetch(&fetch_account).await },
            move |result| LoadEvent::ServiceAccounts { epoch, account, result },
        );
    }

    pub(crate) fn load_images(&self, account: &str, epoch: u64, token: LifetimeToken) {
        let provider = self.images.clone();
        let query = ImageQuery::for_account(account);
        let account = account.to_string();
        spawn_guarded(
            token,
            self.events.clone(),
            async move { provider.find(&query).await },
            move |result| LoadEvent::Images { epoch, account, result },
        );
    }
}

/// Run `fetch` until it resolves or the token is raised. A result is only
/// delivered while the owner is still alive.
fn spawn_guarded<T, F, M>(
    mut token: LifetimeToken,
    events: mpsc::UnboundedSender<LoadEvent>,
    fetch: F,
    into_event: M,
) where
    T: Send + 'static,
    F: Future<Output = Result<T, ApiError>> + Send + 'static,
    M: FnOnce(Result<T, ApiError>) -> LoadEvent + Send + 'static,
{
    tokio::spawn(async move {
        // Run the fetch in its own task so a panicking provider still yields an event
        let mut fetch = tokio::spawn(fetch);
        let joined = tokio::select! {
            _ = token.destroyed() => {
                fetch.abort();
                tracing::debug!("Fetch cancelled by wizard teardown");
                return;
            }
            joined = &mut fetch => joined,
        };
        let result = joined.unwrap_or_else(|e| {
            tracing::error!(%e, "Fetch task died");
            Err(ApiError::Aborted(e.to_string()))
        });
        if token.is_destroyed() {
            return;
        }
        if events.send(into_event(result)).is_err() {
            tracing::debug!("Wizard gone before fetch result was delivered");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_follows_owner() {
        let lifetime = Lifetime::new();
        let token = lifetime.token();
        assert!(!token.is_destroyed());
        lifetime.destroy();
        assert!(token.is_destroyed());
        assert!(lifetime.is_destroyed());
    }

    #[test]
    fn test_dropped_owner_counts_as_destroyed() {
        let lifetime = Lifetime::new();
        let token = lifetime.token();
        drop(lifetime);
        assert!(token.is_destroyed());
    }

    #[tokio::test]
    async fn test_destroyed_resolves_after_destroy() {
        let lifetime = Lifetime::new();
        let mut token = lifetime.token();
        let waiter = tokio::spawn(async move { token.destroyed().await });
        lifetime.destroy();
        waiter.await.unwrap();
    }
}
