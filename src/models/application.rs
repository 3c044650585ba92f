use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::api::ServerGroupReader;
use crate::error::ApiError;
use crate::models::ServerGroupSummary;

/// Application the wizard creates server groups for.
///
/// Holds a cached server group listing that can be refreshed once a
/// create/clone task finishes.
#[derive(Clone)]
pub struct Application {
    name: String,
    server_groups: Arc<Mutex<Vec<ServerGroupSummary>>>,
    reader: Arc<dyn ServerGroupReader>,
}

impl Application {
    pub fn new(name: impl Into<String>, reader: Arc<dyn ServerGroupReader>) -> Self {
        Self {
            name: name.into(),
            server_groups: Arc::new(Mutex::new(Vec::new())),
            reader,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn server_groups(&self) -> Vec<ServerGroupSummary> {
        self.server_groups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Reload the server group listing, returning the number of groups
    pub async fn refresh_server_groups(&self) -> Result<usize, ApiError> {
        let groups = self.reader.list_server_groups(&self.name).await?;
        let count = groups.len();
        *self
            .server_groups
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = groups;
        tracing::debug!(application = %self.name, count, "Server groups refreshed");
        Ok(count)
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
