//! Provider API: collaborator traits consumed by the wizard and their gate-backed implementations
use futures_util::future::BoxFuture;

use crate::config;
use crate::error::ApiError;
use crate::models::{Image, ServerGroupCommand, ServerGroupSummary, ServiceAccount, Task, TaskRef};

pub mod client;
pub mod images;
pub mod server_groups;
pub mod service_accounts;
pub mod tasks;

pub use client::{set_silent, GateClient};

/// Image search parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageQuery {
    pub account: String,
    pub provider: String,
    pub pattern: String,
}

impl ImageQuery {
    /// Match-all query for this provider's images in `account`
    pub fn for_account(account: &str) -> Self {
        Self {
            account: account.to_string(),
            provider: config::PROVIDER.to_string(),
            pattern: config::IMAGE_QUERY_PATTERN.to_string(),
        }
    }

    pub fn to_pairs(&self) -> Vec<(String, String)> {
        vec![
            ("account".to_string(), self.account.clone()),
            ("provider".to_string(), self.provider.clone()),
            ("q".to_string(), self.pattern.clone()),
        ]
    }
}

/// Lists the service accounts available to an account
pub trait ServiceAccountProvider: Send + Sync {
    fn fetch<'a>(&'a self, account: &'a str) -> BoxFuture<'a, Result<Vec<ServiceAccount>, ApiError>>;
}

/// Searches machine images
pub trait ImageProvider: Send + Sync {
    fn find<'a>(&'a self, query: &'a ImageQuery) -> BoxFuture<'a, Result<Vec<Image>, ApiError>>;
}

/// Starts a create/clone server group task
pub trait ServerGroupCloner: Send + Sync {
    fn clone_server_group<'a>(
        &'a self,
        command: &'a ServerGroupCommand,
        application: &'a str,
    ) -> BoxFuture<'a, Result<TaskRef, ApiError>>;
}

/// Reads the current state of a submitted task
pub trait TaskReader: Send + Sync {
    fn get_task<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Task, ApiError>>;
}

/// Lists an application's server groups
pub trait ServerGroupReader: Send + Sync {
    fn list_server_groups<'a>(
        &'a self,
        application: &'a str,
    ) -> BoxFuture<'a, Result<Vec<ServerGroupSummary>, ApiError>>;
}
