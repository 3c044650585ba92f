use futures_util::future::{BoxFuture, FutureExt};

use super::{GateClient, ServiceAccountProvider};
use crate::config;
use crate::error::ApiError;
use crate::models::ServiceAccount;

impl GateClient {
    /// Load the service accounts visible to `account`
    pub async fn load_service_accounts(&self, account: &str) -> Result<Vec<ServiceAccount>, ApiError> {
        let endpoint = format!(
            "/{}/serviceAccounts/{}",
            config::PROVIDER,
            urlencoding::encode(account)
        );
        self.get_json(&endpoint, &[]).await
    }
}

impl ServiceAccountProvider for GateClient {
    fn fetch<'a>(&'a self, account: &'a str) -> BoxFuture<'a, Result<Vec<ServiceAccount>, ApiError>> {
        self.load_service_accounts(account).boxed()
    }
}
