use futures_util::future::{BoxFuture, FutureExt};

use super::{GateClient, TaskReader};
use crate::error::ApiError;
use crate::models::Task;

impl GateClient {
    pub async fn get_task_by_id(&self, id: &str) -> Result<Task, ApiError> {
        let endpoint = format!("/tasks/{}", urlencoding::encode(id));
        self.get_json(&endpoint, &[]).await
    }
}

impl TaskReader for GateClient {
    fn get_task<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Task, ApiError>> {
        self.get_task_by_id(id).boxed()
    }
}
