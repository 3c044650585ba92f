use futures_util::future::{BoxFuture, FutureExt};
use reqwest::Method;
use serde_json::{json, Value};

use super::{GateClient, ServerGroupCloner, ServerGroupReader};
use crate::error::ApiError;
use crate::models::{ServerGroupCommand, ServerGroupSummary, TaskRef, WizardMode};

/// Build the orchestration payload for a create/clone request.
///
/// Clone mode produces a `cloneServerGroup` job described by its source
/// server group; everything else becomes `createServerGroup`.
pub fn build_clone_task(command: &ServerGroupCommand, application: &str) -> Result<Value, ApiError> {
    let mut job = serde_json::to_value(command).map_err(|e| ApiError::Decode(e.to_string()))?;
    let (job_type, description) = match (&command.view_state.mode, command.source_server_group()) {
        (WizardMode::Clone, Some(source)) => (
            "cloneServerGroup",
            format!("Create Cloned Server Group from {}", source),
        ),
        _ => (
            "createServerGroup",
            format!("Create New Server Group in cluster {}", command.cluster_name()),
        ),
    };
    if let Some(obj) = job.as_object_mut() {
        obj.insert("type".to_string(), Value::String(job_type.to_string()));
        obj.insert("cloudProvider".to_string(), json!(command.selected_provider));
        // viewState only drives the UI
        obj.remove("viewState");
    }
    Ok(json!({
        "application": application,
        "description": description,
        "job": [job],
    }))
}

impl GateClient {
    pub async fn submit_clone_task(
        &self,
        command: &ServerGroupCommand,
        application: &str,
    ) -> Result<TaskRef, ApiError> {
        let payload = build_clone_task(command, application)?;
        let response = self.call(Method::POST, "/tasks", Some(&payload), &[]).await?;
        let path = response
            .get("ref")
            .and_then(|r| r.as_str())
            .ok_or(ApiError::MissingField("ref"))?;
        let task = TaskRef::from_ref_path(path).ok_or(ApiError::MissingField("ref"))?;
        tracing::info!(task_id = %task.id, application, "Server group task submitted");
        Ok(task)
    }

    pub async fn load_server_groups(&self, application: &str) -> Result<Vec<ServerGroupSummary>, ApiError> {
        let endpoint = format!("/applications/{}/serverGroups", urlencoding::encode(application));
        self.get_json(&endpoint, &[]).await
    }
}

impl ServerGroupCloner for GateClient {
    fn clone_server_group<'a>(
        &'a self,
        command: &'a ServerGroupCommand,
        application: &'a str,
    ) -> BoxFuture<'a, Result<TaskRef, ApiError>> {
        self.submit_clone_task(command, application).boxed()
    }
}

impl ServerGroupReader for GateClient {
    fn list_server_groups<'a>(
        &'a self,
        application: &'a str,
    ) -> BoxFuture<'a, Result<Vec<ServerGroupSummary>, ApiError>> {
        self.load_server_groups(application).boxed()
    }
}
