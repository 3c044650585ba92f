use serde::{Deserialize, Serialize};

/// Orchestration task status as reported by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
    NotStarted,
    Running,
    Paused,
    Suspended,
    Buffered,
    Succeeded,
    Terminal,
    Canceled,
    Stopped,
    Other(String),
}

impl TaskStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TaskStatus::NotStarted => "NOT_STARTED",
            TaskStatus::Running => "RUNNING",
            TaskStatus::Paused => "PAUSED",
            TaskStatus::Suspended => "SUSPENDED",
            TaskStatus::Buffered => "BUFFERED",
            TaskStatus::Succeeded => "SUCCEEDED",
            TaskStatus::Terminal => "TERMINAL",
            TaskStatus::Canceled => "CANCELED",
            TaskStatus::Stopped => "STOPPED",
            TaskStatus::Other(s) => s,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Succeeded | TaskStatus::Terminal | TaskStatus::Canceled | TaskStatus::Stopped
        )
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TaskStatus::Succeeded)
    }
}

impl From<String> for TaskStatus {
    fn from(value: String) -> Self {
        match value.to_uppercase().as_str() {
            "NOT_STARTED" => TaskStatus::NotStarted,
            "RUNNING" => TaskStatus::Running,
            "PAUSED" => TaskStatus::Paused,
            "SUSPENDED" => TaskStatus::Suspended,
            "BUFFERED" => TaskStatus::Buffered,
            "SUCCEEDED" => TaskStatus::Succeeded,
            "TERMINAL" => TaskStatus::Terminal,
            "CANCELED" => TaskStatus::Canceled,
            "STOPPED" => TaskStatus::Stopped,
            _ => TaskStatus::Other(value),
        }
    }
}

impl From<TaskStatus> for String {
    fn from(status: TaskStatus) -> Self {
        status.as_str().to_string()
    }
}

/// Reference returned when a task is submitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRef {
    pub id: String,
}

impl TaskRef {
    /// Parse the `ref` path returned by the task endpoint (`/tasks/<id>`)
    pub fn from_ref_path(path: &str) -> Option<Self> {
        let id = path.trim_end_matches('/').rsplit('/').next()?.trim();
        if id.is_empty() {
            None
        } else {
            Some(TaskRef { id: id.to_string() })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_ref_from_path() {
        assert_eq!(TaskRef::from_ref_path("/tasks/01HX"), Some(TaskRef { id: "01HX".into() }));
        assert_eq!(TaskRef::from_ref_path("/tasks/01HX/"), Some(TaskRef { id: "01HX".into() }));
        assert_eq!(TaskRef::from_ref_path(""), None);
    }

    #[test]
    fn test_status_terminal_states() {
        assert!(TaskStatus::from("succeeded".to_string()).is_success());
        assert!(TaskStatus::Terminal.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
        assert_eq!(TaskStatus::from("WEIRD".to_string()), TaskStatus::Other("WEIRD".into()));
    }
}
