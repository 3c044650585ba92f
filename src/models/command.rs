use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Editing mode the wizard was opened in
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WizardMode {
    #[default]
    Create,
    Clone,
    Edit,
    CreatePipeline,
    EditPipeline,
    EditClonePipeline,
    /// Any mode string this crate does not know about
    Other(String),
}

impl WizardMode {
    pub fn as_str(&self) -> &str {
        match self {
            WizardMode::Create => "create",
            WizardMode::Clone => "clone",
            WizardMode::Edit => "edit",
            WizardMode::CreatePipeline => "createPipeline",
            WizardMode::EditPipeline => "editPipeline",
            WizardMode::EditClonePipeline => "editClonePipeline",
            WizardMode::Other(s) => s,
        }
    }

    /// Whether the wizard is editing a pipeline stage rather than acting directly
    pub fn is_pipeline(&self) -> bool {
        matches!(
            self,
            WizardMode::CreatePipeline | WizardMode::EditPipeline | WizardMode::EditClonePipeline
        )
    }
}

impl From<String> for WizardMode {
    fn from(value: String) -> Self {
        match value.as_str() {
            "create" => WizardMode::Create,
            "clone" => WizardMode::Clone,
            "edit" => WizardMode::Edit,
            "createPipeline" => WizardMode::CreatePipeline,
            "editPipeline" => WizardMode::EditPipeline,
            "editClonePipeline" => WizardMode::EditClonePipeline,
            _ => WizardMode::Other(value),
        }
    }
}

impl From<WizardMode> for String {
    fn from(mode: WizardMode) -> Self {
        mode.as_str().to_string()
    }
}

/// UI-only state carried on the command
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    #[serde(default)]
    pub mode: WizardMode,
    #[serde(default)]
    pub requires_template_selection: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submit_button_label: Option<String>,
    #[serde(default)]
    pub show_image_source_selector: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployPolicy {
    #[serde(default)]
    pub max_unavailable: i64,
    #[serde(default)]
    pub max_expansion: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_deleting: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_creating: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub startup_duration: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcesSpec {
    /// Memory in GB
    #[serde(default)]
    pub memory: f64,
    #[serde(default)]
    pub cores: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub core_fraction: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceTemplate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources_spec: Option<ResourcesSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boot_disk_spec: Option<DiskSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckSpec {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<u64>,
    /// Seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unhealthy_threshold: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub healthy_threshold: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetGroupSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Desired server group configuration edited by the wizard.
///
/// Fields the wizard does not look at are kept in `extra` so the command
/// survives a round trip through the CLI untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerGroupCommand {
    #[serde(default)]
    pub application: String,
    /// Selected account (credentials) name
    #[serde(rename = "credentials", default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_form_details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy_policy: Option<DeployPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_template: Option<InstanceTemplate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub health_check_specs: Vec<HealthCheckSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_group_spec: Option<TargetGroupSpec>,
    /// Server group being cloned, when the mode is `clone`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Value>,
    #[serde(default)]
    pub view_state: ViewState,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ServerGroupCommand {
    /// Cluster name following the `app-stack-detail` naming convention
    pub fn cluster_name(&self) -> String {
        let stack = self.stack.as_deref().unwrap_or("");
        let detail = self.free_form_details.as_deref().unwrap_or("");
        let mut name = self.application.clone();
        if !stack.is_empty() || !detail.is_empty() {
            name.push('-');
            name.push_str(stack);
        }
        if !detail.is_empty() {
            name.push('-');
            name.push_str(detail);
        }
        name
    }

    /// Name of the server group being cloned, if any
    pub fn source_server_group(&self) -> Option<&str> {
        self.source
            .as_ref()
            .and_then(|s| s.get("serverGroupName").or_else(|| s.get("asgName")))
            .and_then(|v| v.as_str())
    }

    pub fn submit_button_label(&self) -> &str {
        self.view_state.submit_button_label.as_deref().unwrap_or("Create")
    }
}
